use readit_common::{
    model::auth::{DEFAULT_TOKEN_LIFETIME, TokenIssuer},
    util::{NonPositiveDurationError, PositiveDuration},
};
use serde::Deserialize;
use server::ServerState;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use thiserror::Error;
use time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid token lifetime: {0}")]
    TokenLifetime(#[from] NonPositiveDurationError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    jwt_secret: String,
    #[serde(default = "default_token_lifetime_days")]
    token_lifetime_days: i64,
    #[serde(default = "default_static_dir")]
    static_dir: PathBuf,
}

fn default_token_lifetime_days() -> i64 {
    DEFAULT_TOKEN_LIFETIME.whole_days()
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "readit_api=debug,\
                readit_store=debug,\
                readit_common=debug,\
                tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn shutdown_on_ctrl_c() -> CancellationToken {
    let shutdown = CancellationToken::new();

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down");
                trigger.cancel();
            }
            Err(err) => error!(error = %err, "Cannot listen for Ctrl-C"),
        }
    });

    shutdown
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let token_lifetime = PositiveDuration::try_from(Duration::days(env.token_lifetime_days))?;
    let tokens = TokenIssuer::new(env.jwt_secret.as_bytes(), token_lifetime);
    let app = server::app(ServerState::new(tokens), &env.static_dir);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Starting server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_on_ctrl_c().cancelled_owned())
    .await
    .map_err(InitError::TcpServe)?;

    Ok(())
}
