use crate::server::{Result, ServerError, ServerRouter, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use readit_common::model::{
    auth::TokenIssuer,
    post::Post,
    user::{Credentials, User, UserLogin},
};
use readit_store::{posts::PostRepository, sessions::SessionManager, users::UserRepository};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(register)
        .typed_post(login)
        .typed_get(get_user_posts)
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct TokenResponse {
    token: String,
}

fn start_session(
    sessions: &SessionManager,
    tokens: &TokenIssuer,
    user: &User,
) -> Result<Json<TokenResponse>> {
    let token = tokens.issue(user)?;
    let session = sessions.create(user);
    info!(user_id = %session.user_id, "Created session");

    Ok(Json(TokenResponse { token }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/register", rejection(ServerError))]
struct RegisterPath();

async fn register(
    RegisterPath(): RegisterPath,
    State(users): State<Arc<UserRepository>>,
    State(sessions): State<Arc<SessionManager>>,
    State(tokens): State<Arc<TokenIssuer>>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<TokenResponse>)> {
    let user = users.register(credentials.username, credentials.password)?;
    info!(user_id = %user.id, login = user.login.get(), "Registered user");

    Ok((StatusCode::CREATED, start_session(&sessions, &tokens, &user)?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/login", rejection(ServerError))]
struct LoginPath();

async fn login(
    LoginPath(): LoginPath,
    State(users): State<Arc<UserRepository>>,
    State(sessions): State<Arc<SessionManager>>,
    State(tokens): State<Arc<TokenIssuer>>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>> {
    let user = users.authorize(&credentials.username, &credentials.password)?;

    start_session(&sessions, &tokens, &user)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/user/{login}", rejection(ServerError))]
struct UserPostsPath {
    login: UserLogin,
}

async fn get_user_posts(
    UserPostsPath { login }: UserPostsPath,
    State(posts): State<Arc<PostRepository>>,
) -> Json<Vec<Post>> {
    Json(posts.list_by_author(&login))
}
