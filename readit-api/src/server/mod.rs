use axum::{
    Router,
    extract::{
        FromRef, Request,
        rejection::{JsonRejection, PathRejection},
    },
    http::{Method, StatusCode, Uri},
    middleware,
    response::{IntoResponse, Response},
};
use axum_extra::typed_header::TypedHeaderRejection;
use json::Json;
use readit_common::model::{
    Id,
    auth::{TokenError, TokenIssuer},
    post::PostValidationError,
    user::UserMarker,
};
use readit_store::{
    StoreError, posts::PostRepository, sessions::SessionManager, users::UserRepository,
};
use serde::Serialize;
use std::{any::Any, path::Path, sync::Arc};
use thiserror::Error;
use tower_http::{
    catch_panic::CatchPanicLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::error;

mod access_log;
mod auth;
mod json;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub users: Arc<UserRepository>,
    pub posts: Arc<PostRepository>,
    pub sessions: Arc<SessionManager>,
    pub tokens: Arc<TokenIssuer>,
}

impl ServerState {
    #[must_use]
    pub fn new(tokens: TokenIssuer) -> Self {
        Self {
            users: Arc::new(UserRepository::new()),
            posts: Arc::new(PostRepository::new()),
            sessions: Arc::new(SessionManager::new()),
            tokens: Arc::new(tokens),
        }
    }
}

pub fn routes() -> ServerRouter {
    routes::routes()
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(fallback)
}

/// The full application: API routes, the static front-end and the middleware
/// stack.
pub fn app(state: ServerState, static_dir: &Path) -> Router {
    let router = routes()
        .route_service("/", ServeFile::new(static_dir.join("html").join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir));

    with_middleware(router).with_state(state)
}

fn with_middleware(router: ServerRouter) -> ServerRouter {
    router
        .layer(middleware::from_fn(access_log::access_log))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(panic_response))
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub async fn method_not_allowed(request: Request) -> ServerError {
    let parts = request.into_parts().0;
    ServerError::MethodNotAllowed(parts.method, parts.uri)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_owned());

    ServerError::Panicked(message).into_response()
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Method {0} is not allowed on {1}")]
    MethodNotAllowed(Method, Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("Authorization header was missing or invalid: {0}")]
    InvalidAuthorizationHeader(TypedHeaderRejection),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("User {0} has no live session")]
    NoSession(Id<UserMarker>),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    InvalidPost(#[from] PostValidationError),
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::Store(StoreError::PostNotFound(_) | StoreError::CommentNotFound(..)) => {
                StatusCode::NOT_FOUND
            }
            ServerError::MethodNotAllowed(..) => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::InvalidAuthorizationHeader(rejection) if rejection.is_missing() => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::Token(TokenError::Decode(_)) | ServerError::NoSession(_) => {
                StatusCode::UNAUTHORIZED
            }
            ServerError::JsonRejection(_) | ServerError::InvalidAuthorizationHeader(_) => {
                StatusCode::BAD_REQUEST
            }
            ServerError::Store(StoreError::NotPostAuthor(_) | StoreError::NotCommentAuthor(_)) => {
                StatusCode::FORBIDDEN
            }
            ServerError::Store(
                StoreError::UserExists(_) | StoreError::UnknownUser(_) | StoreError::BadPassword,
            )
            | ServerError::InvalidPost(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::JsonResponse(_)
            | ServerError::Token(TokenError::Encode(_))
            | ServerError::Panicked(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Per-field details for request bodies that were well-formed but rejected.
    fn field_errors(&self) -> Vec<FieldError> {
        let (param, value) = match self {
            ServerError::Store(StoreError::UserExists(login) | StoreError::UnknownUser(login)) => {
                ("username", login.get().to_owned())
            }
            ServerError::Store(StoreError::BadPassword) => ("password", String::new()),
            ServerError::InvalidPost(err) => (err.param(), err.value()),
            _ => return Vec::new(),
        };

        vec![FieldError {
            location: "body",
            param,
            value,
            msg: self.to_string(),
        }]
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct FieldError {
    location: &'static str,
    param: &'static str,
    value: String,
    msg: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct ErrorResponse {
    status: u16,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
            message: self.to_string(),
            errors: self.field_errors(),
        };
        (status, Json(error_response)).into_response()
    }
}
