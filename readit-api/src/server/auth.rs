use crate::server::ServerError;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use readit_common::model::auth::{Session, TokenIssuer};
use readit_store::sessions::SessionManager;
use std::sync::Arc;

type AuthorizationHeader = TypedHeader<Authorization<Bearer>>;

/// A request whose bearer token verified and whose user has a live session.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct AuthenticatedUser {
    session: Session,
}

impl AuthenticatedUser {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<TokenIssuer>: FromRef<S>,
    Arc<SessionManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = AuthorizationHeader::from_request_parts(parts, state)
            .await
            .map_err(ServerError::InvalidAuthorizationHeader)?;

        let claims = Arc::<TokenIssuer>::from_ref(state).verify(header.token())?;
        let user_id = claims.user.id;

        let session = Arc::<SessionManager>::from_ref(state)
            .get(user_id)
            .ok_or(ServerError::NoSession(user_id))?;

        Ok(Self { session })
    }
}
