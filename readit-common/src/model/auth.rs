use crate::{
    model::{
        Id,
        user::{User, UserLogin, UserMarker},
    },
    util::PositiveDuration,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::days(30);

/// Server-side record of a logged in user.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Id<UserMarker>,
    pub login: UserLogin,
}

impl From<&User> for Session {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            login: user.login.clone(),
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct TokenUser {
    pub username: UserLogin,
    pub id: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: TokenUser,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Signing the token failed: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("The token could not be verified: {0}")]
    Decode(jsonwebtoken::errors::Error),
}

/// Issues and verifies HS256 tokens carrying the user's id and login.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: PositiveDuration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(secret: &[u8], lifetime: PositiveDuration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            lifetime,
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user: &User, now: OffsetDateTime) -> Result<String, TokenError> {
        let claims = TokenClaims {
            user: TokenUser {
                username: user.login.clone(),
                id: user.id,
            },
            iat: now.unix_timestamp(),
            exp: (now + self.lifetime.get()).unix_timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Encode)
    }

    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let validation = Validation::new(Algorithm::HS256);

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Decode)
    }
}

impl Debug for TokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("keys", &"[redacted]")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &[u8]) -> TokenIssuer {
        TokenIssuer::new(
            secret,
            PositiveDuration::new(DEFAULT_TOKEN_LIFETIME).unwrap(),
        )
    }

    fn alice() -> User {
        User {
            id: Id::new(3),
            login: UserLogin::new("alice".to_owned()).unwrap(),
        }
    }

    #[test]
    fn issued_token_verifies() {
        let issuer = issuer(b"secret");
        let token = issuer.issue(&alice()).unwrap();

        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.user.id, Id::new(3));
        assert_eq!(claims.user.username.get(), "alice");
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_LIFETIME.whole_seconds());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let token = issuer(b"secret").issue(&alice()).unwrap();
        assert!(issuer(b"other secret").verify(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer(b"secret");
        let long_ago = OffsetDateTime::now_utc() - Duration::days(365);
        let token = issuer.issue_at(&alice(), long_ago).unwrap();
        assert!(matches!(issuer.verify(&token), Err(TokenError::Decode(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(issuer(b"secret").verify("not.a.token").is_err());
    }
}
