use crate::model::Id;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Display, Formatter};
use thiserror::Error;

pub const USER_LOGIN_MAX_LEN: usize = 50;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub login: UserLogin,
}

/// Request body of both registration and login.
#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct Credentials {
    pub username: UserLogin,
    pub password: Password,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserLogin(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user login is invalid: {0:?}")]
pub struct InvalidUserLoginError(String);

impl UserLogin {
    pub fn new(login: String) -> Result<Self, InvalidUserLoginError> {
        let len = login.chars().count();
        if len > 0 && len <= USER_LOGIN_MAX_LEN {
            Ok(UserLogin(login))
        } else {
            Err(InvalidUserLoginError(login))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for UserLogin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserLogin {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserLogin::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserLogin"))
    }
}

/// Plaintext password, compared as-is.
#[derive(Clone, Eq, PartialEq, Hash, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    #[must_use]
    pub fn new(password: String) -> Self {
        Self(password)
    }

    #[must_use]
    pub fn matches(&self, other: &Password) -> bool {
        self.0 == other.0
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Password").field(&"[redacted]").finish()
    }
}
