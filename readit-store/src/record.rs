use readit_common::model::{
    Id,
    user::{Password, User, UserLogin, UserMarker},
};

/// A user as the store keeps it, password included.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub(crate) struct UserRecord {
    pub id: Id<UserMarker>,
    pub login: UserLogin,
    pub password: Password,
}

impl From<&UserRecord> for User {
    fn from(value: &UserRecord) -> Self {
        Self {
            id: value.id,
            login: value.login.clone(),
        }
    }
}
