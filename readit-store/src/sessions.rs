use crate::{read, write};
use readit_common::model::{
    Id,
    auth::Session,
    user::{User, UserMarker},
};
use std::{collections::HashMap, sync::RwLock};

/// Live sessions, one per user. Sessions never expire.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<Id<UserMarker>, Session>>,
}

impl SessionManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for `user`, replacing any previous one.
    pub fn create(&self, user: &User) -> Session {
        let session = Session::from(user);
        write(&self.sessions).insert(user.id, session.clone());
        session
    }

    #[must_use]
    pub fn get(&self, user_id: Id<UserMarker>) -> Option<Session> {
        read(&self.sessions).get(&user_id).cloned()
    }
}
