use crate::{Result, StoreError, read, record::UserRecord, write};
use readit_common::model::{
    Id,
    user::{Password, User, UserLogin, UserMarker},
};
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::RwLock,
};

#[derive(Debug)]
struct UserTable {
    next_id: Id<UserMarker>,
    by_login: HashMap<UserLogin, UserRecord>,
}

/// Registered users, keyed by login.
#[derive(Debug)]
pub struct UserRepository {
    table: RwLock<UserTable>,
}

impl Default for UserRepository {
    fn default() -> Self {
        Self {
            table: RwLock::new(UserTable {
                next_id: Id::new(1),
                by_login: HashMap::new(),
            }),
        }
    }
}

impl UserRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, login: UserLogin, password: Password) -> Result<User> {
        let mut table = write(&self.table);
        let id = table.next_id;

        let record = match table.by_login.entry(login) {
            Entry::Occupied(entry) => return Err(StoreError::UserExists(entry.key().clone())),
            Entry::Vacant(entry) => {
                let login = entry.key().clone();
                entry.insert(UserRecord {
                    id,
                    login,
                    password,
                })
            }
        };
        let user = User::from(&*record);

        table.next_id = id.next();
        Ok(user)
    }

    pub fn authorize(&self, login: &UserLogin, password: &Password) -> Result<User> {
        let table = read(&self.table);
        let record = table
            .by_login
            .get(login)
            .ok_or_else(|| StoreError::UnknownUser(login.clone()))?;

        if !record.password.matches(password) {
            return Err(StoreError::BadPassword);
        }

        Ok(User::from(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn login(name: &str) -> UserLogin {
        UserLogin::new(name.to_owned()).unwrap()
    }

    fn password(secret: &str) -> Password {
        Password::new(secret.to_owned())
    }

    #[test]
    fn registration_assigns_sequential_ids() {
        let users = UserRepository::new();
        let alice = users.register(login("alice"), password("a")).unwrap();
        let bob = users.register(login("bob"), password("b")).unwrap();

        assert_eq!(alice.id.get(), 1);
        assert_eq!(bob.id.get(), 2);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let users = UserRepository::new();
        users.register(login("alice"), password("a")).unwrap();

        assert_eq!(
            users.register(login("alice"), password("other")),
            Err(StoreError::UserExists(login("alice")))
        );

        let carol = users.register(login("carol"), password("c")).unwrap();
        assert_eq!(carol.id.get(), 2);
    }

    #[test]
    fn authorize_checks_password() {
        let users = UserRepository::new();
        let alice = users.register(login("alice"), password("a")).unwrap();

        assert_eq!(users.authorize(&login("alice"), &password("a")), Ok(alice));
        assert_eq!(
            users.authorize(&login("alice"), &password("b")),
            Err(StoreError::BadPassword)
        );
        assert_eq!(
            users.authorize(&login("nobody"), &password("a")),
            Err(StoreError::UnknownUser(login("nobody")))
        );
    }
}
