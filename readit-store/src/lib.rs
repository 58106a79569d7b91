pub mod posts;
mod record;
pub mod sessions;
pub mod users;

use readit_common::model::{
    Id,
    post::{CommentId, PostMarker},
    user::UserLogin,
};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum StoreError {
    #[error("User {} already exists", .0.get())]
    UserExists(UserLogin),
    #[error("There is no user {}", .0.get())]
    UnknownUser(UserLogin),
    #[error("Wrong password")]
    BadPassword,
    #[error("Post with id {0} was not found.")]
    PostNotFound(Id<PostMarker>),
    #[error("Comment {} was not found on post {}.", .0.get(), .1)]
    CommentNotFound(CommentId, Id<PostMarker>),
    #[error("Post {0} can only be deleted by its author.")]
    NotPostAuthor(Id<PostMarker>),
    #[error("Comment {} can only be deleted by its author.", .0.get())]
    NotCommentAuthor(CommentId),
}

// Poisoning is ignored: every table update is a single insert, remove or
// in-place field change.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_errors_name_comment_and_post() {
        let comment_id = CommentId::generate_random();
        let err = StoreError::CommentNotFound(comment_id.clone(), Id::new(7));

        assert_eq!(
            err.to_string(),
            format!("Comment {comment_id} was not found on post 7.")
        );
    }
}
