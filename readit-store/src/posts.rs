use crate::{Result, StoreError, read, write};
use readit_common::model::{
    Id,
    auth::Session,
    post::{
        Author, Comment, CommentId, CommentRemovalError, NewPost, Post, PostMarker, VoteAction,
    },
    user::{UserLogin, UserMarker},
};
use std::{collections::HashMap, sync::RwLock};
use time::OffsetDateTime;

#[derive(Debug)]
struct PostTable {
    next_id: Id<PostMarker>,
    posts: HashMap<Id<PostMarker>, Post>,
}

impl PostTable {
    fn post_mut(&mut self, id: Id<PostMarker>) -> Result<&mut Post> {
        self.posts.get_mut(&id).ok_or(StoreError::PostNotFound(id))
    }

    fn ranked(&self, filter: impl Fn(&Post) -> bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .values()
            .filter(|&post| filter(post))
            .cloned()
            .collect();
        posts.sort_by(Post::ranking);
        posts
    }
}

/// All posts, guarded by a single lock. Every operation takes the lock once.
#[derive(Debug)]
pub struct PostRepository {
    table: RwLock<PostTable>,
}

impl Default for PostRepository {
    fn default() -> Self {
        Self {
            table: RwLock::new(PostTable {
                next_id: Id::new(1),
                posts: HashMap::new(),
            }),
        }
    }
}

impl PostRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn list(&self) -> Vec<Post> {
        read(&self.table).ranked(|_| true)
    }

    #[must_use]
    pub fn list_by_category(&self, category: &str) -> Vec<Post> {
        read(&self.table).ranked(|post| post.category == category)
    }

    #[must_use]
    pub fn list_by_author(&self, login: &UserLogin) -> Vec<Post> {
        read(&self.table).ranked(|post| &post.author.username == login)
    }

    pub fn create(&self, new_post: NewPost, author: &Session) -> Post {
        let mut table = write(&self.table);
        let id = table.next_id;
        table.next_id = id.next();

        let post = Post::new(
            id,
            new_post,
            Author::from(author),
            OffsetDateTime::now_utc(),
        );
        table.posts.insert(id, post.clone());
        post
    }

    #[must_use]
    pub fn fetch(&self, id: Id<PostMarker>) -> Option<Post> {
        read(&self.table).posts.get(&id).cloned()
    }

    /// Fetches a post and counts the view.
    pub fn view(&self, id: Id<PostMarker>) -> Result<Post> {
        let mut table = write(&self.table);
        let post = table.post_mut(id)?;
        post.views += 1;
        Ok(post.clone())
    }

    /// Replaces a stored post with `post`.
    pub fn update(&self, post: Post) -> Result<()> {
        let mut table = write(&self.table);
        let stored = table.post_mut(post.id)?;
        *stored = post;
        Ok(())
    }

    pub fn delete(&self, id: Id<PostMarker>, requested_by: &Session) -> Result<Post> {
        let mut table = write(&self.table);
        let post = table.post_mut(id)?;
        if post.author.id != requested_by.user_id {
            return Err(StoreError::NotPostAuthor(id));
        }

        table.posts.remove(&id).ok_or(StoreError::PostNotFound(id))
    }

    pub fn vote(
        &self,
        id: Id<PostMarker>,
        user_id: Id<UserMarker>,
        action: VoteAction,
    ) -> Result<Post> {
        let mut table = write(&self.table);
        let post = table.post_mut(id)?;
        post.cast_vote(user_id, action);
        Ok(post.clone())
    }

    pub fn add_comment(
        &self,
        id: Id<PostMarker>,
        body: String,
        author: &Session,
    ) -> Result<Post> {
        let comment = Comment {
            id: CommentId::generate_random(),
            author: Author::from(author),
            body,
            created: OffsetDateTime::now_utc(),
        };

        let mut table = write(&self.table);
        let post = table.post_mut(id)?;
        post.add_comment(comment);
        Ok(post.clone())
    }

    pub fn delete_comment(
        &self,
        id: Id<PostMarker>,
        comment_id: &CommentId,
        requested_by: &Session,
    ) -> Result<Post> {
        let mut table = write(&self.table);
        let post = table.post_mut(id)?;
        post.remove_comment(comment_id, requested_by.user_id)
            .map_err(|err| match err {
                CommentRemovalError::NotFound => {
                    StoreError::CommentNotFound(comment_id.clone(), id)
                }
                CommentRemovalError::NotAuthor => StoreError::NotCommentAuthor(comment_id.clone()),
            })?;
        Ok(post.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readit_common::model::post::{PostContent, Vote};
    use std::{sync::Arc, thread};

    fn session(id: u64, login: &str) -> Session {
        Session {
            user_id: Id::new(id),
            login: UserLogin::new(login.to_owned()).unwrap(),
        }
    }

    fn new_post(category: &str) -> NewPost {
        NewPost {
            title: "title".to_owned(),
            category: category.to_owned(),
            content: PostContent::Link {
                url: "https://example.com".to_owned(),
            },
        }
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let posts = PostRepository::new();
        let alice = session(1, "alice");

        let first = posts.create(new_post("music"), &alice);
        let second = posts.create(new_post("music"), &alice);

        assert_eq!(first.id.get(), 1);
        assert_eq!(second.id.get(), 2);
        assert_eq!(first.author.username.get(), "alice");
        assert_eq!(posts.fetch(first.id), Some(first));
    }

    #[test]
    fn view_increments_counter() {
        let posts = PostRepository::new();
        let post = posts.create(new_post("music"), &session(1, "alice"));

        assert_eq!(posts.view(post.id).unwrap().views, 1);
        assert_eq!(posts.view(post.id).unwrap().views, 2);
        assert_eq!(
            posts.view(Id::new(99)),
            Err(StoreError::PostNotFound(Id::new(99)))
        );
    }

    #[test]
    fn update_replaces_existing_post_only() {
        let posts = PostRepository::new();
        let mut post = posts.create(new_post("music"), &session(1, "alice"));
        post.title = "edited".to_owned();

        posts.update(post.clone()).unwrap();
        assert_eq!(posts.fetch(post.id).unwrap().title, "edited");

        post.id = Id::new(42);
        assert_eq!(posts.update(post), Err(StoreError::PostNotFound(Id::new(42))));
    }

    #[test]
    fn listings_filter_and_rank() {
        let posts = PostRepository::new();
        let alice = session(1, "alice");
        let bob = session(2, "bob");

        let music = posts.create(new_post("music"), &alice);
        let news = posts.create(new_post("news"), &bob);
        let later_music = posts.create(new_post("music"), &bob);
        posts.vote(later_music.id, alice.user_id, VoteAction::Upvote).unwrap();

        let ids = |list: Vec<Post>| list.iter().map(|post| post.id).collect::<Vec<_>>();
        assert_eq!(ids(posts.list()), [later_music.id, music.id, news.id]);
        assert_eq!(ids(posts.list_by_category("music")), [later_music.id, music.id]);
        assert_eq!(ids(posts.list_by_author(&bob.login)), [later_music.id, news.id]);
        assert!(posts.list_by_category("nothing").is_empty());
    }

    #[test]
    fn only_author_may_delete_post() {
        let posts = PostRepository::new();
        let post = posts.create(new_post("music"), &session(1, "alice"));

        assert_eq!(
            posts.delete(post.id, &session(2, "bob")),
            Err(StoreError::NotPostAuthor(post.id))
        );
        assert!(posts.fetch(post.id).is_some());

        posts.delete(post.id, &session(1, "alice")).unwrap();
        assert_eq!(posts.fetch(post.id), None);
        assert_eq!(posts.view(post.id), Err(StoreError::PostNotFound(post.id)));
        assert_eq!(
            posts.delete(post.id, &session(1, "alice")),
            Err(StoreError::PostNotFound(post.id))
        );
    }

    #[test]
    fn vote_toggling_converges_score() {
        let posts = PostRepository::new();
        let post = posts.create(new_post("music"), &session(1, "alice"));
        let bob = Id::new(2);

        let post_after = posts.vote(post.id, bob, VoteAction::Downvote).unwrap();
        assert_eq!((post_after.score, post_after.upvote_percentage), (0, 50));
        assert_eq!(post_after.votes.get(&bob), Some(&Vote::Down));

        let post_after = posts.vote(post.id, bob, VoteAction::Upvote).unwrap();
        assert_eq!((post_after.score, post_after.upvote_percentage), (2, 100));

        let post_after = posts.vote(post.id, bob, VoteAction::Unvote).unwrap();
        assert_eq!((post_after.score, post_after.upvote_percentage), (1, 100));
        assert_eq!(posts.fetch(post.id).unwrap().score, 1);
    }

    #[test]
    fn comments_are_added_and_removed_by_author() {
        let posts = PostRepository::new();
        let alice = session(1, "alice");
        let bob = session(2, "bob");
        let post = posts.create(new_post("music"), &alice);

        let commented = posts.add_comment(post.id, "first".to_owned(), &bob).unwrap();
        let comment_id = commented.comments[0].id.clone();
        assert_eq!(commented.comments[0].author.username.get(), "bob");

        assert_eq!(
            posts.delete_comment(post.id, &comment_id, &alice),
            Err(StoreError::NotCommentAuthor(comment_id.clone()))
        );

        let uncommented = posts.delete_comment(post.id, &comment_id, &bob).unwrap();
        assert!(uncommented.comments.is_empty());
        assert_eq!(
            posts.delete_comment(post.id, &comment_id, &bob),
            Err(StoreError::CommentNotFound(comment_id, post.id))
        );
    }

    #[test]
    fn comment_on_missing_post_fails() {
        let posts = PostRepository::new();
        assert_eq!(
            posts.add_comment(Id::new(5), "hi".to_owned(), &session(1, "alice")),
            Err(StoreError::PostNotFound(Id::new(5)))
        );
    }

    #[test]
    fn concurrent_votes_are_all_counted() {
        let posts = Arc::new(PostRepository::new());
        let post = posts.create(new_post("music"), &session(1, "alice"));

        let handles: Vec<_> = (2..=51)
            .map(|user| {
                let posts = Arc::clone(&posts);
                thread::spawn(move || {
                    posts.vote(post.id, Id::new(user), VoteAction::Upvote).unwrap();
                    posts.view(post.id).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let post = posts.fetch(post.id).unwrap();
        assert_eq!(post.score, 51);
        assert_eq!(post.views, 50);
    }
}
