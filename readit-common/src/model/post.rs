use crate::model::{
    Id,
    auth::Session,
    user::{UserLogin, UserMarker},
};
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error, Unexpected},
    ser::SerializeSeq,
};
use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use time::OffsetDateTime;
use url::Url;

pub const COMMENT_ID_LEN: usize = 16;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
pub struct Author {
    pub username: UserLogin,
    pub id: Id<UserMarker>,
}

impl From<&Session> for Author {
    fn from(session: &Session) -> Self {
        Self {
            username: session.login.clone(),
            id: session.user_id,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    Text,
    Link,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PostContent {
    Text { text: String },
    Link { url: String },
}

impl PostContent {
    #[must_use]
    pub fn kind(&self) -> PostKind {
        match self {
            PostContent::Text { .. } => PostKind::Text,
            PostContent::Link { .. } => PostKind::Link,
        }
    }
}

/// A single user's vote on a post. Serialized as its delta.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum Vote {
    Down,
    Up,
}

impl Vote {
    #[must_use]
    pub fn delta(self) -> i64 {
        match self {
            Vote::Down => -1,
            Vote::Up => 1,
        }
    }
}

impl Serialize for Vote {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.delta())
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub enum VoteAction {
    Upvote,
    Downvote,
    Unvote,
}

impl VoteAction {
    #[must_use]
    pub fn vote(self) -> Option<Vote> {
        match self {
            VoteAction::Upvote => Some(Vote::Up),
            VoteAction::Downvote => Some(Vote::Down),
            VoteAction::Unvote => None,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Serialize)]
#[serde(transparent)]
pub struct CommentId(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The comment id is invalid: {0:?}")]
pub struct InvalidCommentIdError(String);

impl CommentId {
    #[must_use]
    pub fn generate_random() -> Self {
        let bytes: [u8; COMMENT_ID_LEN] = rand::random();
        Self(BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn parse(id: String) -> Result<Self, InvalidCommentIdError> {
        match BASE64_URL_SAFE_NO_PAD.decode(&id) {
            Ok(bytes) if bytes.len() == COMMENT_ID_LEN => Ok(Self(id)),
            _ => Err(InvalidCommentIdError(id)),
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl Display for CommentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CommentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommentId::parse(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"CommentId"))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: Author,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub author: Author,
    pub category: String,
    #[serde(flatten)]
    pub content: PostContent,
    pub score: i64,
    pub views: u64,
    #[serde(serialize_with = "serialize_votes")]
    pub votes: BTreeMap<Id<UserMarker>, Vote>,
    pub comments: Vec<Comment>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    pub upvote_percentage: u8,
}

#[derive(Serialize)]
struct VoteEntry {
    user: Id<UserMarker>,
    vote: Vote,
}

fn serialize_votes<S>(
    votes: &BTreeMap<Id<UserMarker>, Vote>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(votes.len()))?;
    for (&user, &vote) in votes {
        seq.serialize_element(&VoteEntry { user, vote })?;
    }
    seq.end()
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum CommentRemovalError {
    #[error("The comment does not exist on this post")]
    NotFound,
    #[error("Only the author may delete a comment")]
    NotAuthor,
}

impl Post {
    /// Creates a post that already carries its author's upvote.
    #[must_use]
    pub fn new(
        id: Id<PostMarker>,
        new_post: NewPost,
        author: Author,
        created: OffsetDateTime,
    ) -> Self {
        let mut post = Self {
            id,
            title: new_post.title,
            category: new_post.category,
            content: new_post.content,
            votes: BTreeMap::from([(author.id, Vote::Up)]),
            author,
            score: 0,
            views: 0,
            comments: Vec::new(),
            created,
            upvote_percentage: 0,
        };
        post.recount();
        post
    }

    pub fn cast_vote(&mut self, user: Id<UserMarker>, action: VoteAction) {
        match action.vote() {
            Some(vote) => {
                self.votes.insert(user, vote);
            }
            None => {
                self.votes.remove(&user);
            }
        }
        self.recount();
    }

    /// Recomputes score and upvote percentage from the vote table.
    pub fn recount(&mut self) {
        self.score = self.votes.values().map(|vote| vote.delta()).sum();

        let voters = self.votes.len();
        let upvotes = self.votes.values().filter(|&&vote| vote == Vote::Up).count();
        self.upvote_percentage = if voters == 0 {
            0
        } else {
            u8::try_from(upvotes * 100 / voters).unwrap_or(100)
        };
    }

    pub fn add_comment(&mut self, comment: Comment) {
        self.comments.push(comment);
    }

    pub fn remove_comment(
        &mut self,
        comment_id: &CommentId,
        requested_by: Id<UserMarker>,
    ) -> Result<Comment, CommentRemovalError> {
        let position = self
            .comments
            .iter()
            .position(|comment| &comment.id == comment_id)
            .ok_or(CommentRemovalError::NotFound)?;

        if self.comments[position].author.id != requested_by {
            return Err(CommentRemovalError::NotAuthor);
        }

        Ok(self.comments.remove(position))
    }

    /// Ordering used for every post listing: highest score first, older posts
    /// first among equal scores.
    #[must_use]
    pub fn ranking(a: &Post, b: &Post) -> Ordering {
        b.score
            .cmp(&a.score)
            .then_with(|| a.created.cmp(&b.created))
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum PostValidationError {
    #[error("A post cannot contain both a link and a text")]
    UrlAndText { url: String, text: String },
    #[error("A post needs either a link or a text")]
    NoUrlAndNoText,
    #[error("URL is not valid")]
    InvalidUrl(String),
    #[error("The post type does not match its content")]
    KindMismatch(PostKind),
    #[error("The title must not be empty")]
    EmptyTitle,
    #[error("The category must not be empty")]
    EmptyCategory,
    #[error("The comment must not be empty")]
    EmptyComment,
}

impl PostValidationError {
    /// Name of the offending request field.
    #[must_use]
    pub fn param(&self) -> &'static str {
        match self {
            PostValidationError::UrlAndText { .. } => "urlAndText",
            PostValidationError::NoUrlAndNoText => "noUrlAndNoText",
            PostValidationError::InvalidUrl(_) => "url",
            PostValidationError::KindMismatch(_) => "type",
            PostValidationError::EmptyTitle => "title",
            PostValidationError::EmptyCategory => "category",
            PostValidationError::EmptyComment => "comment",
        }
    }

    #[must_use]
    pub fn value(&self) -> String {
        match self {
            PostValidationError::UrlAndText { url, text } => format!("{url}{text}"),
            PostValidationError::InvalidUrl(url) => url.clone(),
            PostValidationError::KindMismatch(PostKind::Text) => "text".to_owned(),
            PostValidationError::KindMismatch(PostKind::Link) => "link".to_owned(),
            PostValidationError::NoUrlAndNoText
            | PostValidationError::EmptyTitle
            | PostValidationError::EmptyCategory
            | PostValidationError::EmptyComment => String::new(),
        }
    }
}

/// Raw body of a post creation request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct NewPostRequest {
    pub title: String,
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: Option<PostKind>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A validated post creation request.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub title: String,
    pub category: String,
    pub content: PostContent,
}

fn is_web_url(url: &str) -> bool {
    Url::parse(url).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

impl TryFrom<NewPostRequest> for NewPost {
    type Error = PostValidationError;

    fn try_from(request: NewPostRequest) -> Result<Self, Self::Error> {
        let url = request.url.filter(|url| !url.is_empty());
        let text = request.text.filter(|text| !text.is_empty());

        let content = match (url, text) {
            (Some(url), Some(text)) => return Err(PostValidationError::UrlAndText { url, text }),
            (None, None) => return Err(PostValidationError::NoUrlAndNoText),
            (Some(url), None) if !is_web_url(&url) => {
                return Err(PostValidationError::InvalidUrl(url));
            }
            (Some(url), None) => PostContent::Link { url },
            (None, Some(text)) => PostContent::Text { text },
        };

        if let Some(kind) = request.kind
            && kind != content.kind()
        {
            return Err(PostValidationError::KindMismatch(kind));
        }
        if request.title.trim().is_empty() {
            return Err(PostValidationError::EmptyTitle);
        }
        if request.category.trim().is_empty() {
            return Err(PostValidationError::EmptyCategory);
        }

        Ok(Self {
            title: request.title,
            category: request.category,
            content,
        })
    }
}

/// Body of a comment creation request.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize)]
pub struct NewComment {
    pub comment: String,
}

impl NewComment {
    pub fn into_body(self) -> Result<String, PostValidationError> {
        if self.comment.trim().is_empty() {
            Err(PostValidationError::EmptyComment)
        } else {
            Ok(self.comment)
        }
    }
}
