use crate::server::{Result, ServerError, ServerRouter, auth::AuthenticatedUser, json::Json};
use axum::{extract::State, http::StatusCode};
use axum_extra::routing::{RouterExt, TypedPath};
use readit_common::model::{
    Id,
    post::{CommentId, NewComment, NewPost, NewPostRequest, Post, PostMarker, VoteAction},
};
use readit_store::posts::PostRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(list_posts)
        .typed_post(create_post)
        .typed_get(list_posts_slash)
        .typed_post(create_post_slash)
        .typed_get(list_category)
        .typed_get(get_post)
        .typed_post(add_comment)
        .typed_delete(delete_post)
        .typed_get(upvote)
        .typed_get(downvote)
        .typed_get(unvote)
        .typed_delete(delete_comment)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts", rejection(ServerError))]
struct PostsPath();

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/", rejection(ServerError))]
struct PostsSlashPath();

async fn list_posts(
    PostsPath(): PostsPath,
    State(posts): State<Arc<PostRepository>>,
) -> Json<Vec<Post>> {
    Json(posts.list())
}

async fn list_posts_slash(
    PostsSlashPath(): PostsSlashPath,
    State(posts): State<Arc<PostRepository>>,
) -> Json<Vec<Post>> {
    Json(posts.list())
}

fn insert_post(
    posts: &PostRepository,
    user: &AuthenticatedUser,
    request: NewPostRequest,
) -> Result<(StatusCode, Json<Post>)> {
    let new_post = NewPost::try_from(request)?;
    let post = posts.create(new_post, user.session());
    info!(post_id = %post.id, user_id = %post.author.id, "Added new post");

    Ok((StatusCode::CREATED, Json(post)))
}

async fn create_post(
    PostsPath(): PostsPath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
    Json(request): Json<NewPostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    insert_post(&posts, &user, request)
}

async fn create_post_slash(
    PostsSlashPath(): PostsSlashPath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
    Json(request): Json<NewPostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    insert_post(&posts, &user, request)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/posts/{category}", rejection(ServerError))]
struct CategoryPath {
    category: String,
}

async fn list_category(
    CategoryPath { category }: CategoryPath,
    State(posts): State<Arc<PostRepository>>,
) -> Json<Vec<Post>> {
    Json(posts.list_by_category(&category))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/{id}", rejection(ServerError))]
struct PostPath {
    id: Id<PostMarker>,
}

async fn get_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostRepository>>,
) -> Result<Json<Post>> {
    let post = posts.view(id)?;

    Ok(Json(post))
}

async fn add_comment(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
    Json(comment): Json<NewComment>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = posts.add_comment(id, comment.into_body()?, user.session())?;
    info!(post_id = %id, user_id = %user.session().user_id, "Added comment");

    Ok((StatusCode::CREATED, Json(post)))
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize)]
struct DeleteResponse {
    message: &'static str,
}

async fn delete_post(
    PostPath { id }: PostPath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
) -> Result<Json<DeleteResponse>> {
    posts.delete(id, user.session())?;
    info!(post_id = %id, user_id = %user.session().user_id, "Deleted post");

    Ok(Json(DeleteResponse { message: "success" }))
}

fn vote(
    posts: &PostRepository,
    id: Id<PostMarker>,
    user: &AuthenticatedUser,
    action: VoteAction,
) -> Result<Json<Post>> {
    let user_id = user.session().user_id;
    let post = posts.vote(id, user_id, action)?;
    info!(post_id = %id, %user_id, ?action, score = post.score, "Voted on post");

    Ok(Json(post))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/{id}/upvote", rejection(ServerError))]
struct UpvotePath {
    id: Id<PostMarker>,
}

async fn upvote(
    UpvotePath { id }: UpvotePath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    vote(&posts, id, &user, VoteAction::Upvote)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/{id}/downvote", rejection(ServerError))]
struct DownvotePath {
    id: Id<PostMarker>,
}

async fn downvote(
    DownvotePath { id }: DownvotePath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    vote(&posts, id, &user, VoteAction::Downvote)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/{id}/unvote", rejection(ServerError))]
struct UnvotePath {
    id: Id<PostMarker>,
}

async fn unvote(
    UnvotePath { id }: UnvotePath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    vote(&posts, id, &user, VoteAction::Unvote)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/post/{id}/{comment_id}", rejection(ServerError))]
struct CommentPath {
    id: Id<PostMarker>,
    comment_id: CommentId,
}

async fn delete_comment(
    CommentPath { id, comment_id }: CommentPath,
    State(posts): State<Arc<PostRepository>>,
    user: AuthenticatedUser,
) -> Result<Json<Post>> {
    let post = posts.delete_comment(id, &comment_id, user.session())?;
    info!(post_id = %id, comment_id = comment_id.get(), "Deleted comment");

    Ok(Json(post))
}
