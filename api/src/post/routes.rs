use axum::{
    Json, Router, debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    App,
    error::AppError,
    identity::AuthUser,
    listing::ListRequest,
    query::Query,
    vote::{VoteKind, VoteOutcome},
};

use super::{CreatePost, EditPost, Post};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/posts", post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).patch(patch_post).delete(delete_post),
        )
        .route("/posts/{id}/votes/{kind}", post(vote_post))
        .route("/posts/{id}/score", post(recompute_score))
        .route("/subreddits/{name}/posts", get(list_subreddit_posts))
        .route("/users/{username}/posts", get(list_user_posts))
}

#[debug_handler]
async fn get_post(State(ctx): State<App>, Path(id): Path<Uuid>) -> Result<Json<Post>, AppError> {
    Ok(Json(ctx.posts.find(id).await?))
}

#[debug_handler]
async fn create_post(
    State(ctx): State<App>,
    AuthUser(username): AuthUser,
    crate::json::Json(submission): crate::json::Json<CreatePost>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let post = ctx.posts.create(&username, submission).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[debug_handler]
async fn patch_post(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    AuthUser(username): AuthUser,
    crate::json::Json(edit): crate::json::Json<EditPost>,
) -> Result<Json<Post>, AppError> {
    Ok(Json(ctx.posts.edit(id, &username, edit).await?))
}

#[debug_handler]
async fn delete_post(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    AuthUser(username): AuthUser,
) -> Result<StatusCode, AppError> {
    ctx.posts.delete(id, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn vote_post(
    State(ctx): State<App>,
    Path((id, kind)): Path<(Uuid, VoteKind)>,
    AuthUser(username): AuthUser,
) -> Result<Json<VoteOutcome>, AppError> {
    Ok(Json(ctx.posts.vote(id, &username, kind).await?))
}

#[debug_handler]
async fn recompute_score(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    AuthUser(_): AuthUser,
) -> Result<Json<Post>, AppError> {
    Ok(Json(ctx.posts.recompute(id).await?))
}

#[debug_handler]
async fn list_subreddit_posts(
    State(ctx): State<App>,
    Path(name): Path<String>,
    Query(request): Query<ListRequest>,
) -> Result<Json<Vec<Post>>, AppError> {
    let page = request.to_page(ctx.config.max_page_size)?;
    Ok(Json(ctx.posts.list_by_subreddit(&name, page).await?))
}

#[debug_handler]
async fn list_user_posts(
    State(ctx): State<App>,
    Path(username): Path<String>,
    Query(request): Query<ListRequest>,
) -> Result<Json<Vec<Post>>, AppError> {
    let page = request.to_page(ctx.config.max_page_size)?;
    Ok(Json(ctx.posts.list_by_author(&username, page).await?))
}
