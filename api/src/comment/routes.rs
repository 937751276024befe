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

use super::{Comment, CommentTree, CreateComment, EditComment};

pub fn route() -> Router<App> {
    Router::<App>::new()
        .route("/comments", post(create_comment))
        .route(
            "/comments/{id}",
            get(get_comment).patch(patch_comment).delete(delete_comment),
        )
        .route("/comments/{id}/votes/{kind}", post(vote_comment))
        .route("/comments/{id}/score", post(recompute_score))
        .route("/posts/{id}/comments", get(get_comment_tree))
        .route("/users/{username}/comments", get(list_user_comments))
}

#[debug_handler]
async fn get_comment(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(ctx.comments.find(id).await?))
}

#[debug_handler]
async fn create_comment(
    State(ctx): State<App>,
    AuthUser(username): AuthUser,
    crate::json::Json(submission): crate::json::Json<CreateComment>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let comment = ctx.comments.create(&username, submission).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[debug_handler]
async fn patch_comment(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    AuthUser(username): AuthUser,
    crate::json::Json(edit): crate::json::Json<EditComment>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(ctx.comments.edit(id, &username, edit).await?))
}

#[debug_handler]
async fn delete_comment(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    AuthUser(username): AuthUser,
) -> Result<StatusCode, AppError> {
    ctx.comments.delete(id, &username).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
async fn vote_comment(
    State(ctx): State<App>,
    Path((id, kind)): Path<(Uuid, VoteKind)>,
    AuthUser(username): AuthUser,
) -> Result<Json<VoteOutcome>, AppError> {
    Ok(Json(ctx.comments.vote(id, &username, kind).await?))
}

#[debug_handler]
async fn recompute_score(
    State(ctx): State<App>,
    Path(id): Path<Uuid>,
    AuthUser(_): AuthUser,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(ctx.comments.recompute(id).await?))
}

#[debug_handler]
async fn get_comment_tree(
    State(ctx): State<App>,
    Path(post_id): Path<Uuid>,
    Query(request): Query<ListRequest>,
) -> Result<Json<Vec<CommentTree>>, AppError> {
    let page = request.to_page(ctx.config.max_page_size)?;
    Ok(Json(ctx.comments.tree(post_id, page).await?))
}

#[debug_handler]
async fn list_user_comments(
    State(ctx): State<App>,
    Path(username): Path<String>,
    Query(request): Query<ListRequest>,
) -> Result<Json<Vec<Comment>>, AppError> {
    let page = request.to_page(ctx.config.max_page_size)?;
    Ok(Json(ctx.comments.list_by_author(&username, page).await?))
}
