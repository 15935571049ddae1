//! Post interaction endpoints: likes and comments.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, post},
};
use fitfeed_common::AppResult;
use fitfeed_db::entities::comment;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Like state response.
#[derive(Serialize)]
pub struct LikeResponse {
    pub post_id: String,
    pub liked: bool,
}

/// Like a post.
async fn like_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<LikeResponse>> {
    state.post_service.like(&user, &post_id).await?;
    Ok(ApiResponse::ok(LikeResponse {
        post_id,
        liked: true,
    }))
}

/// Remove a like from a post.
async fn unlike_post(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<ApiResponse<LikeResponse>> {
    state.post_service.unlike(&user.id, &post_id).await?;
    Ok(ApiResponse::ok(LikeResponse {
        post_id,
        liked: false,
    }))
}

/// Create comment request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 2000, message = "content must be 1-2000 characters"))]
    pub content: String,
    /// Set to reply to an existing comment on the same post
    pub parent_comment_id: Option<String>,
}

/// Comment response.
#[derive(Serialize)]
pub struct CommentResponse {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub created_at: String,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            post_id: c.post_id,
            user_id: c.user_id,
            parent_comment_id: c.parent_comment_id,
            content: c.content,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Comment on a post (or reply to a comment).
async fn create_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> AppResult<ApiResponse<CommentResponse>> {
    req.validate()?;

    let created = state
        .post_service
        .comment(&user, &post_id, &req.content, req.parent_comment_id)
        .await?;
    Ok(ApiResponse::ok(created.into()))
}

/// Delete a comment (owner only).
async fn delete_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.post_service.delete_comment(&user.id, &comment_id).await?;
    Ok(ApiResponse::ok(()))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{id}/like", post(like_post).delete(unlike_post))
        .route("/posts/{id}/comments", post(create_comment))
        .route("/comments/{id}", delete(delete_comment))
}
