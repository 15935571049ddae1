//! Follow endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::post,
};
use fitfeed_common::AppResult;
use serde::Serialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Follow state response.
#[derive(Serialize)]
pub struct FollowResponse {
    pub user_id: String,
    pub following: bool,
}

/// Follow a user.
async fn follow_user(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(followee_id): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    state.follow_service.follow(&user, &followee_id).await?;
    Ok(ApiResponse::ok(FollowResponse {
        user_id: followee_id,
        following: true,
    }))
}

/// Unfollow a user.
async fn unfollow_user(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(followee_id): Path<String>,
) -> AppResult<ApiResponse<FollowResponse>> {
    state.follow_service.unfollow(&user.id, &followee_id).await?;
    Ok(ApiResponse::ok(FollowResponse {
        user_id: followee_id,
        following: false,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/users/{id}/follow",
        post(follow_user).delete(unfollow_user),
    )
}
