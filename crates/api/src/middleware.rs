//! API middleware.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use fitfeed_core::{FollowService, NotificationService, PostService, PushService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub follow_service: FollowService,
    pub notification_service: NotificationService,
    pub push_service: PushService,
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to a user and stores it in
/// request extensions. Endpoints decide via [`crate::extractors::AuthUser`]
/// whether authentication is required.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
        && let Ok(user) = state.user_service.authenticate_by_token(token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
