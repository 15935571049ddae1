//! API endpoints.

mod follows;
mod notifications;
mod posts;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/notifications", notifications::router())
        .merge(posts::router())
        .merge(follows::router())
}
