//! HTTP API layer for fitfeed.
//!
//! - **Endpoints**: notifications, posts, follows
//! - **Extractors**: bearer-token authentication
//! - **Middleware**: auth, logging, CORS
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::AppState;
