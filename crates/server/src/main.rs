//! Fitfeed server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use fitfeed_api::{middleware::AppState, router as api_router};
use fitfeed_common::Config;
use fitfeed_core::{
    ExpoPushProvider, FollowService, NotificationService, PostService, PushService, UserService,
};
use fitfeed_db::repositories::{
    CommentRepository, FollowRepository, NotificationPreferenceRepository, NotificationRepository,
    PostLikeRepository, PostRepository, PushTokenRepository, UserRepository,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fitfeed=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting fitfeed server...");

    // Load configuration
    let config = Config::load()?;

    // Connect to database
    let db = fitfeed_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    fitfeed_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let user_repo = UserRepository::new(Arc::clone(&db));
    let post_repo = PostRepository::new(Arc::clone(&db));
    let post_like_repo = PostLikeRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));
    let follow_repo = FollowRepository::new(Arc::clone(&db));
    let notification_repo = NotificationRepository::new(Arc::clone(&db));
    let push_token_repo = PushTokenRepository::new(Arc::clone(&db));
    let preference_repo = NotificationPreferenceRepository::new(Arc::clone(&db));

    // Initialize services
    let push_provider = Arc::new(ExpoPushProvider::new(
        config.push.endpoint.clone(),
        config.push.access_token.clone(),
    ));
    let push_service = PushService::new(push_token_repo, preference_repo, push_provider);

    let user_service = UserService::new(user_repo.clone());
    let notification_service = NotificationService::new(
        notification_repo,
        user_repo.clone(),
        Some(push_service.clone()),
    );
    let post_service = PostService::new(
        post_repo,
        post_like_repo,
        comment_repo,
        notification_service.clone(),
    );
    let follow_service = FollowService::new(follow_repo, user_repo, notification_service.clone());

    // Create app state
    let state = AppState {
        user_service,
        post_service,
        follow_service,
        notification_service,
        push_service,
    };

    // Build router
    let app = Router::new()
        .nest("/api", api_router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            fitfeed_api::middleware::auth_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
