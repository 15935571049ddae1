//! Notifications endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use chrono::{DateTime, FixedOffset};
use fitfeed_common::{AppError, AppResult};
use fitfeed_core::{PreferencesUpdate, PushPayload};
use fitfeed_db::entities::notification::{
    Model as NotificationModel, NotificationCategory, NotificationKind,
};
use fitfeed_db::entities::notification_preference;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

const DEFAULT_LIMIT: u64 = 20;
const MAX_LIMIT: u64 = 100;

/// Category filter.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryFilter {
    Social,
    Workout,
}

impl CategoryFilter {
    const fn to_category(self) -> NotificationCategory {
        match self {
            Self::Social => NotificationCategory::Social,
            Self::Workout => NotificationCategory::Workout,
        }
    }
}

/// List notifications query.
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    /// Maximum results (default: 20, max: 100)
    pub limit: Option<u64>,
    /// RFC 3339 cursor: only notifications created before this instant
    pub before: Option<String>,
    /// Category filter (social | workout)
    pub category: Option<CategoryFilter>,
}

/// Notifications page.
#[derive(Serialize)]
pub struct NotificationsListResponse {
    pub notifications: Vec<NotificationResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

/// One notification.
#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub kind: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: String,
}

impl From<NotificationModel> for NotificationResponse {
    fn from(n: NotificationModel) -> Self {
        Self {
            id: n.id,
            kind: n.kind.as_str().to_string(),
            category: n.category.as_str().to_string(),
            actor_id: n.actor_id,
            post_id: n.post_id,
            comment_id: n.comment_id,
            data: n.data,
            is_read: n.is_read,
            created_at: n.created_at.to_rfc3339(),
        }
    }
}

fn parse_cursor(cursor: Option<&str>) -> AppResult<Option<DateTime<FixedOffset>>> {
    cursor
        .map(|c| {
            DateTime::parse_from_rfc3339(c)
                .map_err(|_| AppError::BadRequest(format!("Invalid cursor: {c}")))
        })
        .transpose()
}

/// Get notifications for the authenticated user, newest first.
async fn list_notifications(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<ApiResponse<NotificationsListResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let before = parse_cursor(query.before.as_deref())?;
    let category = query.category.map(CategoryFilter::to_category);

    let notifications = state
        .notification_service
        .list(&user.id, limit, before, category)
        .await?;

    // A full page may have more behind it; the last created_at is the cursor.
    let next_cursor = if notifications.len() as u64 == limit {
        notifications.last().map(|n| n.created_at.to_rfc3339())
    } else {
        None
    };

    Ok(ApiResponse::ok(NotificationsListResponse {
        notifications: notifications.into_iter().map(Into::into).collect(),
        next_cursor,
    }))
}

/// Unread count response.
#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: i32,
}

/// Get the unread notification badge count.
async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.notification_service.unread_count(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

/// Mark a notification as read.
async fn mark_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state
        .notification_service
        .mark_as_read(&user.id, &notification_id)
        .await?;
    Ok(ApiResponse::ok(()))
}

/// Mark all as read response.
#[derive(Serialize)]
pub struct MarkAllAsReadResponse {
    pub count: u64,
}

/// Mark all notifications as read.
async fn mark_all_as_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllAsReadResponse>> {
    let count = state.notification_service.mark_all_as_read(&user.id).await?;
    Ok(ApiResponse::ok(MarkAllAsReadResponse { count }))
}

/// Register push token request.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterPushTokenRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    #[validate(length(min = 1, message = "platform is required"))]
    pub platform: String,
    pub device_name: Option<String>,
    pub device_id: Option<String>,
}

/// Registered token response.
#[derive(Serialize)]
pub struct PushTokenResponse {
    pub id: String,
    pub token: String,
    pub platform: String,
    pub active: bool,
}

/// Register a device push token for the authenticated user.
async fn register_push_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterPushTokenRequest>,
) -> AppResult<ApiResponse<PushTokenResponse>> {
    req.validate()?;

    let token = state
        .push_service
        .register_token(
            &user.id,
            &req.token,
            &req.platform,
            req.device_name,
            req.device_id,
        )
        .await?;

    Ok(ApiResponse::ok(PushTokenResponse {
        id: token.id,
        token: token.token,
        platform: token.platform,
        active: token.active,
    }))
}

/// Unregister push token request.
#[derive(Debug, Deserialize)]
pub struct UnregisterPushTokenRequest {
    /// Absent ⇒ remove every token of the user
    pub token: Option<String>,
}

/// Removed tokens response.
#[derive(Serialize)]
pub struct UnregisterPushTokenResponse {
    pub removed: u64,
}

/// Unregister one or all device push tokens.
async fn unregister_push_token(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UnregisterPushTokenRequest>,
) -> AppResult<ApiResponse<UnregisterPushTokenResponse>> {
    let removed = state
        .push_service
        .unregister_token(&user.id, req.token.as_deref())
        .await?;
    Ok(ApiResponse::ok(UnregisterPushTokenResponse { removed }))
}

/// Notification preferences response.
#[derive(Serialize)]
pub struct PreferencesResponse {
    pub push_enabled: bool,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: String,
    pub quiet_hours_end: String,
}

impl From<notification_preference::Model> for PreferencesResponse {
    fn from(p: notification_preference::Model) -> Self {
        Self {
            push_enabled: p.push_enabled,
            quiet_hours_enabled: p.quiet_hours_enabled,
            quiet_hours_start: p.quiet_hours_start,
            quiet_hours_end: p.quiet_hours_end,
        }
    }
}

/// Get notification preferences.
async fn get_preferences(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PreferencesResponse>> {
    let prefs = state.push_service.get_preferences(&user.id).await?;
    Ok(ApiResponse::ok(prefs.into()))
}

/// Update notification preferences request.
#[derive(Debug, Deserialize)]
pub struct UpdatePreferencesRequest {
    pub push_enabled: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
}

/// Update notification preferences (partial).
async fn update_preferences(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<UpdatePreferencesRequest>,
) -> AppResult<ApiResponse<PreferencesResponse>> {
    let prefs = state
        .push_service
        .update_preferences(
            &user.id,
            PreferencesUpdate {
                push_enabled: req.push_enabled,
                quiet_hours_enabled: req.quiet_hours_enabled,
                quiet_hours_start: req.quiet_hours_start,
                quiet_hours_end: req.quiet_hours_end,
            },
        )
        .await?;
    Ok(ApiResponse::ok(prefs.into()))
}

/// Test push response.
#[derive(Serialize)]
pub struct TestPushResponse {
    pub delivered: usize,
    pub failed: usize,
}

/// Send a test push to the authenticated user's devices.
async fn test_push(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<TestPushResponse>> {
    let payload = PushPayload {
        title: "Test Notification".to_string(),
        body: "Push notifications are working!".to_string(),
        data: serde_json::json!({"kind": "test"}),
        channel_id: NotificationKind::WorkoutReminder
            .category()
            .as_str()
            .to_string(),
    };
    let tickets = state.push_service.send_to_user(&user.id, &payload).await?;

    let delivered = tickets.iter().filter(|t| t.is_ok()).count();
    Ok(ApiResponse::ok(TestPushResponse {
        delivered,
        failed: tickets.len() - delivered,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/{id}/read", put(mark_as_read))
        .route("/read-all", put(mark_all_as_read))
        .route("/register-push-token", post(register_push_token))
        .route("/unregister-push-token", post(unregister_push_token))
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route("/test-push", post(test_push))
}
