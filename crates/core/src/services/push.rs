//! Push dispatch adapter.
//!
//! Wraps the push-delivery provider behind the [`PushProvider`] trait, fans a
//! payload out to every registered device of a user, and reconciles delivery
//! tickets back into token state.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Local, NaiveTime, Utc};
use fitfeed_db::entities::{notification_preference, push_token};
use fitfeed_db::repositories::{NotificationPreferenceRepository, PushTokenRepository};
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use fitfeed_common::{AppError, AppResult};

/// Push notification payload, synthesized per notification kind.
#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Additional data handed to the app
    pub data: serde_json::Value,
    /// Android channel ID
    pub channel_id: String,
}

/// One message handed to the delivery provider, addressed to a device token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Destination device token
    pub to: String,
    /// Notification title
    pub title: String,
    /// Notification body
    pub body: String,
    /// Additional data handed to the app
    pub data: serde_json::Value,
    /// Badge count, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<i32>,
    /// Delivery priority
    pub priority: String,
    /// Android channel ID
    pub channel_id: String,
}

impl PushMessage {
    /// Address a payload to one device token.
    #[must_use]
    pub fn for_token(token: &str, payload: &PushPayload) -> Self {
        Self {
            to: token.to_string(),
            title: payload.title.clone(),
            body: payload.body.clone(),
            data: payload.data.clone(),
            badge: None,
            priority: "high".to_string(),
            channel_id: payload.channel_id.clone(),
        }
    }
}

/// Delivery ticket status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Accepted by the provider
    Ok,
    /// Rejected
    Error,
}

/// Provider error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PushErrorCode {
    /// The device token is permanently unregistered; stop sending to it.
    DeviceNotRegistered,
    /// Payload exceeded the provider limit.
    MessageTooBig,
    /// Provider rate limit hit; temporarily undeliverable.
    MessageRateExceeded,
    /// Bad provider credentials.
    InvalidCredentials,
    /// Anything the provider did not classify.
    Unknown,
}

impl PushErrorCode {
    fn from_provider(code: &str) -> Self {
        match code {
            "DeviceNotRegistered" => Self::DeviceNotRegistered,
            "MessageTooBig" => Self::MessageTooBig,
            "MessageRateExceeded" => Self::MessageRateExceeded,
            "InvalidCredentials" => Self::InvalidCredentials,
            _ => Self::Unknown,
        }
    }
}

/// Per-message acknowledgment returned by the provider.
#[derive(Debug, Clone)]
pub struct PushTicket {
    /// Token the message was addressed to
    pub token: String,
    /// Accepted or rejected
    pub status: TicketStatus,
    /// Provider receipt ID on success
    pub ticket_id: Option<String>,
    /// Provider error message on failure
    pub message: Option<String>,
    /// Error classification on failure
    pub error_code: Option<PushErrorCode>,
}

impl PushTicket {
    /// Successful ticket.
    #[must_use]
    pub fn ok(token: impl Into<String>, ticket_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            status: TicketStatus::Ok,
            ticket_id: Some(ticket_id.into()),
            message: None,
            error_code: None,
        }
    }

    /// Failed ticket.
    #[must_use]
    pub fn error(
        token: impl Into<String>,
        message: impl Into<String>,
        error_code: PushErrorCode,
    ) -> Self {
        Self {
            token: token.into(),
            status: TicketStatus::Error,
            ticket_id: None,
            message: Some(message.into()),
            error_code: Some(error_code),
        }
    }

    /// Was the message accepted?
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self.status, TicketStatus::Ok)
    }
}

/// Push delivery provider seam.
///
/// One batched call per user; one ticket per message, in request order.
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Send a batch of messages, returning one ticket per message.
    async fn send(&self, messages: Vec<PushMessage>) -> AppResult<Vec<PushTicket>>;
}

#[derive(Debug, Deserialize)]
struct ExpoSendResponse {
    data: Vec<ExpoTicket>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicket {
    status: String,
    id: Option<String>,
    message: Option<String>,
    details: Option<ExpoTicketDetails>,
}

#[derive(Debug, Deserialize)]
struct ExpoTicketDetails {
    error: Option<String>,
}

/// Expo push HTTP API provider.
#[derive(Clone)]
pub struct ExpoPushProvider {
    endpoint: String,
    access_token: Option<String>,
    http_client: reqwest::Client,
}

impl ExpoPushProvider {
    /// Create a new Expo provider.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            access_token,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushProvider for ExpoPushProvider {
    async fn send(&self, messages: Vec<PushMessage>) -> AppResult<Vec<PushTicket>> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.http_client.post(&self.endpoint).json(&messages);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::PushDelivery(format!("Push request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AppError::PushDelivery(format!(
                "Push provider returned {}",
                response.status()
            )));
        }

        let body: ExpoSendResponse = response
            .json()
            .await
            .map_err(|e| AppError::PushDelivery(format!("Invalid provider response: {e}")))?;

        // Tickets come back in request order.
        let tickets = messages
            .iter()
            .zip(body.data)
            .map(|(message, ticket)| {
                if ticket.status == "ok" {
                    PushTicket::ok(&message.to, ticket.id.unwrap_or_default())
                } else {
                    let code = ticket
                        .details
                        .and_then(|d| d.error)
                        .map_or(PushErrorCode::Unknown, |e| {
                            PushErrorCode::from_provider(&e)
                        });
                    PushTicket::error(
                        &message.to,
                        ticket.message.unwrap_or_else(|| "unknown error".to_string()),
                        code,
                    )
                }
            })
            .collect();

        Ok(tickets)
    }
}

/// Is this a structurally valid device token?
#[must_use]
pub fn is_valid_token_format(token: &str) -> bool {
    (token.starts_with("ExponentPushToken[") || token.starts_with("ExpoPushToken["))
        && token.ends_with(']')
        && token.len() > "ExpoPushToken[]".len()
}

fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Is `now` inside the quiet-hours window `[start, end)`?
///
/// A window with `start > end` spans midnight.
#[must_use]
pub fn in_quiet_hours(now: NaiveTime, start: &str, end: &str) -> bool {
    let (Some(start), Some(end)) = (parse_hhmm(start), parse_hhmm(end)) else {
        return false;
    };

    if start <= end {
        now >= start && now < end
    } else {
        now >= start || now < end
    }
}

/// Partial notification-preferences update; `None` fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub push_enabled: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
}

/// Push dispatch service.
#[derive(Clone)]
pub struct PushService {
    token_repo: PushTokenRepository,
    preference_repo: NotificationPreferenceRepository,
    provider: Arc<dyn PushProvider>,
}

impl PushService {
    /// Create a new push service.
    #[must_use]
    pub fn new(
        token_repo: PushTokenRepository,
        preference_repo: NotificationPreferenceRepository,
        provider: Arc<dyn PushProvider>,
    ) -> Self {
        Self {
            token_repo,
            preference_repo,
            provider,
        }
    }

    /// Send a payload to every active device of a user.
    ///
    /// Returns an empty ticket list (not an error) when the user has push
    /// disabled, is inside quiet hours, or has no usable tokens.
    pub async fn send_to_user(
        &self,
        user_id: &str,
        payload: &PushPayload,
    ) -> AppResult<Vec<PushTicket>> {
        let prefs = self.preference_repo.get_or_default(user_id).await?;

        if !prefs.push_enabled {
            tracing::debug!(user_id = %user_id, "Push disabled, skipping send");
            return Ok(Vec::new());
        }

        if prefs.quiet_hours_enabled
            && in_quiet_hours(
                Local::now().time(),
                &prefs.quiet_hours_start,
                &prefs.quiet_hours_end,
            )
        {
            tracing::debug!(user_id = %user_id, "Inside quiet hours, skipping send");
            return Ok(Vec::new());
        }

        let tokens = self.token_repo.find_active_by_user(user_id).await?;

        let mut valid = Vec::new();
        for token in tokens {
            if is_valid_token_format(&token.token) {
                valid.push(token);
            } else {
                tracing::warn!(
                    token_id = %token.id,
                    "Invalid push token format, deactivating"
                );
                if let Err(e) = self.token_repo.deactivate(&token.id).await {
                    tracing::warn!(error = %e, "Failed to deactivate invalid token");
                }
            }
        }

        if valid.is_empty() {
            return Ok(Vec::new());
        }

        let messages = valid
            .iter()
            .map(|t| PushMessage::for_token(&t.token, payload))
            .collect();

        let tickets = self.provider.send(messages).await?;

        // Reconcile tickets back into token state. Partial per-device failure
        // is expected; only a permanently unregistered device loses its token.
        for (token, ticket) in valid.iter().zip(&tickets) {
            match ticket.status {
                TicketStatus::Ok => {
                    if let Err(e) = self.token_repo.touch_last_used(&token.id).await {
                        tracing::warn!(error = %e, "Failed to stamp token last_used_at");
                    }
                }
                TicketStatus::Error => {
                    if ticket.error_code == Some(PushErrorCode::DeviceNotRegistered) {
                        tracing::info!(token_id = %token.id, "Device unregistered, deactivating token");
                        if let Err(e) = self.token_repo.deactivate(&token.id).await {
                            tracing::warn!(error = %e, "Failed to deactivate token");
                        }
                    } else {
                        tracing::warn!(
                            token_id = %token.id,
                            error = ?ticket.message,
                            "Push delivery failed"
                        );
                    }
                }
            }
        }

        Ok(tickets)
    }

    /// Register a device token for a user.
    ///
    /// The token string is first removed from every other user, so a device
    /// handed to another account never double-delivers.
    pub async fn register_token(
        &self,
        user_id: &str,
        token: &str,
        platform: &str,
        device_name: Option<String>,
        device_id: Option<String>,
    ) -> AppResult<push_token::Model> {
        if !is_valid_token_format(token) {
            return Err(AppError::Validation(
                "Invalid push token format".to_string(),
            ));
        }

        self.token_repo.delete_for_other_users(token, user_id).await?;

        if let Some(existing) = self.token_repo.find_by_user_and_token(user_id, token).await? {
            return self
                .token_repo
                .reactivate(existing, platform, device_name, device_id)
                .await;
        }

        let now = Utc::now();
        let model = push_token::ActiveModel {
            id: Set(crate::generate_id()),
            user_id: Set(user_id.to_string()),
            token: Set(token.to_string()),
            platform: Set(platform.to_string()),
            device_name: Set(device_name),
            device_id: Set(device_id),
            active: Set(true),
            last_used_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(None),
        };
        self.token_repo.create(model).await
    }

    /// Unregister one token, or every token of the user when `token` is None.
    pub async fn unregister_token(&self, user_id: &str, token: Option<&str>) -> AppResult<u64> {
        match token {
            Some(token) => {
                let removed = self
                    .token_repo
                    .delete_by_user_and_token(user_id, token)
                    .await?;
                if removed == 0 {
                    return Err(AppError::NotFound("Push token not found".to_string()));
                }
                Ok(removed)
            }
            None => self.token_repo.delete_by_user(user_id).await,
        }
    }

    /// Get the user's notification preferences (defaults when unset).
    pub async fn get_preferences(
        &self,
        user_id: &str,
    ) -> AppResult<notification_preference::Model> {
        self.preference_repo.get_or_default(user_id).await
    }

    /// Update the user's notification preferences.
    pub async fn update_preferences(
        &self,
        user_id: &str,
        update: PreferencesUpdate,
    ) -> AppResult<notification_preference::Model> {
        for value in [&update.quiet_hours_start, &update.quiet_hours_end]
            .into_iter()
            .flatten()
        {
            if parse_hhmm(value).is_none() {
                return Err(AppError::Validation(format!(
                    "Invalid quiet hours time: {value} (expected HH:MM)"
                )));
            }
        }

        self.preference_repo
            .upsert(
                user_id,
                update.push_enabled,
                update.quiet_hours_enabled,
                update.quiet_hours_start,
                update.quiet_hours_end,
            )
            .await
    }
}
