//! Notification pipeline.
//!
//! Creates notification rows with self-action suppression, keeps the
//! recipient's denormalized unread counter in step, synthesizes push payloads
//! per kind, and retracts notifications when the triggering action is
//! reversed.

use chrono::{DateTime, FixedOffset, Utc};
use fitfeed_db::entities::{
    notification::{self, NotificationCategory, NotificationKind},
    user,
};
use fitfeed_db::repositories::{NotificationFilter, NotificationRepository, UserRepository};
use sea_orm::Set;

use fitfeed_common::{AppError, AppResult};

use super::push::{PushPayload, PushService};

/// Notification creation and read-state service.
#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    user_repo: UserRepository,
    /// Absent in contexts that never dispatch (tests, offline tooling).
    push_service: Option<PushService>,
}

/// Everything needed to create one notification.
struct NotificationInput<'a> {
    recipient_id: &'a str,
    actor: Option<&'a user::Model>,
    kind: NotificationKind,
    post_id: Option<String>,
    comment_id: Option<String>,
    data: Option<serde_json::Value>,
}

impl NotificationService {
    /// Create a new notification service.
    #[must_use]
    pub const fn new(
        notification_repo: NotificationRepository,
        user_repo: UserRepository,
        push_service: Option<PushService>,
    ) -> Self {
        Self {
            notification_repo,
            user_repo,
            push_service,
        }
    }

    /// Notify a post author that someone liked their post.
    pub async fn notify_like(
        &self,
        actor: &user::Model,
        post_author_id: &str,
        post_id: &str,
    ) -> Option<notification::Model> {
        self.notify(NotificationInput {
            recipient_id: post_author_id,
            actor: Some(actor),
            kind: NotificationKind::Like,
            post_id: Some(post_id.to_string()),
            comment_id: None,
            data: None,
        })
        .await
    }

    /// Notify a post author that someone commented on their post.
    pub async fn notify_comment(
        &self,
        actor: &user::Model,
        post_author_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Option<notification::Model> {
        self.notify(NotificationInput {
            recipient_id: post_author_id,
            actor: Some(actor),
            kind: NotificationKind::Comment,
            post_id: Some(post_id.to_string()),
            comment_id: Some(comment_id.to_string()),
            data: None,
        })
        .await
    }

    /// Notify a comment author that someone replied to their comment.
    pub async fn notify_reply(
        &self,
        actor: &user::Model,
        parent_author_id: &str,
        post_id: &str,
        comment_id: &str,
    ) -> Option<notification::Model> {
        self.notify(NotificationInput {
            recipient_id: parent_author_id,
            actor: Some(actor),
            kind: NotificationKind::Reply,
            post_id: Some(post_id.to_string()),
            comment_id: Some(comment_id.to_string()),
            data: None,
        })
        .await
    }

    /// Notify a user that someone started following them.
    pub async fn notify_follow(
        &self,
        actor: &user::Model,
        followee_id: &str,
    ) -> Option<notification::Model> {
        self.notify(NotificationInput {
            recipient_id: followee_id,
            actor: Some(actor),
            kind: NotificationKind::Follow,
            post_id: None,
            comment_id: None,
            data: None,
        })
        .await
    }

    /// Create a system-generated notification (no actor).
    ///
    /// Used for workout milestones, reminders, and reports. `data` supplies
    /// the per-kind interpolation fields.
    pub async fn notify_system(
        &self,
        recipient_id: &str,
        kind: NotificationKind,
        data: Option<serde_json::Value>,
    ) -> Option<notification::Model> {
        self.notify(NotificationInput {
            recipient_id,
            actor: None,
            kind,
            post_id: None,
            comment_id: None,
            data,
        })
        .await
    }

    /// Best-effort notification creation.
    ///
    /// Suppresses self-actions and swallows every failure: the caller's domain
    /// action must succeed whether or not the notification lands.
    async fn notify(&self, input: NotificationInput<'_>) -> Option<notification::Model> {
        if let Some(actor) = input.actor
            && actor.id == input.recipient_id
        {
            return None;
        }

        match self.create(input).await {
            Ok(model) => Some(model),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create notification");
                None
            }
        }
    }

    async fn create(&self, input: NotificationInput<'_>) -> AppResult<notification::Model> {
        let now = Utc::now();
        let model = notification::ActiveModel {
            id: Set(crate::generate_id()),
            recipient_id: Set(input.recipient_id.to_string()),
            actor_id: Set(input.actor.map(|a| a.id.clone())),
            kind: Set(input.kind),
            post_id: Set(input.post_id.clone()),
            comment_id: Set(input.comment_id.clone()),
            data: Set(input.data.clone()),
            is_read: Set(false),
            read_at: Set(None),
            push_sent: Set(false),
            push_sent_at: Set(None),
            category: Set(input.kind.category()),
            created_at: Set(now.into()),
        };

        let created = self.notification_repo.create(model).await?;
        self.user_repo
            .increment_unread_notifications(input.recipient_id)
            .await?;

        if let Some(push_service) = &self.push_service {
            let payload = build_payload(&created, input.actor);
            match push_service.send_to_user(input.recipient_id, &payload).await {
                Ok(tickets) => {
                    if tickets.iter().any(super::push::PushTicket::is_ok) {
                        self.notification_repo.mark_push_sent(&created.id).await?;
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        notification_id = %created.id,
                        error = %e,
                        "Push dispatch failed"
                    );
                }
            }
        }

        Ok(created)
    }

    /// Retract the notifications produced by a now-reversed action.
    ///
    /// Decrements the recipient counter once per unread row, then deletes all
    /// matching rows. Returns the number of rows deleted.
    pub async fn retract(&self, filter: &NotificationFilter) -> AppResult<u64> {
        let matching = self.notification_repo.find_matching(filter).await?;
        for row in matching.iter().filter(|n| !n.is_read) {
            self.user_repo
                .decrement_unread_notifications(&row.recipient_id)
                .await?;
        }
        self.notification_repo.delete_matching(filter).await
    }

    /// List notifications for a user, newest first.
    pub async fn list(
        &self,
        user_id: &str,
        limit: u64,
        before: Option<DateTime<FixedOffset>>,
        category: Option<NotificationCategory>,
    ) -> AppResult<Vec<notification::Model>> {
        self.notification_repo
            .find_by_recipient(user_id, limit, before, category)
            .await
    }

    /// The user's unread badge count (denormalized counter on the user row).
    pub async fn unread_count(&self, user_id: &str) -> AppResult<i32> {
        let user = self.user_repo.get_by_id(user_id).await?;
        Ok(user.unread_notifications_count)
    }

    /// Mark one notification as read.
    ///
    /// No-op if already read. Fails with 404 when missing and 403 when the
    /// notification belongs to another user.
    pub async fn mark_as_read(&self, user_id: &str, notification_id: &str) -> AppResult<()> {
        let notification = self
            .notification_repo
            .find_by_id(notification_id)
            .await?
            .ok_or_else(|| AppError::NotificationNotFound(notification_id.to_string()))?;

        if notification.recipient_id != user_id {
            return Err(AppError::Forbidden(
                "Notification belongs to another user".to_string(),
            ));
        }

        if notification.is_read {
            return Ok(());
        }

        self.notification_repo.mark_as_read(notification_id).await?;
        self.user_repo.decrement_unread_notifications(user_id).await
    }

    /// Mark all notifications as read and reset the badge counter to zero.
    ///
    /// Returns the number of rows flipped. The counter reset is absolute, so
    /// this also heals any accumulated drift.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        let flipped = self.notification_repo.mark_all_as_read(user_id).await?;
        self.user_repo.reset_unread_notifications(user_id).await?;
        Ok(flipped)
    }
}

fn actor_label(actor: Option<&user::Model>) -> String {
    match actor {
        Some(a) if !a.username.is_empty() => a.username.clone(),
        Some(a) => a
            .name
            .clone()
            .unwrap_or_else(|| "Someone".to_string()),
        None => "Someone".to_string(),
    }
}

fn data_i64(data: Option<&serde_json::Value>, key: &str) -> Option<i64> {
    data.and_then(|d| d.get(key)).and_then(serde_json::Value::as_i64)
}

/// Build the push payload for a notification.
fn build_payload(n: &notification::Model, actor: Option<&user::Model>) -> PushPayload {
    let label = actor_label(actor);
    let data = n.data.as_ref();

    let (title, body) = match n.kind {
        NotificationKind::Like => (
            "New Like".to_string(),
            format!("{label} liked your workout post"),
        ),
        NotificationKind::Comment => (
            "New Comment".to_string(),
            format!("{label} commented on your workout post"),
        ),
        NotificationKind::Reply => (
            "New Reply".to_string(),
            format!("{label} replied to your comment"),
        ),
        NotificationKind::Follow => (
            "New Follower".to_string(),
            format!("{label} started following you"),
        ),
        NotificationKind::WorkoutCompleted => {
            let duration = data_i64(data, "duration_minutes").unwrap_or(0);
            let calories = data_i64(data, "calories").unwrap_or(0);
            (
                "Amazing work!".to_string(),
                format!("You completed a {duration} min workout and burned {calories} calories"),
            )
        }
        NotificationKind::WeeklyGoalAchieved => {
            let completed = data_i64(data, "completed").unwrap_or(0);
            let goal = data_i64(data, "goal").unwrap_or(0);
            (
                "Weekly Goal Crushed!".to_string(),
                format!("You hit {completed} of {goal} workouts this week"),
            )
        }
        NotificationKind::InactiveAlert => {
            let days = data_i64(data, "days").unwrap_or(0);
            (
                "We miss you!".to_string(),
                format!("It's been {days} days since your last workout"),
            )
        }
        NotificationKind::WorkoutReminder => (
            "Workout Reminder".to_string(),
            "Time to get moving".to_string(),
        ),
        NotificationKind::MonthlyMilestone => (
            "Monthly Milestone!".to_string(),
            "You set a new personal record this month".to_string(),
        ),
        NotificationKind::PlanGenerated => (
            "Your Plan Is Ready".to_string(),
            "Your new workout plan has been generated".to_string(),
        ),
        NotificationKind::WeeklyReport => (
            "Weekly Report".to_string(),
            "Your weekly training summary is ready".to_string(),
        ),
        NotificationKind::RecoveryReminder => (
            "Recovery Day".to_string(),
            "Take it easy today, your body earned it".to_string(),
        ),
    };

    let mut payload_data = serde_json::json!({
        "kind": n.kind.as_str(),
        "notification_id": n.id,
    });
    if let Some(post_id) = &n.post_id {
        payload_data["post_id"] = serde_json::Value::String(post_id.clone());
    }
    if let Some(comment_id) = &n.comment_id {
        payload_data["comment_id"] = serde_json::Value::String(comment_id.clone());
    }

    PushPayload {
        title,
        body,
        data: payload_data,
        channel_id: n.kind.category().as_str().to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::push::{PushErrorCode, PushMessage, PushProvider, PushTicket};
    use async_trait::async_trait;
    use fitfeed_db::entities::{notification_preference, push_token};
    use fitfeed_db::repositories::{NotificationPreferenceRepository, PushTokenRepository};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::{Arc, Mutex};

    /// Provider double that replies from a script.
    struct ScriptedProvider {
        responses: Mutex<Vec<Vec<PushTicket>>>,
    }

    #[async_trait]
    impl PushProvider for ScriptedProvider {
        async fn send(&self, _messages: Vec<PushMessage>) -> AppResult<Vec<PushTicket>> {
            Ok(self.responses.lock().unwrap().remove(0))
        }
    }

    fn test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            token: None,
            name: None,
            avatar_url: None,
            followers_count: 0,
            following_count: 0,
            posts_count: 0,
            unread_notifications_count: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn test_notification(id: &str, recipient: &str, kind: NotificationKind) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient.to_string(),
            actor_id: Some("actor1".to_string()),
            kind,
            post_id: Some("post1".to_string()),
            comment_id: None,
            data: None,
            is_read: false,
            read_at: None,
            push_sent: false,
            push_sent_at: None,
            category: kind.category(),
            created_at: Utc::now().into(),
        }
    }

    fn service_over(db: Arc<sea_orm::DatabaseConnection>) -> NotificationService {
        NotificationService::new(
            NotificationRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
            None,
        )
    }

    fn service_with_push(
        db: Arc<sea_orm::DatabaseConnection>,
        responses: Vec<Vec<PushTicket>>,
    ) -> NotificationService {
        let provider = Arc::new(ScriptedProvider {
            responses: Mutex::new(responses),
        });
        let push = PushService::new(
            PushTokenRepository::new(Arc::clone(&db)),
            NotificationPreferenceRepository::new(Arc::clone(&db)),
            provider,
        );
        NotificationService::new(
            NotificationRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
            Some(push),
        )
    }

    fn test_push_token(id: &str, user_id: &str) -> push_token::Model {
        push_token::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            token: "ExponentPushToken[abc]".to_string(),
            platform: "ios".to_string(),
            device_name: None,
            device_id: None,
            active: true,
            last_used_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_self_action_is_suppressed() {
        // No query results appended: any DB access would fail the test.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service_over(db);

        let actor = test_user("user1", "alice");
        let result = service.notify_like(&actor, "user1", "post1").await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_notify_like_creates_row_and_increments_counter() {
        let created = test_notification("n1", "user2", NotificationKind::Like);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[created]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = service_over(db);

        let actor = test_user("user1", "alice");
        let result = service.notify_like(&actor, "user2", "post1").await;

        assert!(result.is_some());
        assert_eq!(result.unwrap().kind, NotificationKind::Like);
    }

    #[tokio::test]
    async fn test_delivered_push_stamps_notification() {
        let created = test_notification("n1", "user2", NotificationKind::Like);
        let mut stamped = created.clone();
        stamped.push_sent = true;
        let token = test_push_token("t1", "user2");

        // Insert, preference lookup (absent, defaults apply), active tokens,
        // last-used stamp (lookup + update), push-sent stamp (lookup + update).
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![created.clone()]])
                .append_query_results([Vec::<notification_preference::Model>::new()])
                .append_query_results([vec![token.clone()]])
                .append_query_results([vec![token.clone()], vec![token]])
                .append_query_results([vec![created], vec![stamped]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = service_with_push(
            Arc::clone(&db),
            vec![vec![PushTicket::ok("ExponentPushToken[abc]", "r1")]],
        );

        let actor = test_user("user1", "alice");
        let result = service.notify_like(&actor, "user2", "post1").await;
        assert!(result.is_some());

        drop(service);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 8);
        let last = format!("{:?}", log.last());
        assert!(last.contains("UPDATE"));
        assert!(last.contains("push_sent"));
    }

    #[tokio::test]
    async fn test_failed_push_leaves_notification_unstamped() {
        let created = test_notification("n1", "user2", NotificationKind::Like);
        let token = test_push_token("t1", "user2");

        // Exactly four statements are scripted: insert, counter increment,
        // preference lookup, token lookup. A push-sent stamp would overrun
        // the mock queue and turn the result into None.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![created]])
                .append_query_results([Vec::<notification_preference::Model>::new()])
                .append_query_results([vec![token]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );
        let service = service_with_push(
            Arc::clone(&db),
            vec![vec![PushTicket::error(
                "ExponentPushToken[abc]",
                "provider rejected the message",
                PushErrorCode::MessageRateExceeded,
            )]],
        );

        let actor = test_user("user1", "alice");
        let result = service.notify_like(&actor, "user2", "post1").await;
        assert!(result.is_some());

        drop(service);
        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn test_notify_swallows_database_failure() {
        // Insert fails (no results appended); the caller still gets None,
        // never an error.
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service_over(db);

        let actor = test_user("user1", "alice");
        let result = service.notify_like(&actor, "user2", "post1").await;

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_mark_as_read_missing_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification::Model>::new()])
                .into_connection(),
        );
        let service = service_over(db);

        let result = service.mark_as_read("user1", "missing").await;

        assert!(matches!(result, Err(AppError::NotificationNotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_as_read_foreign_is_forbidden() {
        let n = test_notification("n1", "user2", NotificationKind::Like);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n]])
                .into_connection(),
        );
        let service = service_over(db);

        let result = service.mark_as_read("user1", "n1").await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_mark_as_read_already_read_is_noop() {
        let mut n = test_notification("n1", "user1", NotificationKind::Like);
        n.is_read = true;

        // Only the lookup is scripted: an update or counter decrement would
        // hit an empty mock queue and fail.
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n]])
                .into_connection(),
        );
        let service = service_over(db);

        assert!(service.mark_as_read("user1", "n1").await.is_ok());
    }

    #[tokio::test]
    async fn test_mark_all_as_read_resets_counter() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 4,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );
        let service = service_over(db);

        let flipped = service.mark_all_as_read("user1").await.unwrap();

        assert_eq!(flipped, 4);
    }

    #[tokio::test]
    async fn test_retract_decrements_only_unread() {
        let unread = test_notification("n1", "user2", NotificationKind::Like);
        let mut read = test_notification("n2", "user3", NotificationKind::Like);
        read.is_read = true;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[unread, read]])
                // One decrement (for the unread row), then the delete.
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 2,
                    },
                ])
                .into_connection(),
        );
        let service = service_over(db);

        let filter = NotificationFilter {
            actor_id: "actor1".to_string(),
            kind: NotificationKind::Like,
            recipient_id: None,
            post_id: Some("post1".to_string()),
            comment_id: None,
        };
        let deleted = service.retract(&filter).await.unwrap();

        assert_eq!(deleted, 2);
    }

    #[tokio::test]
    async fn test_unread_count_reads_user_counter() {
        let mut u = test_user("user1", "alice");
        u.unread_notifications_count = 7;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[u]])
                .into_connection(),
        );
        let service = service_over(db);

        assert_eq!(service.unread_count("user1").await.unwrap(), 7);
    }

    #[test]
    fn test_like_payload() {
        let n = test_notification("n1", "user2", NotificationKind::Like);
        let actor = test_user("user1", "alice");

        let payload = build_payload(&n, Some(&actor));

        assert_eq!(payload.title, "New Like");
        assert_eq!(payload.body, "alice liked your workout post");
        assert_eq!(payload.channel_id, "social");
        assert_eq!(payload.data["post_id"], "post1");
    }

    #[test]
    fn test_workout_completed_payload_interpolates_data() {
        let mut n = test_notification("n1", "user1", NotificationKind::WorkoutCompleted);
        n.actor_id = None;
        n.post_id = None;
        n.data = Some(serde_json::json!({"duration_minutes": 45, "calories": 320}));

        let payload = build_payload(&n, None);

        assert_eq!(payload.title, "Amazing work!");
        assert_eq!(
            payload.body,
            "You completed a 45 min workout and burned 320 calories"
        );
        assert_eq!(payload.channel_id, "workout");
    }

    #[test]
    fn test_actor_label_fallbacks() {
        let mut anon = test_user("user1", "");
        assert_eq!(actor_label(Some(&anon)), "Someone");
        anon.name = Some("Alice B".to_string());
        assert_eq!(actor_label(Some(&anon)), "Alice B");
        assert_eq!(actor_label(None), "Someone");
    }
}
