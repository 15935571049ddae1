//! Notification repository.

use std::sync::Arc;

use crate::entities::{
    Notification,
    notification::{self, NotificationCategory, NotificationKind},
};
use chrono::Utc;
use fitfeed_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};

/// Filter describing the notifications produced by one domain action.
///
/// Used to retract them when the action is reversed (unlike, unfollow,
/// comment deletion).
#[derive(Debug, Clone)]
pub struct NotificationFilter {
    /// Acting user whose notifications should match.
    pub actor_id: String,
    /// Kind to match.
    pub kind: NotificationKind,
    /// Restrict to one recipient (follow reversal).
    pub recipient_id: Option<String>,
    /// Restrict to a post, if the action referenced one.
    pub post_id: Option<String>,
    /// Restrict to a comment, if the action referenced one.
    pub comment_id: Option<String>,
}

/// Notification repository for database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationRepository {
    /// Create a new notification repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a notification by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<notification::Model>> {
        Notification::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new notification.
    pub async fn create(&self, model: notification::ActiveModel) -> AppResult<notification::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get notifications for a user, newest first, cursored by `created_at`.
    pub async fn find_by_recipient(
        &self,
        user_id: &str,
        limit: u64,
        before: Option<chrono::DateTime<chrono::FixedOffset>>,
        category: Option<NotificationCategory>,
    ) -> AppResult<Vec<notification::Model>> {
        let mut query = Notification::find()
            .filter(notification::Column::RecipientId.eq(user_id))
            .order_by_desc(notification::Column::CreatedAt)
            .order_by_desc(notification::Column::Id);

        if let Some(cursor) = before {
            query = query.filter(notification::Column::CreatedAt.lt(cursor));
        }

        if let Some(category) = category {
            query = query.filter(notification::Column::Category.eq(category));
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Mark a notification as read, stamping the read timestamp.
    pub async fn mark_as_read(&self, id: &str) -> AppResult<()> {
        let notification = self.find_by_id(id).await?;
        if let Some(n) = notification {
            let mut active: notification::ActiveModel = n.into();
            active.is_read = Set(true);
            active.read_at = Set(Some(Utc::now().into()));
            active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Mark all unread notifications as read for a user in one update.
    pub async fn mark_all_as_read(&self, user_id: &str) -> AppResult<u64> {
        use sea_orm::UpdateResult;

        let result: UpdateResult = Notification::update_many()
            .filter(notification::Column::RecipientId.eq(user_id))
            .filter(notification::Column::IsRead.eq(false))
            .col_expr(notification::Column::IsRead, true.into())
            .col_expr(notification::Column::ReadAt, Expr::value(Utc::now()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected)
    }

    /// Stamp a notification as delivered via push.
    pub async fn mark_push_sent(&self, id: &str) -> AppResult<()> {
        let notification = self.find_by_id(id).await?;
        if let Some(n) = notification {
            let mut active: notification::ActiveModel = n.into();
            active.push_sent = Set(true);
            active.push_sent_at = Set(Some(Utc::now().into()));
            active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }
        Ok(())
    }

    /// Find notifications matching a reversal filter.
    pub async fn find_matching(
        &self,
        filter: &NotificationFilter,
    ) -> AppResult<Vec<notification::Model>> {
        self.matching_query(filter)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete all notifications matching a reversal filter.
    ///
    /// Independent of [`Self::find_matching`]: callers that need to know
    /// which rows were unread must read first, then delete.
    pub async fn delete_matching(&self, filter: &NotificationFilter) -> AppResult<u64> {
        let mut delete = Notification::delete_many()
            .filter(notification::Column::ActorId.eq(filter.actor_id.as_str()))
            .filter(notification::Column::Kind.eq(filter.kind));
        if let Some(recipient_id) = &filter.recipient_id {
            delete = delete.filter(notification::Column::RecipientId.eq(recipient_id));
        }
        if let Some(post_id) = &filter.post_id {
            delete = delete.filter(notification::Column::PostId.eq(post_id));
        }
        if let Some(comment_id) = &filter.comment_id {
            delete = delete.filter(notification::Column::CommentId.eq(comment_id));
        }

        let result = delete
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    fn matching_query(&self, filter: &NotificationFilter) -> sea_orm::Select<Notification> {
        let mut query = Notification::find()
            .filter(notification::Column::ActorId.eq(filter.actor_id.as_str()))
            .filter(notification::Column::Kind.eq(filter.kind));
        if let Some(recipient_id) = &filter.recipient_id {
            query = query.filter(notification::Column::RecipientId.eq(recipient_id));
        }
        if let Some(post_id) = &filter.post_id {
            query = query.filter(notification::Column::PostId.eq(post_id));
        }
        if let Some(comment_id) = &filter.comment_id {
            query = query.filter(notification::Column::CommentId.eq(comment_id));
        }
        query
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::entities::notification::NotificationCategory;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_notification(id: &str, recipient: &str, is_read: bool) -> notification::Model {
        notification::Model {
            id: id.to_string(),
            recipient_id: recipient.to_string(),
            actor_id: Some("actor1".to_string()),
            kind: NotificationKind::Like,
            post_id: Some("post1".to_string()),
            comment_id: None,
            data: None,
            is_read,
            read_at: None,
            push_sent: false,
            push_sent_at: None,
            category: NotificationCategory::Social,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_id_found() {
        let n = create_test_notification("n1", "user1", false);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n.clone()]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo.find_by_id("n1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().recipient_id, "user1");
    }

    #[tokio::test]
    async fn test_find_by_recipient() {
        let n1 = create_test_notification("n1", "user1", false);
        let n2 = create_test_notification("n2", "user1", true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[n1, n2]])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let result = repo
            .find_by_recipient("user1", 20, None, None)
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_matching() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 2,
                }])
                .into_connection(),
        );

        let repo = NotificationRepository::new(db);
        let filter = NotificationFilter {
            actor_id: "actor1".to_string(),
            kind: NotificationKind::Like,
            recipient_id: None,
            post_id: Some("post1".to_string()),
            comment_id: None,
        };
        let deleted = repo.delete_matching(&filter).await.unwrap();

        assert_eq!(deleted, 2);
    }
}
