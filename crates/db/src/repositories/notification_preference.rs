//! Notification preference repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::notification_preference::{self, ActiveModel, Entity, Model};
use fitfeed_common::{AppError, AppResult};

/// Repository for per-user notification preferences.
#[derive(Clone)]
pub struct NotificationPreferenceRepository {
    db: Arc<DatabaseConnection>,
}

impl NotificationPreferenceRepository {
    /// Create a new notification preference repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the stored preferences for a user.
    pub async fn find_by_user(&self, user_id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get the preferences for a user, falling back to defaults.
    pub async fn get_or_default(&self, user_id: &str) -> AppResult<Model> {
        Ok(self
            .find_by_user(user_id)
            .await?
            .unwrap_or_else(|| Model::defaults(user_id)))
    }

    /// Insert or update the preferences row for a user.
    pub async fn upsert(
        &self,
        user_id: &str,
        push_enabled: Option<bool>,
        quiet_hours_enabled: Option<bool>,
        quiet_hours_start: Option<String>,
        quiet_hours_end: Option<String>,
    ) -> AppResult<Model> {
        let existing = self.find_by_user(user_id).await?;
        let base = existing
            .clone()
            .unwrap_or_else(|| Model::defaults(user_id));

        let mut active: ActiveModel = base.into();
        if let Some(push_enabled) = push_enabled {
            active.push_enabled = Set(push_enabled);
        }
        if let Some(enabled) = quiet_hours_enabled {
            active.quiet_hours_enabled = Set(enabled);
        }
        if let Some(start) = quiet_hours_start {
            active.quiet_hours_start = Set(start);
        }
        if let Some(end) = quiet_hours_end {
            active.quiet_hours_end = Set(end);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        let result = if existing.is_some() {
            active
                .update(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
        } else {
            active.user_id = Set(user_id.to_string());
            active
                .insert(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
        };
        Ok(result)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_get_or_default_falls_back() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<notification_preference::Model>::new()])
                .into_connection(),
        );

        let repo = NotificationPreferenceRepository::new(db);
        let prefs = repo.get_or_default("user1").await.unwrap();

        assert!(prefs.push_enabled);
        assert!(!prefs.quiet_hours_enabled);
        assert_eq!(prefs.quiet_hours_start, "22:00");
        assert_eq!(prefs.quiet_hours_end, "07:00");
    }

    #[tokio::test]
    async fn test_get_or_default_returns_stored_row() {
        let stored = notification_preference::Model {
            user_id: "user1".to_string(),
            push_enabled: false,
            quiet_hours_enabled: true,
            quiet_hours_start: "21:00".to_string(),
            quiet_hours_end: "06:00".to_string(),
            updated_at: None,
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[stored.clone()]])
                .into_connection(),
        );

        let repo = NotificationPreferenceRepository::new(db);
        let prefs = repo.get_or_default("user1").await.unwrap();

        assert!(!prefs.push_enabled);
        assert!(prefs.quiet_hours_enabled);
        assert_eq!(prefs.quiet_hours_start, "21:00");
    }
}
