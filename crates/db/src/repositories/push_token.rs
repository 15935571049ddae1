//! Push token repository.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::entities::push_token::{ActiveModel, Column, Entity, Model};
use fitfeed_common::{AppError, AppResult};

/// Repository for push token operations.
#[derive(Clone)]
pub struct PushTokenRepository {
    db: Arc<DatabaseConnection>,
}

impl PushTokenRepository {
    /// Create a new push token repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a push token row by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<Model>> {
        Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a push token row by ID or return an error.
    pub async fn get_by_id(&self, id: &str) -> AppResult<Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Push token {id} not found")))
    }

    /// Find a user's row for an exact token string.
    pub async fn find_by_user_and_token(
        &self,
        user_id: &str,
        token: &str,
    ) -> AppResult<Option<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all active tokens for a user (multi-device).
    pub async fn find_active_by_user(&self, user_id: &str) -> AppResult<Vec<Model>> {
        Entity::find()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Active.eq(true))
            .order_by_desc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete this token string from every user except `keep_user_id`.
    ///
    /// A device handed to another account must not keep delivering to the
    /// previous owner.
    pub async fn delete_for_other_users(&self, token: &str, keep_user_id: &str) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::Token.eq(token))
            .filter(Column::UserId.ne(keep_user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Create a new push token row.
    pub async fn create(&self, model: ActiveModel) -> AppResult<Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a push token row.
    pub async fn update(&self, model: ActiveModel) -> AppResult<Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Reactivate an existing row and refresh its device metadata.
    pub async fn reactivate(
        &self,
        existing: Model,
        platform: &str,
        device_name: Option<String>,
        device_id: Option<String>,
    ) -> AppResult<Model> {
        let mut active: ActiveModel = existing.into();
        active.active = Set(true);
        active.platform = Set(platform.to_string());
        active.device_name = Set(device_name);
        active.device_id = Set(device_id);
        active.updated_at = Set(Some(Utc::now().into()));
        self.update(active).await
    }

    /// Mark a token row inactive.
    pub async fn deactivate(&self, id: &str) -> AppResult<Model> {
        let token = self.get_by_id(id).await?;
        let mut active: ActiveModel = token.into();
        active.active = Set(false);
        active.updated_at = Set(Some(Utc::now().into()));
        self.update(active).await
    }

    /// Stamp the last successful delivery through a token.
    pub async fn touch_last_used(&self, id: &str) -> AppResult<Model> {
        let token = self.get_by_id(id).await?;
        let mut active: ActiveModel = token.into();
        active.last_used_at = Set(Some(Utc::now().into()));
        active.updated_at = Set(Some(Utc::now().into()));
        self.update(active).await
    }

    /// Delete all token rows for a user. Returns the number removed.
    pub async fn delete_by_user(&self, user_id: &str) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }

    /// Delete one token row for a user. Returns the number removed.
    pub async fn delete_by_user_and_token(&self, user_id: &str, token: &str) -> AppResult<u64> {
        let result = Entity::delete_many()
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Token.eq(token))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_token(id: &str, user_id: &str, token: &str, active: bool) -> Model {
        Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            token: token.to_string(),
            platform: "ios".to_string(),
            device_name: Some("iPhone".to_string()),
            device_id: None,
            active,
            last_used_at: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_active_by_user() {
        let t1 = create_test_token("t1", "user1", "ExponentPushToken[aaa]", true);
        let t2 = create_test_token("t2", "user1", "ExponentPushToken[bbb]", true);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[t1, t2]])
                .into_connection(),
        );

        let repo = PushTokenRepository::new(db);
        let result = repo.find_active_by_user("user1").await.unwrap();

        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn test_find_by_user_and_token_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<Model>::new()])
                .into_connection(),
        );

        let repo = PushTokenRepository::new(db);
        let result = repo
            .find_by_user_and_token("user1", "ExponentPushToken[aaa]")
            .await
            .unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_for_other_users() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PushTokenRepository::new(db);
        let removed = repo
            .delete_for_other_users("ExponentPushToken[aaa]", "user2")
            .await
            .unwrap();

        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn test_deactivate() {
        let token = create_test_token("t1", "user1", "ExponentPushToken[aaa]", true);
        let mut deactivated = token.clone();
        deactivated.active = false;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[token], [deactivated]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PushTokenRepository::new(db);
        let result = repo.deactivate("t1").await.unwrap();

        assert!(!result.active);
    }
}
