//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use fitfeed_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a user by ID or return an error.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::UserNotFound(id.to_string()))
    }

    /// Find a user by access token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically increment the unread notifications counter.
    pub async fn increment_unread_notifications(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::UnreadNotificationsCount,
                Expr::col(user::Column::UnreadNotificationsCount).add(1),
            )
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically decrement the unread notifications counter, never below zero.
    pub async fn decrement_unread_notifications(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(
                user::Column::UnreadNotificationsCount,
                Expr::col(user::Column::UnreadNotificationsCount).sub(1),
            )
            .filter(user::Column::Id.eq(user_id))
            .filter(user::Column::UnreadNotificationsCount.gt(0))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Reset the unread notifications counter to exactly zero.
    pub async fn reset_unread_notifications(&self, user_id: &str) -> AppResult<()> {
        User::update_many()
            .col_expr(user::Column::UnreadNotificationsCount, 0.into())
            .filter(user::Column::Id.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Atomically adjust follower/following counters after a follow change.
    pub async fn adjust_follow_counts(
        &self,
        follower_id: &str,
        followee_id: &str,
        delta: i32,
    ) -> AppResult<()> {
        let following = if delta > 0 {
            Expr::col(user::Column::FollowingCount).add(delta)
        } else {
            Expr::col(user::Column::FollowingCount).sub(-delta)
        };
        let mut update = User::update_many()
            .col_expr(user::Column::FollowingCount, following)
            .filter(user::Column::Id.eq(follower_id));
        if delta < 0 {
            update = update.filter(user::Column::FollowingCount.gt(0));
        }
        update
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let followers = if delta > 0 {
            Expr::col(user::Column::FollowersCount).add(delta)
        } else {
            Expr::col(user::Column::FollowersCount).sub(-delta)
        };
        let mut update = User::update_many()
            .col_expr(user::Column::FollowersCount, followers)
            .filter(user::Column::Id.eq(followee_id));
        if delta < 0 {
            update = update.filter(user::Column::FollowersCount.gt(0));
        }
        update
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            token: Some("test_token".to_string()),
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

    #[tokio::test]
    async fn test_find_by_id_found() {
        let user = create_test_user("user1", "alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_id("user1").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_token() {
        let user = create_test_user("user1", "alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.find_by_token("test_token").await.unwrap();

        assert!(result.is_some());
        assert_eq!(result.unwrap().id, "user1");
    }

    #[tokio::test]
    async fn test_increment_unread_notifications() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.increment_unread_notifications("user1").await.is_ok());
    }

    #[tokio::test]
    async fn test_reset_unread_notifications() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.reset_unread_notifications("user1").await.is_ok());
    }
}
