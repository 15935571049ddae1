//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use fitfeed_common::{AppError, AppResult};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a post by ID or return an error.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Atomically adjust the like counter by +1 or -1 (never below zero).
    pub async fn adjust_like_count(&self, post_id: &str, delta: i32) -> AppResult<()> {
        self.adjust_counter(post_id, post::Column::LikeCount, delta)
            .await
    }

    /// Atomically adjust the comment counter by +1 or -1 (never below zero).
    pub async fn adjust_comment_count(&self, post_id: &str, delta: i32) -> AppResult<()> {
        self.adjust_counter(post_id, post::Column::CommentCount, delta)
            .await
    }

    async fn adjust_counter(
        &self,
        post_id: &str,
        column: post::Column,
        delta: i32,
    ) -> AppResult<()> {
        let expr = if delta > 0 {
            Expr::col(column).add(delta)
        } else {
            Expr::col(column).sub(-delta)
        };
        let mut update = Post::update_many()
            .col_expr(column, expr)
            .filter(post::Column::Id.eq(post_id));
        if delta < 0 {
            update = update.filter(column.gt(0));
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

    fn create_test_post(id: &str, user_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            user_id: user_id.to_string(),
            content: "Leg day".to_string(),
            duration_minutes: Some(45),
            calories: Some(320),
            like_count: 0,
            comment_count: 0,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_by_id_found() {
        let post = create_test_post("post1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[post.clone()]])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("post1").await.unwrap();

        assert_eq!(result.user_id, "user1");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post::Model>::new()])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        let result = repo.get_by_id("missing").await;

        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_adjust_like_count() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                    MockExecResult {
                        last_insert_id: 0,
                        rows_affected: 1,
                    },
                ])
                .into_connection(),
        );

        let repo = PostRepository::new(db);
        assert!(repo.adjust_like_count("post1", 1).await.is_ok());
        assert!(repo.adjust_like_count("post1", -1).await.is_ok());
    }
}
