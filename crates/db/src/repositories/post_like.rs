//! Post like repository.

use std::sync::Arc;

use crate::entities::{PostLike, post_like};
use fitfeed_common::{AppError, AppResult};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

/// Repository for post like rows.
#[derive(Clone)]
pub struct PostLikeRepository {
    db: Arc<DatabaseConnection>,
}

impl PostLikeRepository {
    /// Create a new post like repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a like by (post, user) pair.
    pub async fn find_by_pair(
        &self,
        post_id: &str,
        user_id: &str,
    ) -> AppResult<Option<post_like::Model>> {
        PostLike::find()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Has this user liked this post?
    pub async fn has_liked(&self, post_id: &str, user_id: &str) -> AppResult<bool> {
        Ok(self.find_by_pair(post_id, user_id).await?.is_some())
    }

    /// Create a like row.
    pub async fn create(&self, model: post_like::ActiveModel) -> AppResult<post_like::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete the like for a (post, user) pair. Returns the number removed.
    pub async fn delete_by_pair(&self, post_id: &str, user_id: &str) -> AppResult<u64> {
        let result = PostLike::delete_many()
            .filter(post_like::Column::PostId.eq(post_id))
            .filter(post_like::Column::UserId.eq(user_id))
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
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_like(id: &str, post_id: &str, user_id: &str) -> post_like::Model {
        post_like::Model {
            id: id.to_string(),
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_has_liked_true() {
        let like = create_test_like("l1", "post1", "user1");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[like]])
                .into_connection(),
        );

        let repo = PostLikeRepository::new(db);
        assert!(repo.has_liked("post1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_has_liked_false() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<post_like::Model>::new()])
                .into_connection(),
        );

        let repo = PostLikeRepository::new(db);
        assert!(!repo.has_liked("post1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_by_pair() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = PostLikeRepository::new(db);
        let removed = repo.delete_by_pair("post1", "user1").await.unwrap();

        assert_eq!(removed, 1);
    }
}
