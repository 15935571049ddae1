//! User lookup and bearer-token authentication.

use fitfeed_db::entities::user;
use fitfeed_db::repositories::UserRepository;

use fitfeed_common::{AppError, AppResult};

/// User service.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_user(id: &str, token: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: "alice".to_string(),
            username_lower: "alice".to_string(),
            token: Some(token.to_string()),
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
    async fn test_authenticate_valid_token() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("user1", "secret")]])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let user = service.authenticate_by_token("secret").await.unwrap();

        assert_eq!(user.id, "user1");
    }

    #[tokio::test]
    async fn test_authenticate_unknown_token_is_unauthorized() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = UserService::new(UserRepository::new(db));

        let result = service.authenticate_by_token("wrong").await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
