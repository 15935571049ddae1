//! Follow relationships.

use chrono::Utc;
use fitfeed_db::entities::{follow, notification::NotificationKind, user};
use fitfeed_db::repositories::{FollowRepository, NotificationFilter, UserRepository};
use sea_orm::Set;

use fitfeed_common::{AppError, AppResult};

use super::notification::NotificationService;

/// Follow relationship service.
#[derive(Clone)]
pub struct FollowService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    notification_service: NotificationService,
}

impl FollowService {
    /// Create a new follow service.
    #[must_use]
    pub const fn new(
        follow_repo: FollowRepository,
        user_repo: UserRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            follow_repo,
            user_repo,
            notification_service,
        }
    }

    /// Follow a user.
    ///
    /// Rejects self-follow and duplicates. Notifies the followee.
    pub async fn follow(&self, actor: &user::Model, followee_id: &str) -> AppResult<follow::Model> {
        if actor.id == followee_id {
            return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
        }

        self.user_repo.get_by_id(followee_id).await?;

        if self.follow_repo.is_following(&actor.id, followee_id).await? {
            return Err(AppError::Conflict("Already following".to_string()));
        }

        let created = self
            .follow_repo
            .create(follow::ActiveModel {
                id: Set(crate::generate_id()),
                follower_id: Set(actor.id.clone()),
                followee_id: Set(followee_id.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        self.user_repo
            .adjust_follow_counts(&actor.id, followee_id, 1)
            .await?;

        self.notification_service
            .notify_follow(actor, followee_id)
            .await;

        Ok(created)
    }

    /// Unfollow a user.
    ///
    /// NotFound when no relationship exists. Retracts the follow notification
    /// for that followee only.
    pub async fn unfollow(&self, actor_id: &str, followee_id: &str) -> AppResult<()> {
        let removed = self
            .follow_repo
            .delete_by_pair(actor_id, followee_id)
            .await?;
        if removed == 0 {
            return Err(AppError::NotFound("Follow not found".to_string()));
        }
        self.user_repo
            .adjust_follow_counts(actor_id, followee_id, -1)
            .await?;

        let filter = NotificationFilter {
            actor_id: actor_id.to_string(),
            kind: NotificationKind::Follow,
            // Scoped to this followee: the actor's follow notifications to
            // everyone else must survive.
            recipient_id: Some(followee_id.to_string()),
            post_id: None,
            comment_id: None,
        };
        if let Err(e) = self.notification_service.retract(&filter).await {
            tracing::warn!(error = %e, "Failed to retract follow notification");
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use fitfeed_db::repositories::NotificationRepository;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

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

    fn test_follow(follower: &str, followee: &str) -> follow::Model {
        follow::Model {
            id: "f1".to_string(),
            follower_id: follower.to_string(),
            followee_id: followee.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn service_over(db: Arc<sea_orm::DatabaseConnection>) -> FollowService {
        let notification_service = NotificationService::new(
            NotificationRepository::new(Arc::clone(&db)),
            UserRepository::new(Arc::clone(&db)),
            None,
        );
        FollowService::new(
            FollowRepository::new(Arc::clone(&db)),
            UserRepository::new(db),
            notification_service,
        )
    }

    #[tokio::test]
    async fn test_follow_self_is_rejected() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = service_over(db);

        let actor = test_user("user1", "alice");
        let result = service.follow(&actor, "user1").await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_follow_twice_is_conflict() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_user("user2", "bob")]])
                .append_query_results([[test_follow("user1", "user2")]])
                .into_connection(),
        );
        let service = service_over(db);

        let actor = test_user("user1", "alice");
        let result = service.follow(&actor, "user2").await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_follow_missing_user_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = service_over(db);

        let actor = test_user("user1", "alice");
        let result = service.follow(&actor, "ghost").await;

        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_unfollow_without_follow_is_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );
        let service = service_over(db);

        let result = service.unfollow("user1", "user2").await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
