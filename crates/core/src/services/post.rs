//! Workout post interactions: likes, comments, replies.

use chrono::Utc;
use fitfeed_db::entities::{
    comment, notification::NotificationKind, post, post_like, user,
};
use fitfeed_db::repositories::{
    CommentRepository, NotificationFilter, PostLikeRepository, PostRepository,
};
use sea_orm::Set;

use fitfeed_common::{AppError, AppResult};

use super::notification::NotificationService;

/// Post interaction service.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    post_like_repo: PostLikeRepository,
    comment_repo: CommentRepository,
    notification_service: NotificationService,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        post_like_repo: PostLikeRepository,
        comment_repo: CommentRepository,
        notification_service: NotificationService,
    ) -> Self {
        Self {
            post_repo,
            post_like_repo,
            comment_repo,
            notification_service,
        }
    }

    /// Get a post by ID.
    pub async fn get(&self, post_id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(post_id).await
    }

    /// Like a post.
    ///
    /// Conflict when already liked. Notifies the post author.
    pub async fn like(&self, actor: &user::Model, post_id: &str) -> AppResult<post_like::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;

        if self.post_like_repo.has_liked(post_id, &actor.id).await? {
            return Err(AppError::Conflict("Post already liked".to_string()));
        }

        let like = self
            .post_like_repo
            .create(post_like::ActiveModel {
                id: Set(crate::generate_id()),
                post_id: Set(post_id.to_string()),
                user_id: Set(actor.id.clone()),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        self.post_repo.adjust_like_count(post_id, 1).await?;

        self.notification_service
            .notify_like(actor, &post.user_id, post_id)
            .await;

        Ok(like)
    }

    /// Remove a like from a post.
    ///
    /// NotFound when the user never liked the post. Retracts the like
    /// notification.
    pub async fn unlike(&self, actor_id: &str, post_id: &str) -> AppResult<()> {
        let removed = self.post_like_repo.delete_by_pair(post_id, actor_id).await?;
        if removed == 0 {
            return Err(AppError::NotFound("Like not found".to_string()));
        }
        self.post_repo.adjust_like_count(post_id, -1).await?;

        self.retract(NotificationFilter {
            actor_id: actor_id.to_string(),
            kind: NotificationKind::Like,
            recipient_id: None,
            post_id: Some(post_id.to_string()),
            comment_id: None,
        })
        .await;

        Ok(())
    }

    /// Comment on a post, or reply when `parent_comment_id` is set.
    ///
    /// Notifies the post author (comment) or the parent-comment author
    /// (reply).
    pub async fn comment(
        &self,
        actor: &user::Model,
        post_id: &str,
        content: &str,
        parent_comment_id: Option<String>,
    ) -> AppResult<comment::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;

        let parent = match &parent_comment_id {
            Some(parent_id) => {
                let parent = self.comment_repo.get_by_id(parent_id).await?;
                if parent.post_id != post_id {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to another post".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let created = self
            .comment_repo
            .create(comment::ActiveModel {
                id: Set(crate::generate_id()),
                post_id: Set(post_id.to_string()),
                user_id: Set(actor.id.clone()),
                parent_comment_id: Set(parent_comment_id),
                content: Set(content.to_string()),
                created_at: Set(Utc::now().into()),
            })
            .await?;
        self.post_repo.adjust_comment_count(post_id, 1).await?;

        match parent {
            Some(parent) => {
                self.notification_service
                    .notify_reply(actor, &parent.user_id, post_id, &created.id)
                    .await;
            }
            None => {
                self.notification_service
                    .notify_comment(actor, &post.user_id, post_id, &created.id)
                    .await;
            }
        }

        Ok(created)
    }

    /// Delete a comment (owner only) and retract its notification.
    pub async fn delete_comment(&self, actor_id: &str, comment_id: &str) -> AppResult<()> {
        let comment = self.comment_repo.get_by_id(comment_id).await?;

        if comment.user_id != actor_id {
            return Err(AppError::Forbidden(
                "Comment belongs to another user".to_string(),
            ));
        }

        let kind = if comment.parent_comment_id.is_some() {
            NotificationKind::Reply
        } else {
            NotificationKind::Comment
        };
        let post_id = comment.post_id.clone();

        self.comment_repo.delete(comment).await?;
        self.post_repo.adjust_comment_count(&post_id, -1).await?;

        self.retract(NotificationFilter {
            actor_id: actor_id.to_string(),
            kind,
            recipient_id: None,
            post_id: Some(post_id),
            comment_id: Some(comment_id.to_string()),
        })
        .await;

        Ok(())
    }

    /// Retraction is fire-and-forget: the reversal already succeeded.
    async fn retract(&self, filter: NotificationFilter) {
        if let Err(e) = self.notification_service.retract(&filter).await {
            tracing::warn!(error = %e, "Failed to retract notifications");
        }
    }
}
