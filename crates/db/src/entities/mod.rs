//! Database entities.

#![allow(missing_docs)]

pub mod comment;
pub mod follow;
pub mod notification;
pub mod notification_preference;
pub mod post;
pub mod post_like;
pub mod push_token;
pub mod user;

pub use comment::Entity as Comment;
pub use follow::Entity as Follow;
pub use notification::Entity as Notification;
pub use notification_preference::Entity as NotificationPreference;
pub use post::Entity as Post;
pub use post_like::Entity as PostLike;
pub use push_token::Entity as PushToken;
pub use user::Entity as User;
