//! Database repositories.
//!
//! One repository per entity family, each holding a shared database handle.

mod comment;
mod follow;
mod notification;
mod notification_preference;
mod post;
mod post_like;
mod push_token;
mod user;

pub use comment::CommentRepository;
pub use follow::FollowRepository;
pub use notification::{NotificationFilter, NotificationRepository};
pub use notification_preference::NotificationPreferenceRepository;
pub use post::PostRepository;
pub use post_like::PostLikeRepository;
pub use push_token::PushTokenRepository;
pub use user::UserRepository;
