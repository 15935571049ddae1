//! Domain services.

#![allow(missing_docs)]

pub mod follow;
pub mod notification;
pub mod post;
pub mod push;
pub mod user;

pub use follow::FollowService;
pub use notification::NotificationService;
pub use post::PostService;
pub use push::{
    ExpoPushProvider, PreferencesUpdate, PushErrorCode, PushMessage, PushPayload, PushProvider,
    PushService, PushTicket, TicketStatus,
};
pub use user::UserService;
