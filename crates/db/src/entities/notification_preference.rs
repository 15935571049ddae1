//! Notification preference entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-user notification preferences, read before every push send.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_preference")]
pub struct Model {
    /// One row per user
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,

    /// Master switch for push delivery
    #[sea_orm(default_value = true)]
    pub push_enabled: bool,

    /// Whether the quiet-hours window applies
    #[sea_orm(default_value = false)]
    pub quiet_hours_enabled: bool,

    /// Quiet hours start, "HH:MM" wall clock
    pub quiet_hours_start: String,

    /// Quiet hours end, "HH:MM" wall clock (may be before start: spans midnight)
    pub quiet_hours_end: String,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

impl Model {
    /// Defaults used when a user has no stored row.
    #[must_use]
    pub fn defaults(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            push_enabled: true,
            quiet_hours_enabled: false,
            quiet_hours_start: "22:00".to_string(),
            quiet_hours_end: "07:00".to_string(),
            updated_at: None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
