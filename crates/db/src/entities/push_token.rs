//! Push token entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Push token entity: one row per registered device.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "push_token")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Owner
    #[sea_orm(indexed)]
    pub user_id: String,

    /// Provider device token (destination address)
    #[sea_orm(column_type = "Text")]
    pub token: String,

    /// Platform (ios | android)
    pub platform: String,

    /// Device name (user-provided)
    #[sea_orm(nullable)]
    pub device_name: Option<String>,

    /// Device identifier reported by the app
    #[sea_orm(nullable)]
    pub device_id: Option<String>,

    /// Whether the token is active
    #[sea_orm(default_value = true)]
    pub active: bool,

    /// Last successful delivery through this token
    #[sea_orm(nullable)]
    pub last_used_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
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
