//! Workout post entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    /// Post text
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Workout duration in minutes
    #[sea_orm(nullable)]
    pub duration_minutes: Option<i32>,

    /// Calories burned
    #[sea_orm(nullable)]
    pub calories: Option<i32>,

    /// Likes count (denormalized)
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Comments count (denormalized)
    #[sea_orm(default_value = 0)]
    pub comment_count: i32,

    pub created_at: DateTimeWithTimeZone,
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

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::post_like::Entity")]
    Likes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
