//! Notification entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationKind {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "comment")]
    Comment,
    #[sea_orm(string_value = "reply")]
    Reply,
    #[sea_orm(string_value = "follow")]
    Follow,
    #[sea_orm(string_value = "workout_reminder")]
    WorkoutReminder,
    #[sea_orm(string_value = "workout_completed")]
    WorkoutCompleted,
    #[sea_orm(string_value = "weekly_goal_achieved")]
    WeeklyGoalAchieved,
    #[sea_orm(string_value = "monthly_milestone")]
    MonthlyMilestone,
    #[sea_orm(string_value = "plan_generated")]
    PlanGenerated,
    #[sea_orm(string_value = "weekly_report")]
    WeeklyReport,
    #[sea_orm(string_value = "inactive_alert")]
    InactiveAlert,
    #[sea_orm(string_value = "recovery_reminder")]
    RecoveryReminder,
}

impl NotificationKind {
    /// Wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Follow => "follow",
            Self::WorkoutReminder => "workout_reminder",
            Self::WorkoutCompleted => "workout_completed",
            Self::WeeklyGoalAchieved => "weekly_goal_achieved",
            Self::MonthlyMilestone => "monthly_milestone",
            Self::PlanGenerated => "plan_generated",
            Self::WeeklyReport => "weekly_report",
            Self::InactiveAlert => "inactive_alert",
            Self::RecoveryReminder => "recovery_reminder",
        }
    }

    /// Category used for feed filtering.
    #[must_use]
    pub const fn category(self) -> NotificationCategory {
        match self {
            Self::Like | Self::Comment | Self::Reply | Self::Follow => {
                NotificationCategory::Social
            }
            _ => NotificationCategory::Workout,
        }
    }
}

/// Notification categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum NotificationCategory {
    #[sea_orm(string_value = "social")]
    Social,
    #[sea_orm(string_value = "workout")]
    Workout,
}

impl NotificationCategory {
    /// Wire name of this category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Social => "social",
            Self::Workout => "workout",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// The user receiving the notification
    pub recipient_id: String,

    /// The user who triggered it (None for system-generated kinds)
    #[sea_orm(nullable)]
    pub actor_id: Option<String>,

    /// Notification kind
    pub kind: NotificationKind,

    /// Related post ID (like, comment)
    #[sea_orm(nullable)]
    pub post_id: Option<String>,

    /// Related comment ID (comment, reply)
    #[sea_orm(nullable)]
    pub comment_id: Option<String>,

    /// Free-form metadata used for payload interpolation
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub data: Option<Json>,

    /// Has this notification been read?
    #[sea_orm(default_value = false)]
    pub is_read: bool,

    #[sea_orm(nullable)]
    pub read_at: Option<DateTimeWithTimeZone>,

    /// Was a push delivered for this notification?
    #[sea_orm(default_value = false)]
    pub push_sent: bool,

    #[sea_orm(nullable)]
    pub push_sent_at: Option<DateTimeWithTimeZone>,

    /// Category (social | workout), derived from kind at creation
    pub category: NotificationCategory,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::RecipientId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::ActorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Actor,

    #[sea_orm(
        belongs_to = "super::post::Entity",
        from = "Column::PostId",
        to = "super::post::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_categories() {
        assert_eq!(NotificationKind::Like.category(), NotificationCategory::Social);
        assert_eq!(NotificationKind::Reply.category(), NotificationCategory::Social);
        assert_eq!(
            NotificationKind::WorkoutCompleted.category(),
            NotificationCategory::Workout
        );
        assert_eq!(
            NotificationKind::InactiveAlert.category(),
            NotificationCategory::Workout
        );
    }
}
