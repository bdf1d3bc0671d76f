//! Notification preference entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Default reminder times.
pub const DEFAULT_BREAKFAST_TIME: &str = "08:00";
pub const DEFAULT_LUNCH_TIME: &str = "13:00";
pub const DEFAULT_DINNER_TIME: &str = "19:00";

/// Per-user notification settings. At most one row per user, created on demand.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_preference")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub user_id: i64,

    #[sea_orm(default_value = true)]
    pub meal_reminders: bool,

    #[sea_orm(default_value = true)]
    pub water_reminders: bool,

    #[sea_orm(default_value = true)]
    pub progress_updates: bool,

    #[sea_orm(default_value = true)]
    pub group_activity: bool,

    #[sea_orm(default_value = true)]
    pub weekly_reports: bool,

    /// "HH:MM"
    pub breakfast_time: String,

    pub lunch_time: String,

    pub dinner_time: String,

    /// Master switch for Web Push. Only meaningful while a subscription exists.
    #[sea_orm(default_value = false)]
    pub push_enabled: bool,

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
