//! Notification entity.

use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification categories.
///
/// Stored as their snake-case string value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    #[sea_orm(string_value = "meal_reminder")]
    MealReminder,
    #[sea_orm(string_value = "water_reminder")]
    WaterReminder,
    #[sea_orm(string_value = "progress")]
    Progress,
    #[sea_orm(string_value = "group")]
    Group,
    #[sea_orm(string_value = "weekly_report")]
    WeeklyReport,
    #[sea_orm(string_value = "friend")]
    Friend,
    #[sea_orm(string_value = "fridge")]
    Fridge,
    #[sea_orm(string_value = "system")]
    System,
}

impl NotificationCategory {
    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MealReminder => "meal_reminder",
            Self::WaterReminder => "water_reminder",
            Self::Progress => "progress",
            Self::Group => "group",
            Self::WeeklyReport => "weekly_report",
            Self::Friend => "friend",
            Self::Fridge => "fridge",
            Self::System => "system",
        }
    }
}

impl fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// The user receiving the notification
    #[sea_orm(indexed)]
    pub user_id: i64,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub category: NotificationCategory,

    /// Kind of the entity this notification points at (e.g. "group", "fridge").
    /// Not a foreign key: the target table depends on the kind.
    #[sea_orm(nullable)]
    pub related_type: Option<String>,

    #[sea_orm(nullable)]
    pub related_id: Option<i64>,

    #[sea_orm(default_value = false)]
    pub is_read: bool,

    /// Set on the first read transition and left untouched afterwards
    #[sea_orm(nullable)]
    pub read_at: Option<DateTimeWithTimeZone>,

    /// Whether at least one Web Push delivery succeeded
    #[sea_orm(default_value = false)]
    pub is_pushed: bool,

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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
