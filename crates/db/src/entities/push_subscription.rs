//! Push subscription entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A browser/device registration for Web Push notifications.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "push_subscription")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,

    /// User ID
    #[sea_orm(indexed)]
    pub user_id: i64,

    /// Push service endpoint URL, unique across all users
    #[sea_orm(column_type = "Text", unique)]
    pub endpoint: String,

    /// P256DH public key of the browser (URL-safe base64)
    pub p256dh: String,

    /// Auth secret of the browser (URL-safe base64)
    pub auth: String,

    /// User agent of the device that registered
    #[sea_orm(nullable)]
    pub user_agent: Option<String>,

    /// Timestamp when the subscription was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the subscription was last re-registered
    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

/// Relations for push subscription.
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
