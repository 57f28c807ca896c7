//! Notification entity - In-portal messages addressed to a user.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Notification database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "notifications")]
pub struct Model {
    /// Unique identifier for the notification
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Recipient
    pub user_id: i32,
    /// Short headline
    pub title: String,
    /// Body text
    pub message: String,
    /// Free-form kind used for filtering (e.g. "TuitionReminder")
    pub kind: String,
    /// When the notification was created
    pub sent_at: DateTimeUtc,
    /// Whether the recipient has opened it
    pub is_read: bool,
}

/// Defines relationships between Notification and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Recipient
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
