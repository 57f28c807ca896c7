//! User entity - Accounts that can sign in to the portal.
//!
//! Credentials live with the upstream authentication gateway; this table only keeps the
//! profile and `role` used to gate administrative endpoints.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role carried by every account
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum UserRole {
    /// Finance and registry staff
    #[sea_orm(string_value = "Admin")]
    Admin,
    /// Enrolled student, limited to self-service
    #[sea_orm(string_value = "Student")]
    Student,
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Unique login and contact address
    #[sea_orm(unique)]
    pub email: String,
    /// Name shown on statements and reminders
    pub full_name: String,
    /// Optional phone number
    pub phone: Option<String>,
    /// Access role
    pub role: UserRole,
    /// Disabled accounts keep their history but cannot act
    pub is_active: bool,
    /// When the account was created
    pub registered_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A student account has exactly one student record
    #[sea_orm(has_one = "super::student::Entity")]
    Student,
    /// Notifications addressed to the user
    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notification.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
