//! Fee assessment entity - A student's total fee obligation for one semester.
//!
//! `total_amount` always equals the sum of the assessment's line items, and `status` always
//! equals the reconciled value derived from its successful payments. Both are rewritten only by
//! `core::assessment` and `core::reconcile`.

use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Settlement state of an assessment
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum FeeStatus {
    /// No successful payment yet
    #[sea_orm(string_value = "Unpaid")]
    Unpaid,
    /// Some, but not all, of the total has been paid
    #[sea_orm(string_value = "Partial")]
    Partial,
    /// Successful payments cover the total
    #[sea_orm(string_value = "Paid")]
    Paid,
}

/// Fee assessment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "fee_assessments")]
pub struct Model {
    /// Unique identifier for the assessment
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Student being billed
    pub student_id: i32,
    /// Semester being billed
    pub semester_id: i32,
    /// Sum of the line items
    pub total_amount: Money,
    /// Payment deadline
    pub due_date: Date,
    /// Reconciled settlement state
    pub status: FeeStatus,
    /// When the assessment was created
    pub created_at: DateTimeUtc,
    /// When the line items or status last changed
    pub last_updated: DateTimeUtc,
}

/// Defines relationships between `FeeAssessment` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Student being billed
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
    /// Semester being billed
    #[sea_orm(
        belongs_to = "super::semester::Entity",
        from = "Column::SemesterId",
        to = "super::semester::Column::Id"
    )]
    Semester,
    /// Categorized breakdown of the total
    #[sea_orm(has_many = "super::fee_line_item::Entity")]
    FeeLineItem,
    /// Payments made against the assessment
    #[sea_orm(has_many = "super::payment::Entity")]
    Payment,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::semester::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Semester.def()
    }
}

impl Related<super::fee_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeLineItem.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
