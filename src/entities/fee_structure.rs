//! Fee structure entity - The price of one fee category for a department in a semester.
//!
//! Batch assessment generation copies these rows into per-student line items. At most one
//! structure exists per (`department_id`, `semester_id`, `fee_category_id`); the composite unique
//! index is created alongside the table in `config::database`.

use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fee structure database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "fee_structures")]
pub struct Model {
    /// Unique identifier for the structure
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Department being charged
    pub department_id: i32,
    /// Semester being charged
    pub semester_id: i32,
    /// Category of the charge
    pub fee_category_id: i32,
    /// Charge amount
    pub amount: Money,
    /// Whether `amount` is quoted per credit hour (informational only)
    pub per_credit: bool,
    /// When the structure was created
    pub created_at: DateTimeUtc,
    /// When the amount or flags last changed
    pub last_updated: DateTimeUtc,
}

/// Defines relationships between `FeeStructure` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Department being charged
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    /// Semester being charged
    #[sea_orm(
        belongs_to = "super::semester::Entity",
        from = "Column::SemesterId",
        to = "super::semester::Column::Id"
    )]
    Semester,
    /// Category of the charge
    #[sea_orm(
        belongs_to = "super::fee_category::Entity",
        from = "Column::FeeCategoryId",
        to = "super::fee_category::Column::Id"
    )]
    FeeCategory,
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::semester::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Semester.def()
    }
}

impl Related<super::fee_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
