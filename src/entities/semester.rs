//! Semester entity - A billing period with a start and end date.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Semester database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "semesters")]
pub struct Model {
    /// Unique identifier for the semester
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Display name (e.g. "Fall 2025")
    pub name: String,
    /// First day of the semester
    pub start_date: Date,
    /// Last day of the semester, always after `start_date`
    pub end_date: Date,
    /// Academic year label (e.g. "2025-2026")
    pub academic_year: String,
    /// Whether the semester is currently open for billing
    pub is_active: bool,
}

/// Defines relationships between Semester and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Fee assessments billed in this semester
    #[sea_orm(has_many = "super::fee_assessment::Entity")]
    FeeAssessment,
    /// Fee structures priced for this semester
    #[sea_orm(has_many = "super::fee_structure::Entity")]
    FeeStructure,
}

impl Related<super::fee_assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeAssessment.def()
    }
}

impl Related<super::fee_structure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeStructure.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
