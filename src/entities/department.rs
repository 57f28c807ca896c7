//! Department entity - Academic departments that own classes, students and fee structures.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Department database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "departments")]
pub struct Model {
    /// Unique identifier for the department
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Display name (e.g. "Computer Science")
    pub name: String,
    /// Short unique code (e.g. "CS")
    #[sea_orm(unique)]
    pub code: String,
}

/// Defines relationships between Department and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// A department has many classes
    #[sea_orm(has_many = "super::class::Entity")]
    Class,
    /// A department has many enrolled students
    #[sea_orm(has_many = "super::student::Entity")]
    Student,
    /// A department has many fee structures, one per semester and category
    #[sea_orm(has_many = "super::fee_structure::Entity")]
    FeeStructure,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::fee_structure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeStructure.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
