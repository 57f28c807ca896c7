//! Student entity - Enrollment record linking a user to a department and class.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Unique identifier for the student
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning user account, one student per user
    #[sea_orm(unique)]
    pub user_id: i32,
    /// Registry code printed on statements (e.g. "CS2025001")
    #[sea_orm(unique)]
    pub student_code: String,
    /// Department the student is enrolled in
    pub department_id: i32,
    /// Class within `department_id`
    pub class_id: i32,
    /// Year of first enrollment
    pub enrollment_year: i32,
    /// Ordinal of the semester the student is currently taking, if tracked
    pub current_semester: Option<i32>,
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Login account
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Enrolled department
    #[sea_orm(
        belongs_to = "super::department::Entity",
        from = "Column::DepartmentId",
        to = "super::department::Column::Id"
    )]
    Department,
    /// Enrolled class
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id"
    )]
    Class,
    /// Fee assessments, one per semester
    #[sea_orm(has_many = "super::fee_assessment::Entity")]
    FeeAssessment,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::department::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::fee_assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeAssessment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
