//! Fee line item entity - One categorized component of an assessment's total.

use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fee line item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "fee_line_items")]
pub struct Model {
    /// Unique identifier for the line item
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Owning assessment
    pub assessment_id: i32,
    /// Category of the charge
    pub fee_category_id: i32,
    /// Charge amount
    pub amount: Money,
}

/// Defines relationships between `FeeLineItem` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Owning assessment
    #[sea_orm(
        belongs_to = "super::fee_assessment::Entity",
        from = "Column::AssessmentId",
        to = "super::fee_assessment::Column::Id"
    )]
    FeeAssessment,
    /// Category of the charge
    #[sea_orm(
        belongs_to = "super::fee_category::Entity",
        from = "Column::FeeCategoryId",
        to = "super::fee_category::Column::Id"
    )]
    FeeCategory,
}

impl Related<super::fee_assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeAssessment.def()
    }
}

impl Related<super::fee_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeCategory.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
