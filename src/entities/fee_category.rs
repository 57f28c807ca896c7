//! Fee category entity - Kinds of charges such as tuition or lab fees.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Fee category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "fee_categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Unique display name
    #[sea_orm(unique)]
    pub name: String,
    /// Optional free-form description
    pub description: Option<String>,
    /// Inactive categories are kept for history but not offered for new structures
    pub is_active: bool,
}

/// Defines relationships between `FeeCategory` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Structures priced in this category
    #[sea_orm(has_many = "super::fee_structure::Entity")]
    FeeStructure,
    /// Assessment line items charged in this category
    #[sea_orm(has_many = "super::fee_line_item::Entity")]
    FeeLineItem,
}

impl Related<super::fee_structure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeStructure.def()
    }
}

impl Related<super::fee_line_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeLineItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
