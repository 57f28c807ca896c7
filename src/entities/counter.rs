//! Counter entity - Named monotonically increasing sequences.
//!
//! Used for allocating invoice numbers. Rows are bumped with a single
//! `UPDATE ... SET value = value + 1` inside the caller's transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Counter database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "counters")]
pub struct Model {
    /// Sequence name (e.g. `"invoice"`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
    /// Last value handed out
    pub value: i64,
}

/// `Counter` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
