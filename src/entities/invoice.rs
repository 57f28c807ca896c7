//! Invoice entity - A numbered document confirming one successful payment.
//!
//! Both `payment_id` and `invoice_number` carry unique indexes, so the store itself rejects a
//! second invoice for a payment or a reused number.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Invoice database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    /// Unique identifier for the invoice
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Confirmed payment
    #[sea_orm(unique)]
    pub payment_id: i32,
    /// Human-readable number in the form `INV-YYYYMMDD-NNNN`
    #[sea_orm(unique)]
    pub invoice_number: String,
    /// When the invoice was issued
    pub issued_at: DateTimeUtc,
    /// Where the document store put the rendered file
    pub file_path: String,
    /// Whether the invoice has been emailed to the student
    pub email_sent: bool,
}

/// Defines relationships between Invoice and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Confirmed payment
    #[sea_orm(
        belongs_to = "super::payment::Entity",
        from = "Column::PaymentId",
        to = "super::payment::Column::Id"
    )]
    Payment,
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
