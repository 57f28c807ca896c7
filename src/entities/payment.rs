//! Payment entity - One payment attempt against a fee assessment.
//!
//! Only payments whose `status` is `Success` count towards the assessment's paid amount.

use crate::core::money::Money;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome of a payment attempt
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum PaymentStatus {
    /// Awaiting confirmation
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Funds received
    #[sea_orm(string_value = "Success")]
    Success,
    /// Attempt rejected or reversed
    #[sea_orm(string_value = "Failed")]
    Failed,
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier for the payment
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Assessment being paid
    pub assessment_id: i32,
    /// Channel the payment came through
    pub payment_method_id: i32,
    /// Amount paid, always positive
    pub amount: Money,
    /// External transaction reference (bank or gateway id)
    pub transaction_ref: String,
    /// When the payment was made
    pub occurred_at: DateTimeUtc,
    /// Outcome of the attempt
    pub status: PaymentStatus,
    /// Optional free-form reference entered by staff
    pub note: Option<String>,
}

/// Defines relationships between Payment and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each payment belongs to one assessment
    #[sea_orm(
        belongs_to = "super::fee_assessment::Entity",
        from = "Column::AssessmentId",
        to = "super::fee_assessment::Column::Id"
    )]
    FeeAssessment,
    /// Each payment used one method
    #[sea_orm(
        belongs_to = "super::payment_method::Entity",
        from = "Column::PaymentMethodId",
        to = "super::payment_method::Column::Id"
    )]
    PaymentMethod,
    /// At most one invoice confirms a payment
    #[sea_orm(has_one = "super::invoice::Entity")]
    Invoice,
}

impl Related<super::fee_assessment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeeAssessment.def()
    }
}

impl Related<super::payment_method::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentMethod.def()
    }
}

impl Related<super::invoice::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invoice.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
