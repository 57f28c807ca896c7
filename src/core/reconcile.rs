//! Fee status reconciliation.
//!
//! An assessment's stored `status` is always derived from its successful payments. Every
//! operation that changes which successful payments exist (recording, status changes, deletion,
//! line-item edits) calls [`reconcile_assessment`] inside its own database transaction so that
//! readers never observe a stale status.

use crate::{
    core::money::Money,
    entities::{FeeAssessment, FeeStatus, Payment, PaymentStatus, fee_assessment, payment},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, prelude::*};
use std::collections::HashMap;

/// Derives the status of an assessment from its total and the sum of its successful payments.
///
/// Nothing paid is `Unpaid`; covering the total (overpayment included) is `Paid`; anything in
/// between is `Partial`.
#[must_use]
pub fn reconcile(total: Money, paid: Money) -> FeeStatus {
    if !paid.is_positive() {
        FeeStatus::Unpaid
    } else if paid >= total {
        FeeStatus::Paid
    } else {
        FeeStatus::Partial
    }
}

/// Sums the successful payments recorded against one assessment.
pub async fn paid_amount<C: ConnectionTrait>(db: &C, assessment_id: i32) -> Result<Money> {
    let payments = Payment::find()
        .filter(payment::Column::AssessmentId.eq(assessment_id))
        .filter(payment::Column::Status.eq(PaymentStatus::Success))
        .all(db)
        .await?;
    Money::try_sum(payments.into_iter().map(|p| p.amount))
}

/// Sums successful payments for many assessments at once; assessments without any are absent.
pub async fn paid_amounts<C: ConnectionTrait>(
    db: &C,
    assessment_ids: &[i32],
) -> Result<HashMap<i32, Money>> {
    if assessment_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let payments = Payment::find()
        .filter(payment::Column::AssessmentId.is_in(assessment_ids.iter().copied()))
        .filter(payment::Column::Status.eq(PaymentStatus::Success))
        .all(db)
        .await?;

    let mut totals: HashMap<i32, Money> = HashMap::new();
    for p in payments {
        let entry = totals.entry(p.assessment_id).or_default();
        *entry = entry.checked_add(p.amount).ok_or(Error::InvalidAmount {
            amount: p.amount.to_decimal(),
        })?;
    }
    Ok(totals)
}

/// Recomputes and persists the status of one assessment.
///
/// `last_updated` is refreshed on every call, even when the status does not change.
pub async fn reconcile_assessment<C: ConnectionTrait>(
    db: &C,
    assessment_id: i32,
) -> Result<fee_assessment::Model> {
    let assessment = FeeAssessment::find_by_id(assessment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Fee assessment", assessment_id))?;

    let paid = paid_amount(db, assessment_id).await?;
    let status = reconcile(assessment.total_amount, paid);

    if status != assessment.status {
        tracing::info!(
            assessment_id,
            from = ?assessment.status,
            to = ?status,
            paid = %paid,
            total = %assessment.total_amount,
            "Fee status changed"
        );
    }

    let mut active: fee_assessment::ActiveModel = assessment.into();
    active.status = Set(status);
    active.last_updated = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}
