//! Semester collection reports.
//!
//! Figures are computed from the stored assessments and their successful payments. Amounts stay
//! in [`Money`]; only the collection rate is a float.

use crate::{
    core::{money::Money, reconcile::paid_amounts, semester::get_semester},
    entities::{FeeAssessment, FeeStatus, fee_assessment},
    errors::Result,
};
use sea_orm::{DatabaseConnection, prelude::*};
use serde::Serialize;

/// Collection summary for one semester.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterReport {
    /// Reported semester
    pub semester_id: i32,
    /// Semester name
    pub semester_name: String,
    /// Number of assessments issued for the semester
    pub assessment_count: usize,
    /// Assessments with nothing paid
    pub unpaid_count: usize,
    /// Assessments partly paid
    pub partial_count: usize,
    /// Assessments fully paid
    pub paid_count: usize,
    /// Sum of assessment totals
    pub total_assessed: Money,
    /// Sum of successful payments against those assessments
    pub total_collected: Money,
    /// Amount still owed, never counting overpayment as credit
    pub outstanding: Money,
    /// `total_collected / total_assessed` as a percentage
    pub collection_rate_percent: f64,
}

/// Builds the collection report for a semester.
pub async fn semester_report(db: &DatabaseConnection, semester_id: i32) -> Result<SemesterReport> {
    let semester = get_semester(db, semester_id).await?;
    let assessments = FeeAssessment::find()
        .filter(fee_assessment::Column::SemesterId.eq(semester_id))
        .all(db)
        .await?;
    let ids: Vec<i32> = assessments.iter().map(|a| a.id).collect();
    let paid = paid_amounts(db, &ids).await?;

    let mut report = SemesterReport {
        semester_id,
        semester_name: semester.name,
        assessment_count: assessments.len(),
        unpaid_count: 0,
        partial_count: 0,
        paid_count: 0,
        total_assessed: Money::ZERO,
        total_collected: Money::ZERO,
        outstanding: Money::ZERO,
        collection_rate_percent: 0.0,
    };
    for assessment in &assessments {
        match assessment.status {
            FeeStatus::Unpaid => report.unpaid_count += 1,
            FeeStatus::Partial => report.partial_count += 1,
            FeeStatus::Paid => report.paid_count += 1,
        }
    }
    report.outstanding = Money::try_sum(assessments.iter().map(|a| {
        let collected = paid.get(&a.id).copied().unwrap_or_default();
        a.total_amount.saturating_remaining(collected)
    }))?;
    report.total_assessed = Money::try_sum(assessments.iter().map(|a| a.total_amount))?;
    report.total_collected = Money::try_sum(paid.values().copied())?;
    report.collection_rate_percent =
        calculate_collection_rate(report.total_collected, report.total_assessed);

    tracing::debug!(
        semester_id,
        assessments = report.assessment_count,
        rate = report.collection_rate_percent,
        "Built semester report"
    );
    Ok(report)
}

/// Percentage of the assessed amount that has been collected.
///
/// Returns 0 when nothing was assessed. Overpayment can push the rate above 100.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_collection_rate(collected: Money, assessed: Money) -> f64 {
    if assessed.is_zero() {
        return 0.0;
    }

    // Cents fit f64 exactly well beyond any realistic tuition total.
    (collected.minor() as f64 / assessed.minor() as f64) * 100.0
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::PaymentStatus;
    use crate::test_utils::*;

    #[test]
    fn test_collection_rate_half() {
        let rate = calculate_collection_rate(Money::from_major(500), Money::from_major(1_000));
        assert_eq!(rate, 50.0);
    }

    #[test]
    fn test_collection_rate_nothing_assessed() {
        assert_eq!(calculate_collection_rate(Money::from_major(10), Money::ZERO), 0.0);
    }

    #[test]
    fn test_collection_rate_overpaid() {
        let rate = calculate_collection_rate(Money::from_major(150), Money::from_major(100));
        assert_eq!(rate, 150.0);
    }

    #[tokio::test]
    async fn test_semester_report_counts_successful_payments() -> Result<()> {
        let (db, fx) = setup_with_assessment(1_000).await?;
        let other = create_test_student(&db, "CS002", fx.department.id, fx.class.id).await?;
        create_test_assessment(&db, other.id, fx.semester.id, fx.category.id, 500).await?;

        record_test_payment(&db, &fx, 250, None).await?;
        record_test_payment(&db, &fx, 700, Some(PaymentStatus::Failed)).await?;

        let report = semester_report(&db, fx.semester.id).await?;
        assert_eq!(report.assessment_count, 2);
        assert_eq!(report.unpaid_count, 1);
        assert_eq!(report.partial_count, 1);
        assert_eq!(report.paid_count, 0);
        assert_eq!(report.total_assessed, Money::from_major(1_500));
        assert_eq!(report.total_collected, Money::from_major(250));
        assert_eq!(report.outstanding, Money::from_major(1_250));
        assert!((report.collection_rate_percent - 16.666_666).abs() < 1e-3);
        Ok(())
    }

    #[tokio::test]
    async fn test_semester_report_overflow_is_an_error() -> Result<()> {
        let (db, fx) = setup_with_assessment(i64::MAX / 100).await?;
        let other = create_test_student(&db, "CS002", fx.department.id, fx.class.id).await?;
        create_test_assessment(&db, other.id, fx.semester.id, fx.category.id, i64::MAX / 100)
            .await?;

        let result = semester_report(&db, fx.semester.id).await;
        assert!(matches!(result, Err(crate::errors::Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_semester_report_empty_semester() -> Result<()> {
        let db = setup_test_db().await?;
        let semester = create_test_semester(&db, "Spring 2026").await?;
        let report = semester_report(&db, semester.id).await?;
        assert_eq!(report.assessment_count, 0);
        assert_eq!(report.collection_rate_percent, 0.0);
        Ok(())
    }
}
