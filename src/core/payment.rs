//! Payment ledger.
//!
//! Recording a payment, changing its status and deleting it each run in one database
//! transaction that ends by reconciling the owning assessment, so the stored fee status always
//! agrees with the successful payments on record.

use crate::{
    core::{
        catalog::get_payment_method,
        money::Money,
        paging::{DateRange, PageWindow, Paged, fetch_page, search_term},
        reconcile::reconcile_assessment,
    },
    entities::{
        FeeAssessment, Invoice, Payment, PaymentStatus, fee_assessment, invoice, payment,
        payment_method, semester, student, user,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    Condition, ConnectionTrait, FromQueryResult, JoinType, QueryOrder, QuerySelect, Set,
    TransactionTrait, prelude::*,
};
use serde::{Deserialize, Serialize};

/// Which payment status changes are allowed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransitionPolicy {
    /// Any status may move to any other (administrative corrections)
    #[default]
    Permissive,
    /// `Success` and `Failed` are final; only `Pending` may change
    Strict,
}

impl TransitionPolicy {
    /// Picks the policy matching the `strict_payment_transitions` config flag.
    #[must_use]
    pub const fn from_strict(strict: bool) -> Self {
        if strict { Self::Strict } else { Self::Permissive }
    }

    /// Checks a transition. Re-applying the current status is always allowed.
    pub fn check(self, from: PaymentStatus, to: PaymentStatus) -> Result<()> {
        match self {
            Self::Permissive => Ok(()),
            Self::Strict if from == to || from == PaymentStatus::Pending => Ok(()),
            Self::Strict => Err(Error::conflict(format!(
                "Payment status {from:?} is final and cannot change to {to:?}"
            ))),
        }
    }
}

/// Fields accepted when recording a payment.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayment {
    /// Assessment being paid
    #[serde(rename = "studentFeeId", alias = "studentFeeID")]
    pub assessment_id: i32,
    /// Channel used
    #[serde(alias = "paymentMethodID")]
    pub payment_method_id: i32,
    /// Amount paid, must be positive
    pub amount: Money,
    /// External transaction reference
    #[serde(rename = "transactionId", alias = "transactionID")]
    pub transaction_ref: String,
    /// Optional staff reference
    #[serde(rename = "paymentReference", default)]
    pub note: Option<String>,
    /// Initial status, `Success` when omitted
    #[serde(default)]
    pub status: Option<PaymentStatus>,
}

/// Fields accepted when changing a payment's status.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentStatus {
    /// New status
    pub status: PaymentStatus,
    /// Replaces the staff reference when present
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// Filters for [`list_payments`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilter {
    /// Only payments against this assessment
    #[serde(alias = "studentFeeId")]
    pub assessment_id: Option<i32>,
    /// Only payments by this student
    pub student_id: Option<i32>,
    /// Only payments for this semester
    pub semester_id: Option<i32>,
    /// Only payments through this method
    pub payment_method_id: Option<i32>,
    /// Only payments in this state
    pub status: Option<PaymentStatus>,
    /// Substring of student code, name or transaction reference
    pub search_query: Option<String>,
    /// First day included
    pub start_date: Option<NaiveDate>,
    /// Last day included
    pub end_date: Option<NaiveDate>,
}

/// Flat payment projection joined with student, semester, method and invoice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    /// Payment id
    pub id: i32,
    /// Assessment the payment is applied to
    #[serde(rename = "studentFeeId")]
    pub assessment_id: i32,
    /// Paying student
    pub student_id: i32,
    /// Paying student's registry code
    pub student_code: String,
    /// Paying student's full name
    pub student_name: String,
    /// Semester of the assessment
    pub semester_id: i32,
    /// Semester name
    pub semester_name: String,
    /// Channel used
    pub payment_method_id: i32,
    /// Channel name
    pub payment_method_name: String,
    /// Amount paid
    pub amount: Money,
    /// Reference from the payment channel
    #[serde(rename = "transactionId")]
    pub transaction_ref: String,
    /// When the payment was made
    pub occurred_at: DateTimeUtc,
    /// Ledger state
    pub status: PaymentStatus,
    /// Staff note
    #[serde(rename = "paymentReference")]
    pub note: Option<String>,
    /// Invoice confirming the payment, if issued
    pub invoice_id: Option<i32>,
    /// Number of that invoice
    pub invoice_number: Option<String>,
}

/// A payment together with its full invoice record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    /// Payment columns
    #[serde(flatten)]
    pub payment: PaymentView,
    /// The invoice, if one has been issued
    pub invoice: Option<invoice::Model>,
}

/// Records a payment and reconciles the assessment it pays.
///
/// The assessment and an active payment method must exist and the amount must be positive.
/// Without an explicit initial status the payment is recorded as `Success`.
pub async fn record_payment(
    db: &DatabaseConnection,
    input: RecordPayment,
) -> Result<payment::Model> {
    if !input.amount.is_positive() {
        return Err(Error::InvalidAmount {
            amount: input.amount.to_decimal(),
        });
    }
    let transaction_ref = input.transaction_ref.trim().to_string();
    if transaction_ref.is_empty() {
        return Err(Error::validation("transactionId is required"));
    }

    let txn = db.begin().await?;

    if FeeAssessment::find_by_id(input.assessment_id)
        .one(&txn)
        .await?
        .is_none()
    {
        return Err(Error::not_found("Fee assessment", input.assessment_id));
    }
    let method = get_payment_method(&txn, input.payment_method_id).await?;
    if !method.is_active {
        return Err(Error::validation(format!(
            "Payment method {} is inactive",
            method.name
        )));
    }

    let status = input.status.unwrap_or(PaymentStatus::Success);
    let created = payment::ActiveModel {
        assessment_id: Set(input.assessment_id),
        payment_method_id: Set(method.id),
        amount: Set(input.amount),
        transaction_ref: Set(transaction_ref),
        occurred_at: Set(chrono::Utc::now()),
        status: Set(status),
        note: Set(input.note),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let assessment = reconcile_assessment(&txn, created.assessment_id).await?;
    txn.commit().await?;

    tracing::info!(
        payment_id = created.id,
        assessment_id = created.assessment_id,
        amount = %created.amount,
        status = ?created.status,
        fee_status = ?assessment.status,
        "Recorded payment"
    );
    Ok(created)
}

/// Retrieves a payment row by id.
pub async fn get_payment<C: ConnectionTrait>(db: &C, id: i32) -> Result<payment::Model> {
    Payment::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment", id))
}

/// Changes a payment's status under `policy` and reconciles its assessment.
///
/// Applying the status a payment already has is a no-op apart from the reconciliation.
pub async fn update_payment_status(
    db: &DatabaseConnection,
    id: i32,
    update: UpdatePaymentStatus,
    policy: TransitionPolicy,
) -> Result<payment::Model> {
    let txn = db.begin().await?;
    let existing = get_payment(&txn, id).await?;
    policy.check(existing.status, update.status)?;

    let from = existing.status;
    let mut active: payment::ActiveModel = existing.into();
    active.status = Set(update.status);
    if let Some(reference) = update.payment_reference {
        active.note = Set(Some(reference));
    }
    let updated = active.update(&txn).await?;
    let assessment = reconcile_assessment(&txn, updated.assessment_id).await?;
    txn.commit().await?;

    tracing::info!(
        payment_id = id,
        from = ?from,
        to = ?updated.status,
        fee_status = ?assessment.status,
        "Updated payment status"
    );
    Ok(updated)
}

/// Deletes a payment that has no invoice and reconciles its assessment.
pub async fn delete_payment(db: &DatabaseConnection, id: i32) -> Result<()> {
    let txn = db.begin().await?;
    let existing = get_payment(&txn, id).await?;
    if let Some(issued) = Invoice::find()
        .filter(invoice::Column::PaymentId.eq(id))
        .one(&txn)
        .await?
    {
        return Err(Error::conflict(format!(
            "Payment {id} has invoice {} and cannot be deleted",
            issued.invoice_number
        )));
    }
    Payment::delete_by_id(id).exec(&txn).await?;
    let assessment = reconcile_assessment(&txn, existing.assessment_id).await?;
    txn.commit().await?;

    tracing::info!(
        payment_id = id,
        assessment_id = existing.assessment_id,
        fee_status = ?assessment.status,
        "Deleted payment"
    );
    Ok(())
}

fn payment_view_select() -> Select<Payment> {
    Payment::find()
        .select_only()
        .column(payment::Column::Id)
        .column(payment::Column::AssessmentId)
        .column_as(fee_assessment::Column::StudentId, "student_id")
        .column_as(student::Column::StudentCode, "student_code")
        .column_as(user::Column::FullName, "student_name")
        .column_as(fee_assessment::Column::SemesterId, "semester_id")
        .column_as(semester::Column::Name, "semester_name")
        .column(payment::Column::PaymentMethodId)
        .column_as(payment_method::Column::Name, "payment_method_name")
        .column(payment::Column::Amount)
        .column(payment::Column::TransactionRef)
        .column(payment::Column::OccurredAt)
        .column(payment::Column::Status)
        .column(payment::Column::Note)
        .column_as(invoice::Column::Id, "invoice_id")
        .column_as(invoice::Column::InvoiceNumber, "invoice_number")
        .join(JoinType::InnerJoin, payment::Relation::FeeAssessment.def())
        .join(JoinType::InnerJoin, fee_assessment::Relation::Student.def())
        .join(JoinType::InnerJoin, student::Relation::User.def())
        .join(JoinType::InnerJoin, fee_assessment::Relation::Semester.def())
        .join(JoinType::InnerJoin, payment::Relation::PaymentMethod.def())
        .join(JoinType::LeftJoin, payment::Relation::Invoice.def())
}

fn newest_first(query: Select<Payment>) -> Select<Payment> {
    query
        .order_by_desc(payment::Column::OccurredAt)
        .order_by_desc(payment::Column::Id)
}

/// Lists payments, newest first.
pub async fn list_payments(
    db: &DatabaseConnection,
    filter: &PaymentFilter,
    window: PageWindow,
) -> Result<Paged<PaymentView>> {
    let mut query = payment_view_select();
    if let Some(assessment_id) = filter.assessment_id {
        query = query.filter(payment::Column::AssessmentId.eq(assessment_id));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(fee_assessment::Column::StudentId.eq(student_id));
    }
    if let Some(semester_id) = filter.semester_id {
        query = query.filter(fee_assessment::Column::SemesterId.eq(semester_id));
    }
    if let Some(method_id) = filter.payment_method_id {
        query = query.filter(payment::Column::PaymentMethodId.eq(method_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(payment::Column::Status.eq(status));
    }
    if let Some(term) = search_term(filter.search_query.as_deref()) {
        query = query.filter(
            Condition::any()
                .add(student::Column::StudentCode.contains(&term))
                .add(user::Column::FullName.contains(&term))
                .add(payment::Column::TransactionRef.contains(&term)),
        );
    }
    let range = DateRange {
        start_date: filter.start_date,
        end_date: filter.end_date,
    };
    query = query.filter(range.condition(payment::Column::OccurredAt)?);

    fetch_page(db, newest_first(query).into_model::<PaymentView>(), window).await
}

/// Successful payments that have not been invoiced yet, newest first.
pub async fn payments_without_invoice(
    db: &DatabaseConnection,
    window: PageWindow,
) -> Result<Paged<PaymentView>> {
    let query = payment_view_select()
        .filter(payment::Column::Status.eq(PaymentStatus::Success))
        .filter(invoice::Column::Id.is_null());
    fetch_page(db, newest_first(query).into_model::<PaymentView>(), window).await
}

/// Every payment against one assessment, newest first.
pub async fn payments_for_assessment(
    db: &DatabaseConnection,
    assessment_id: i32,
) -> Result<Vec<PaymentView>> {
    newest_first(payment_view_select().filter(payment::Column::AssessmentId.eq(assessment_id)))
        .into_model::<PaymentView>()
        .all(db)
        .await
        .map_err(Into::into)
}

/// Payment detail including its invoice.
pub async fn get_payment_detail(db: &DatabaseConnection, id: i32) -> Result<PaymentDetail> {
    let view = payment_view_select()
        .filter(payment::Column::Id.eq(id))
        .into_model::<PaymentView>()
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment", id))?;
    let invoice = Invoice::find()
        .filter(invoice::Column::PaymentId.eq(id))
        .one(db)
        .await?;
    Ok(PaymentDetail {
        payment: view,
        invoice,
    })
}
