//! Invoice issuing, delivery and search.
//!
//! Invoice numbers look like `INV-20250914-0007`: the issue date followed by a global sequence
//! number. The sequence lives in the `counters` table and is bumped as the first statement of the
//! issuing transaction, which takes the database write lock before anything else is read. The
//! unique index on `invoice_number` backs this up; a collision is retried a bounded number of
//! times.

use crate::{
    core::{
        documents::{DocumentStore, PLACEHOLDER_CONTENTS},
        money::Money,
        notify::Notifier,
        paging::{DateRange, PageRequest, PageWindow, Paged, fetch_page, search_term},
        payment::get_payment,
    },
    entities::{
        Counter, Invoice, PaymentStatus, counter, fee_assessment, invoice, payment, payment_method,
        student, user,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    ConnectionTrait, FromQueryResult, JoinType, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

/// Name of the invoice sequence row in `counters`.
pub const INVOICE_SEQUENCE: &str = "invoice";

/// How many times issuing is attempted when the chosen number is already taken.
const MAX_ISSUE_ATTEMPTS: u32 = 3;

/// Formats an invoice number from its issue date and sequence value.
#[must_use]
pub fn format_invoice_number(date: NaiveDate, sequence: i64) -> String {
    format!("INV-{}-{sequence:04}", date.format("%Y%m%d"))
}

/// Request body for [`issue_invoice`].
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoice {
    /// Payment to confirm
    pub payment_id: i32,
    /// Email the invoice right away
    #[serde(default)]
    pub send_email: bool,
}

/// Search parameters for [`search_invoices`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSearch {
    /// Substring of the invoice number
    pub invoice_number: Option<String>,
    /// Substring of the student code
    pub student_code: Option<String>,
    /// Substring of the payment's transaction reference
    pub transaction_id: Option<String>,
    /// Only invoices that have (or have not) been emailed
    #[serde(alias = "sentToEmail")]
    pub email_sent: Option<bool>,
    /// First issue day included
    pub start_date: Option<NaiveDate>,
    /// Last issue day included
    pub end_date: Option<NaiveDate>,
    /// Paging
    #[serde(flatten)]
    pub paging: PageRequest,
}

/// Flat invoice projection joined with its payment and student.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceView {
    /// Invoice id
    pub id: i32,
    /// `INV-YYYYMMDD-NNNN`
    pub invoice_number: String,
    /// When the invoice was issued
    pub issued_at: DateTimeUtc,
    /// Stored document location
    pub file_path: String,
    /// Whether the invoice was emailed
    pub email_sent: bool,
    /// Confirmed payment
    pub payment_id: i32,
    /// Paying student's registry code
    pub student_code: String,
    /// Paying student's full name
    pub student_name: String,
    /// Where the invoice is emailed
    pub student_email: String,
    /// Amount paid
    pub amount: Money,
    /// When the payment was made
    pub payment_date: DateTimeUtc,
    /// Reference from the payment channel
    #[serde(rename = "transactionId")]
    pub transaction_ref: String,
    /// Channel used
    pub payment_method_name: String,
    /// Staff note on the payment
    #[serde(rename = "paymentReference")]
    pub note: Option<String>,
}

/// Result of [`send_invoice_batch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSendOutcome {
    /// Invoices found among the requested ids
    pub found: usize,
    /// Invoices delivered and marked sent
    pub sent: usize,
}

/// Bumps the invoice sequence and returns the new value.
///
/// The first call seeds the counter from the number of invoices already issued.
async fn next_sequence<C: ConnectionTrait>(db: &C) -> Result<i64> {
    let bumped = Counter::update_many()
        .col_expr(counter::Column::Value, Expr::col(counter::Column::Value).add(1))
        .filter(counter::Column::Name.eq(INVOICE_SEQUENCE))
        .exec(db)
        .await?;

    if bumped.rows_affected == 0 {
        let issued = i64::try_from(Invoice::find().count(db).await?)
            .map_err(|_| Error::conflict("Invoice sequence out of range"))?;
        let first = issued + 1;
        Counter::insert(counter::ActiveModel {
            name: Set(INVOICE_SEQUENCE.to_string()),
            value: Set(first),
        })
        .exec(db)
        .await?;
        return Ok(first);
    }

    Counter::find_by_id(INVOICE_SEQUENCE.to_string())
        .one(db)
        .await?
        .map(|row| row.value)
        .ok_or_else(|| Error::not_found("Counter", INVOICE_SEQUENCE))
}

/// Allocates the next unused invoice number for `date`.
async fn allocate_invoice_number<C: ConnectionTrait>(db: &C, date: NaiveDate) -> Result<String> {
    for _ in 0..MAX_ISSUE_ATTEMPTS {
        let number = format_invoice_number(date, next_sequence(db).await?);
        let taken = Invoice::find()
            .filter(invoice::Column::InvoiceNumber.eq(number.as_str()))
            .count(db)
            .await?;
        if taken == 0 {
            return Ok(number);
        }
        tracing::warn!(
            invoice_number = %number,
            "Invoice number already taken, advancing sequence"
        );
    }
    Err(Error::conflict("Could not allocate a unique invoice number"))
}

async fn invoice_for_payment<C: ConnectionTrait>(
    db: &C,
    payment_id: i32,
) -> Result<Option<invoice::Model>> {
    Invoice::find()
        .filter(invoice::Column::PaymentId.eq(payment_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn try_issue(
    db: &DatabaseConnection,
    documents: &dyn DocumentStore,
    payment_id: i32,
) -> Result<invoice::Model> {
    let txn = db.begin().await?;
    let issued_at = chrono::Utc::now();
    let number = allocate_invoice_number(&txn, issued_at.date_naive()).await?;

    let payment = get_payment(&txn, payment_id).await?;
    if payment.status != PaymentStatus::Success {
        return Err(Error::validation(format!(
            "Payment {payment_id} is {:?}; only successful payments can be invoiced",
            payment.status
        )));
    }
    if let Some(existing) = invoice_for_payment(&txn, payment_id).await? {
        return Err(Error::conflict(format!(
            "Payment {payment_id} already has invoice {}",
            existing.invoice_number
        )));
    }

    let created = invoice::ActiveModel {
        payment_id: Set(payment_id),
        invoice_number: Set(number.clone()),
        issued_at: Set(issued_at),
        file_path: Set(String::new()),
        email_sent: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let file_path = documents
        .store(&format!("{number}.pdf"), PLACEHOLDER_CONTENTS)
        .await?;
    let mut active: invoice::ActiveModel = created.into();
    active.file_path = Set(file_path);
    let created = active.update(&txn).await?;

    txn.commit().await?;
    Ok(created)
}

/// Issues the invoice for a successful payment.
///
/// A payment can be invoiced once; a second attempt is a conflict and leaves the invoice count
/// unchanged.
pub async fn issue_invoice(
    db: &DatabaseConnection,
    documents: &dyn DocumentStore,
    payment_id: i32,
) -> Result<invoice::Model> {
    let mut attempt = 1;
    loop {
        let message = match try_issue(db, documents, payment_id).await {
            Ok(created) => {
                tracing::info!(
                    invoice_id = created.id,
                    payment_id,
                    invoice_number = %created.invoice_number,
                    "Issued invoice"
                );
                return Ok(created);
            }
            Err(Error::Conflict { message }) => message,
            Err(e) => return Err(e),
        };
        // A conflict for an already invoiced payment is final; anything else was a number race.
        if attempt >= MAX_ISSUE_ATTEMPTS || invoice_for_payment(db, payment_id).await?.is_some() {
            return Err(Error::Conflict { message });
        }
        tracing::warn!(payment_id, attempt, %message, "Invoice number collision, retrying");
        attempt += 1;
    }
}

/// Issues an invoice and, when asked, emails it.
///
/// A failed delivery is logged and leaves the invoice unsent; it can be resent later.
pub async fn generate_invoice(
    db: &DatabaseConnection,
    documents: &dyn DocumentStore,
    notifier: &dyn Notifier,
    request: GenerateInvoice,
) -> Result<invoice::Model> {
    let created = issue_invoice(db, documents, request.payment_id).await?;
    if !request.send_email {
        return Ok(created);
    }
    match send_invoice_email(db, documents, notifier, created.id).await {
        Ok(sent) => Ok(sent),
        Err(e) => {
            tracing::warn!(invoice_id = created.id, error = %e, "Invoice issued but not emailed");
            Ok(created)
        }
    }
}

/// Retrieves an invoice row by id.
pub async fn get_invoice(db: &DatabaseConnection, id: i32) -> Result<invoice::Model> {
    Invoice::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invoice", id))
}

/// Marks an invoice as emailed. Marking twice is harmless.
pub async fn mark_sent(db: &DatabaseConnection, id: i32) -> Result<invoice::Model> {
    let existing = get_invoice(db, id).await?;
    if existing.email_sent {
        return Ok(existing);
    }
    let mut active: invoice::ActiveModel = existing.into();
    active.email_sent = Set(true);
    active.update(db).await.map_err(Into::into)
}

/// Emails an invoice to its student and marks it sent.
///
/// The stored document must still be readable.
pub async fn send_invoice_email(
    db: &DatabaseConnection,
    documents: &dyn DocumentStore,
    notifier: &dyn Notifier,
    id: i32,
) -> Result<invoice::Model> {
    let view = get_invoice_view(db, id).await?;
    if let Err(e) = documents.load(&view.file_path).await {
        return Err(match e {
            Error::NotFound { .. } => {
                Error::validation(format!("Invoice file for {} is missing", view.invoice_number))
            }
            other => other,
        });
    }

    let body = format!(
        "Dear {}, please find invoice {} for your payment of {} (transaction {}).",
        view.student_name, view.invoice_number, view.amount, view.transaction_ref
    );
    notifier
        .send(
            &view.student_email,
            &format!("Invoice {}", view.invoice_number),
            &body,
        )
        .await?;

    let sent = mark_sent(db, id).await?;
    tracing::info!(invoice_id = id, recipient = %view.student_email, "Emailed invoice");
    Ok(sent)
}

/// Emails several invoices. Unknown ids are ignored, but at least one must exist.
pub async fn send_invoice_batch(
    db: &DatabaseConnection,
    documents: &dyn DocumentStore,
    notifier: &dyn Notifier,
    ids: &[i32],
) -> Result<BatchSendOutcome> {
    if ids.is_empty() {
        return Err(Error::validation("invoiceIds must not be empty"));
    }
    let found: Vec<i32> = Invoice::find()
        .filter(invoice::Column::Id.is_in(ids.iter().copied()))
        .order_by_asc(invoice::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();
    if found.is_empty() {
        return Err(Error::NotFound {
            entity: "Invoices",
            id: format!("{ids:?}"),
        });
    }

    let mut outcome = BatchSendOutcome {
        found: found.len(),
        sent: 0,
    };
    for id in found {
        match send_invoice_email(db, documents, notifier, id).await {
            Ok(_) => outcome.sent += 1,
            Err(e) => tracing::warn!(invoice_id = id, error = %e, "Failed to email invoice"),
        }
    }
    tracing::info!(found = outcome.found, sent = outcome.sent, "Emailed invoice batch");
    Ok(outcome)
}

fn invoice_view_select() -> Select<Invoice> {
    Invoice::find()
        .select_only()
        .column(invoice::Column::Id)
        .column(invoice::Column::InvoiceNumber)
        .column(invoice::Column::IssuedAt)
        .column(invoice::Column::FilePath)
        .column(invoice::Column::EmailSent)
        .column(invoice::Column::PaymentId)
        .column_as(student::Column::StudentCode, "student_code")
        .column_as(user::Column::FullName, "student_name")
        .column_as(user::Column::Email, "student_email")
        .column_as(payment::Column::Amount, "amount")
        .column_as(payment::Column::OccurredAt, "payment_date")
        .column_as(payment::Column::TransactionRef, "transaction_ref")
        .column_as(payment_method::Column::Name, "payment_method_name")
        .column_as(payment::Column::Note, "note")
        .join(JoinType::InnerJoin, invoice::Relation::Payment.def())
        .join(JoinType::InnerJoin, payment::Relation::PaymentMethod.def())
        .join(JoinType::InnerJoin, payment::Relation::FeeAssessment.def())
        .join(JoinType::InnerJoin, fee_assessment::Relation::Student.def())
        .join(JoinType::InnerJoin, student::Relation::User.def())
}

/// Invoice detail joined with its payment and student.
pub async fn get_invoice_view(db: &DatabaseConnection, id: i32) -> Result<InvoiceView> {
    invoice_view_select()
        .filter(invoice::Column::Id.eq(id))
        .into_model::<InvoiceView>()
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Invoice", id))
}

/// Searches invoices, newest first.
pub async fn search_invoices(
    db: &DatabaseConnection,
    search: &InvoiceSearch,
    window: PageWindow,
) -> Result<Paged<InvoiceView>> {
    let mut query = invoice_view_select();
    if let Some(number) = search_term(search.invoice_number.as_deref()) {
        query = query.filter(invoice::Column::InvoiceNumber.contains(&number));
    }
    if let Some(code) = search_term(search.student_code.as_deref()) {
        query = query.filter(student::Column::StudentCode.contains(&code));
    }
    if let Some(reference) = search_term(search.transaction_id.as_deref()) {
        query = query.filter(payment::Column::TransactionRef.contains(&reference));
    }
    if let Some(sent) = search.email_sent {
        query = query.filter(invoice::Column::EmailSent.eq(sent));
    }
    let range = DateRange {
        start_date: search.start_date,
        end_date: search.end_date,
    };
    let query = query
        .filter(range.condition(invoice::Column::IssuedAt)?)
        .order_by_desc(invoice::Column::IssuedAt)
        .order_by_desc(invoice::Column::Id)
        .into_model::<InvoiceView>();
    fetch_page(db, query, window).await
}

/// Reads the stored document of an invoice.
///
/// Returns the invoice number (for naming the download) and the document bytes.
pub async fn download_invoice(
    db: &DatabaseConnection,
    documents: &dyn DocumentStore,
    id: i32,
) -> Result<(String, Vec<u8>)> {
    let found = get_invoice(db, id).await?;
    let bytes = documents.load(&found.file_path).await?;
    Ok((found.invoice_number, bytes))
}
