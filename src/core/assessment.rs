//! Fee assessments: creation, editing, batch generation and read models.
//!
//! An assessment's `total_amount` is always the sum of its line items. Editing replaces the
//! whole set of line items, recomputes the total and reconciles the status in the same
//! transaction. Batch generation prices every matching student from the semester's fee
//! structures.

use crate::{
    core::{
        fee_structure::structures_for_semester,
        money::Money,
        paging::{PageWindow, Paged, fetch_page, search_term},
        payment::{PaymentView, payments_for_assessment},
        reconcile::{paid_amount, paid_amounts, reconcile_assessment},
        semester::get_semester,
        student::student_search_condition,
    },
    entities::{
        FeeAssessment, FeeCategory, FeeLineItem, FeeStatus, Payment, Student, class, department,
        fee_assessment, fee_category, fee_line_item, fee_structure, payment, semester, student,
        user,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{
    ConnectionTrait, FromQueryResult, JoinType, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One categorized charge in a create or edit request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemInput {
    /// Category of the charge
    pub fee_category_id: i32,
    /// Charge amount, not negative
    pub amount: Money,
}

/// Fields accepted when creating a single assessment.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssessment {
    /// Student being billed
    pub student_id: i32,
    /// Semester being billed
    pub semester_id: i32,
    /// Payment deadline
    pub due_date: NaiveDate,
    /// Charges making up the total; at least one
    pub line_items: Vec<LineItemInput>,
}

/// Fields accepted when editing an assessment. Line items are replaced wholesale.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssessment {
    /// New payment deadline
    pub due_date: NaiveDate,
    /// New set of charges; at least one
    pub line_items: Vec<LineItemInput>,
}

/// Parameters for [`generate_batch`].
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    /// Semester to bill
    pub semester_id: i32,
    /// Only students of this department
    pub department_id: Option<i32>,
    /// Only students of this class
    pub class_id: Option<i32>,
    /// Payment deadline for every generated assessment
    pub due_date: NaiveDate,
    /// Re-price students that already have an assessment for the semester
    #[serde(default)]
    pub overwrite_existing: bool,
}

/// Counts reported by [`generate_batch`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    /// Students matched by the filters
    pub total_students: usize,
    /// Assessments created
    pub created: usize,
    /// Existing assessments re-priced
    pub overwritten: usize,
    /// Students left untouched
    pub skipped: usize,
}

/// Filters for [`list_assessments`]. `semester_id` is required.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentFilter {
    /// Semester to list
    pub semester_id: Option<i32>,
    /// Only students of this department
    pub department_id: Option<i32>,
    /// Only students of this class
    pub class_id: Option<i32>,
    /// Only assessments in this state
    pub status: Option<FeeStatus>,
    /// Substring of student code, name or email
    pub search_query: Option<String>,
}

/// Flat assessment projection joined with student, department, class and semester.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRow {
    /// Assessment id
    pub id: i32,
    /// Student being billed
    pub student_id: i32,
    /// Student registry code
    pub student_code: String,
    /// Student full name
    pub student_name: String,
    /// Student email
    pub email: String,
    /// Student department
    pub department_id: i32,
    /// Student department name
    pub department_name: String,
    /// Student class
    pub class_id: i32,
    /// Student class name
    pub class_name: String,
    /// Semester being billed
    pub semester_id: i32,
    /// Semester name
    pub semester_name: String,
    /// Sum of line items
    pub total_amount: Money,
    /// Payment deadline
    pub due_date: NaiveDate,
    /// Reconciled status
    pub status: FeeStatus,
    /// Last line-item or status change
    pub last_updated: DateTimeUtc,
}

/// An [`AssessmentRow`] together with what has been paid so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentSummary {
    /// The assessment columns
    #[serde(flatten)]
    pub assessment: AssessmentRow,
    /// Sum of successful payments
    pub paid_amount: Money,
    /// Total still owed, never negative
    pub remaining_amount: Money,
}

impl AssessmentSummary {
    fn new(assessment: AssessmentRow, paid_amount: Money) -> Self {
        let remaining_amount = assessment.total_amount.saturating_remaining(paid_amount);
        Self {
            assessment,
            paid_amount,
            remaining_amount,
        }
    }
}

/// One line item with its category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    /// Line item id
    pub id: i32,
    /// Category charged
    pub fee_category_id: i32,
    /// Category name
    pub category_name: String,
    /// Charged amount
    pub amount: Money,
}

/// Full assessment detail: summary, line items and every payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDetail {
    /// Summary columns
    #[serde(flatten)]
    pub summary: AssessmentSummary,
    /// Categorized charges
    pub line_items: Vec<LineItemView>,
    /// Payments of any status, newest first
    pub payments: Vec<PaymentView>,
}

/// Checks the line items of a create/edit request and returns their total.
async fn validate_line_items<C: ConnectionTrait>(db: &C, items: &[LineItemInput]) -> Result<Money> {
    if items.is_empty() {
        return Err(Error::validation("At least one line item is required"));
    }
    if let Some(bad) = items.iter().find(|item| item.amount.is_negative()) {
        return Err(Error::InvalidAmount {
            amount: bad.amount.to_decimal(),
        });
    }

    let wanted: HashSet<i32> = items.iter().map(|item| item.fee_category_id).collect();
    let found: HashSet<i32> = FeeCategory::find()
        .filter(fee_category::Column::Id.is_in(wanted.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    if let Some(missing) = wanted.difference(&found).min() {
        return Err(Error::not_found("Fee category", missing));
    }

    Money::try_sum(items.iter().map(|item| item.amount))
}

async fn insert_line_items<C: ConnectionTrait>(
    db: &C,
    assessment_id: i32,
    items: &[LineItemInput],
) -> Result<()> {
    let rows: Vec<fee_line_item::ActiveModel> = items
        .iter()
        .map(|item| fee_line_item::ActiveModel {
            assessment_id: Set(assessment_id),
            fee_category_id: Set(item.fee_category_id),
            amount: Set(item.amount),
            ..Default::default()
        })
        .collect();
    FeeLineItem::insert_many(rows).exec(db).await?;
    Ok(())
}

/// Swaps the line items of an existing assessment, updates its total and due date, then
/// reconciles. Payments stay attached.
async fn reprice<C: ConnectionTrait>(
    db: &C,
    assessment: fee_assessment::Model,
    due_date: NaiveDate,
    items: &[LineItemInput],
    total: Money,
) -> Result<fee_assessment::Model> {
    let id = assessment.id;
    FeeLineItem::delete_many()
        .filter(fee_line_item::Column::AssessmentId.eq(id))
        .exec(db)
        .await?;
    insert_line_items(db, id, items).await?;

    let mut active: fee_assessment::ActiveModel = assessment.into();
    active.total_amount = Set(total);
    active.due_date = Set(due_date);
    active.update(db).await?;

    warn_if_zero_total(id, total);
    reconcile_assessment(db, id).await
}

fn warn_if_zero_total(assessment_id: i32, total: Money) {
    if total.is_zero() {
        tracing::warn!(assessment_id, "Fee assessment has a zero total");
    }
}

async fn find_for_student_semester<C: ConnectionTrait>(
    db: &C,
    student_id: i32,
    semester_id: i32,
) -> Result<Option<fee_assessment::Model>> {
    FeeAssessment::find()
        .filter(fee_assessment::Column::StudentId.eq(student_id))
        .filter(fee_assessment::Column::SemesterId.eq(semester_id))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn insert_assessment<C: ConnectionTrait>(
    db: &C,
    student_id: i32,
    semester_id: i32,
    due_date: NaiveDate,
    items: &[LineItemInput],
    total: Money,
) -> Result<fee_assessment::Model> {
    let now = chrono::Utc::now();
    let created = fee_assessment::ActiveModel {
        student_id: Set(student_id),
        semester_id: Set(semester_id),
        total_amount: Set(total),
        due_date: Set(due_date),
        status: Set(FeeStatus::Unpaid),
        created_at: Set(now),
        last_updated: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    insert_line_items(db, created.id, items).await?;
    warn_if_zero_total(created.id, total);
    Ok(created)
}

/// Creates one assessment from explicit line items.
///
/// The student and semester must exist, and the student must not already be assessed for the
/// semester.
pub async fn create_assessment(
    db: &DatabaseConnection,
    input: CreateAssessment,
) -> Result<fee_assessment::Model> {
    let txn = db.begin().await?;

    if Student::find_by_id(input.student_id).one(&txn).await?.is_none() {
        return Err(Error::not_found("Student", input.student_id));
    }
    get_semester(&txn, input.semester_id).await?;
    if find_for_student_semester(&txn, input.student_id, input.semester_id)
        .await?
        .is_some()
    {
        return Err(Error::conflict(format!(
            "Student {} already has a fee assessment for semester {}",
            input.student_id, input.semester_id
        )));
    }
    let total = validate_line_items(&txn, &input.line_items).await?;

    let created = insert_assessment(
        &txn,
        input.student_id,
        input.semester_id,
        input.due_date,
        &input.line_items,
        total,
    )
    .await?;
    txn.commit().await?;

    tracing::info!(
        assessment_id = created.id,
        student_id = created.student_id,
        semester_id = created.semester_id,
        total = %created.total_amount,
        "Created fee assessment"
    );
    Ok(created)
}

/// Replaces the due date and line items of an assessment and reconciles its status.
pub async fn update_assessment(
    db: &DatabaseConnection,
    id: i32,
    input: UpdateAssessment,
) -> Result<fee_assessment::Model> {
    let txn = db.begin().await?;
    let existing = FeeAssessment::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Fee assessment", id))?;
    let total = validate_line_items(&txn, &input.line_items).await?;
    let updated = reprice(&txn, existing, input.due_date, &input.line_items, total).await?;
    txn.commit().await?;

    tracing::info!(
        assessment_id = id,
        total = %updated.total_amount,
        status = ?updated.status,
        "Updated fee assessment"
    );
    Ok(updated)
}

/// Deletes an assessment and its line items. Blocked while any payment references it.
pub async fn delete_assessment(db: &DatabaseConnection, id: i32) -> Result<()> {
    let txn = db.begin().await?;
    if FeeAssessment::find_by_id(id).one(&txn).await?.is_none() {
        return Err(Error::not_found("Fee assessment", id));
    }
    let payments = Payment::find()
        .filter(payment::Column::AssessmentId.eq(id))
        .count(&txn)
        .await?;
    if payments > 0 {
        return Err(Error::conflict(format!(
            "Fee assessment {id} has {payments} payments and cannot be deleted"
        )));
    }
    FeeLineItem::delete_many()
        .filter(fee_line_item::Column::AssessmentId.eq(id))
        .exec(&txn)
        .await?;
    FeeAssessment::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(assessment_id = id, "Deleted fee assessment");
    Ok(())
}

/// Generates assessments for every matching student from the semester's fee structures.
///
/// Students whose department has no structure for the semester are skipped, as are students
/// already assessed unless `overwrite_existing` is set. The whole batch commits or fails as one.
pub async fn generate_batch(
    db: &DatabaseConnection,
    request: BatchRequest,
) -> Result<BatchOutcome> {
    let txn = db.begin().await?;
    get_semester(&txn, request.semester_id).await?;

    let mut students = Student::find();
    if let Some(department_id) = request.department_id {
        students = students.filter(student::Column::DepartmentId.eq(department_id));
    }
    if let Some(class_id) = request.class_id {
        students = students.filter(student::Column::ClassId.eq(class_id));
    }
    let students = students.order_by_asc(student::Column::Id).all(&txn).await?;
    if students.is_empty() {
        return Err(Error::NotFound {
            entity: "Students",
            id: "matching the batch filters".to_string(),
        });
    }

    let structures = structures_for_semester(&txn, request.semester_id).await?;
    if structures.is_empty() {
        return Err(Error::NotFound {
            entity: "Fee structures for semester",
            id: request.semester_id.to_string(),
        });
    }
    let mut by_department: HashMap<i32, Vec<LineItemInput>> = HashMap::new();
    for structure in &structures {
        by_department
            .entry(structure.department_id)
            .or_default()
            .push(line_item_from_structure(structure));
    }

    let mut outcome = BatchOutcome {
        total_students: students.len(),
        ..Default::default()
    };
    for s in &students {
        let Some(items) = by_department.get(&s.department_id) else {
            tracing::debug!(
                student_id = s.id,
                department_id = s.department_id,
                "No fee structures for department"
            );
            outcome.skipped += 1;
            continue;
        };
        let total = Money::try_sum(items.iter().map(|item| item.amount))?;

        match find_for_student_semester(&txn, s.id, request.semester_id).await? {
            Some(_) if !request.overwrite_existing => outcome.skipped += 1,
            Some(existing) => {
                reprice(&txn, existing, request.due_date, items, total).await?;
                outcome.overwritten += 1;
            }
            None => {
                insert_assessment(&txn, s.id, request.semester_id, request.due_date, items, total)
                    .await?;
                outcome.created += 1;
            }
        }
    }
    txn.commit().await?;

    tracing::info!(
        semester_id = request.semester_id,
        total_students = outcome.total_students,
        created = outcome.created,
        overwritten = outcome.overwritten,
        skipped = outcome.skipped,
        "Generated fee assessments"
    );
    Ok(outcome)
}

const fn line_item_from_structure(structure: &fee_structure::Model) -> LineItemInput {
    LineItemInput {
        fee_category_id: structure.fee_category_id,
        amount: structure.amount,
    }
}

fn assessment_row_select() -> Select<FeeAssessment> {
    FeeAssessment::find()
        .select_only()
        .column(fee_assessment::Column::Id)
        .column(fee_assessment::Column::StudentId)
        .column_as(student::Column::StudentCode, "student_code")
        .column_as(user::Column::FullName, "student_name")
        .column_as(user::Column::Email, "email")
        .column_as(student::Column::DepartmentId, "department_id")
        .column_as(department::Column::Name, "department_name")
        .column_as(student::Column::ClassId, "class_id")
        .column_as(class::Column::Name, "class_name")
        .column(fee_assessment::Column::SemesterId)
        .column_as(semester::Column::Name, "semester_name")
        .column(fee_assessment::Column::TotalAmount)
        .column(fee_assessment::Column::DueDate)
        .column(fee_assessment::Column::Status)
        .column(fee_assessment::Column::LastUpdated)
        .join(JoinType::InnerJoin, fee_assessment::Relation::Student.def())
        .join(JoinType::InnerJoin, student::Relation::User.def())
        .join(JoinType::InnerJoin, student::Relation::Department.def())
        .join(JoinType::InnerJoin, student::Relation::Class.def())
        .join(JoinType::InnerJoin, fee_assessment::Relation::Semester.def())
}

async fn summarize(
    db: &DatabaseConnection,
    rows: Vec<AssessmentRow>,
) -> Result<Vec<AssessmentSummary>> {
    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let paid = paid_amounts(db, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let paid = paid.get(&row.id).copied().unwrap_or_default();
            AssessmentSummary::new(row, paid)
        })
        .collect())
}

/// Lists the assessments of a semester, newest due date first.
pub async fn list_assessments(
    db: &DatabaseConnection,
    filter: &AssessmentFilter,
    window: PageWindow,
) -> Result<Paged<AssessmentSummary>> {
    let semester_id = filter
        .semester_id
        .ok_or_else(|| Error::validation("semesterId is required"))?;

    let mut query =
        assessment_row_select().filter(fee_assessment::Column::SemesterId.eq(semester_id));
    if let Some(department_id) = filter.department_id {
        query = query.filter(student::Column::DepartmentId.eq(department_id));
    }
    if let Some(class_id) = filter.class_id {
        query = query.filter(student::Column::ClassId.eq(class_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(fee_assessment::Column::Status.eq(status));
    }
    if let Some(term) = search_term(filter.search_query.as_deref()) {
        query = query.filter(student_search_condition(&term));
    }
    let query = query
        .order_by_desc(fee_assessment::Column::DueDate)
        .order_by_desc(fee_assessment::Column::Id)
        .into_model::<AssessmentRow>();

    let page = fetch_page(db, query, window).await?;
    let items = summarize(db, page.items).await?;
    Ok(Paged {
        items,
        total_count: page.total_count,
        page: page.page,
        page_size: page.page_size,
        total_pages: page.total_pages,
    })
}

/// Every assessment of one student, most recent semester first.
pub async fn student_assessments(
    db: &DatabaseConnection,
    student_id: i32,
) -> Result<Vec<AssessmentSummary>> {
    if Student::find_by_id(student_id).one(db).await?.is_none() {
        return Err(Error::not_found("Student", student_id));
    }
    let rows = assessment_row_select()
        .filter(fee_assessment::Column::StudentId.eq(student_id))
        .order_by_desc(semester::Column::EndDate)
        .order_by_desc(fee_assessment::Column::Id)
        .into_model::<AssessmentRow>()
        .all(db)
        .await?;
    summarize(db, rows).await
}

/// Assessment detail with line items and payments.
pub async fn get_assessment_detail(db: &DatabaseConnection, id: i32) -> Result<AssessmentDetail> {
    let row = assessment_row_select()
        .filter(fee_assessment::Column::Id.eq(id))
        .into_model::<AssessmentRow>()
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Fee assessment", id))?;

    let line_items = FeeLineItem::find()
        .select_only()
        .column(fee_line_item::Column::Id)
        .column(fee_line_item::Column::FeeCategoryId)
        .column_as(fee_category::Column::Name, "category_name")
        .column(fee_line_item::Column::Amount)
        .join(JoinType::InnerJoin, fee_line_item::Relation::FeeCategory.def())
        .filter(fee_line_item::Column::AssessmentId.eq(id))
        .order_by_asc(fee_line_item::Column::Id)
        .into_model::<LineItemView>()
        .all(db)
        .await?;

    let paid = paid_amount(db, id).await?;
    let payments = payments_for_assessment(db, id).await?;

    Ok(AssessmentDetail {
        summary: AssessmentSummary::new(row, paid),
        line_items,
        payments,
    })
}
