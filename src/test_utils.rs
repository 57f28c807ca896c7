//! Shared test utilities for the tuition portal.
//!
//! This module provides helpers for setting up in-memory test databases and creating reference
//! data, students, assessments and payments with sensible defaults.

use crate::{
    core::{
        assessment::{self, CreateAssessment, LineItemInput},
        catalog::{self, CatalogInput},
        class::{self, ClassInput},
        department::{self, DepartmentInput},
        fee_structure::{self, FeeStructureInput},
        money::Money,
        notify::Notifier,
        payment::{self, RecordPayment},
        reconcile::{paid_amount, reconcile},
        semester::{self, SemesterInput},
        student::{self, RegisterStudent},
    },
    entities::{
        self, FeeAssessment, FeeLineItem, Payment, PaymentStatus, Student, fee_line_item,
    },
    errors::{Error, Result},
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    Set,
};
use std::sync::Mutex;

/// Routes log output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Default due date for test assessments, inside the default test semester.
#[must_use]
pub fn test_due_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 15).unwrap_or_default()
}

/// Creates a department named `"Department {code}"`.
pub async fn create_test_department(
    db: &DatabaseConnection,
    code: &str,
) -> Result<entities::department::Model> {
    department::create_department(
        db,
        DepartmentInput {
            name: format!("Department {code}"),
            code: code.to_string(),
        },
    )
    .await
}

/// Creates a class named `"Class {code}"` in a department.
pub async fn create_test_class(
    db: &DatabaseConnection,
    department_id: i32,
    code: &str,
) -> Result<entities::class::Model> {
    class::create_class(
        db,
        ClassInput {
            name: format!("Class {code}"),
            code: code.to_string(),
            department_id,
        },
    )
    .await
}

/// Creates an active semester running from 2025-09-01 to 2026-01-15.
pub async fn create_test_semester(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::semester::Model> {
    create_test_semester_between(
        db,
        name,
        NaiveDate::from_ymd_opt(2025, 9, 1).unwrap_or_default(),
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap_or_default(),
    )
    .await
}

/// Creates an active semester with explicit dates.
pub async fn create_test_semester_between(
    db: &DatabaseConnection,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<entities::semester::Model> {
    semester::create_semester(
        db,
        SemesterInput {
            name: name.to_string(),
            start_date,
            end_date,
            academic_year: "2025-2026".to_string(),
            is_active: true,
        },
    )
    .await
}

/// Creates an active fee category.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::fee_category::Model> {
    catalog::create_fee_category(
        db,
        CatalogInput {
            name: name.to_string(),
            description: None,
            is_active: true,
        },
    )
    .await
}

/// Creates an active payment method.
pub async fn create_test_method(
    db: &DatabaseConnection,
    name: &str,
) -> Result<entities::payment_method::Model> {
    catalog::create_payment_method(
        db,
        CatalogInput {
            name: name.to_string(),
            description: None,
            is_active: true,
        },
    )
    .await
}

/// Registers a student with code `code`.
///
/// # Defaults
/// * email: lowercased code at `example.edu`
/// * `full_name`: `"Student {code}"`
/// * `enrollment_year`: 2024
pub async fn create_test_student(
    db: &DatabaseConnection,
    code: &str,
    department_id: i32,
    class_id: i32,
) -> Result<entities::student::Model> {
    let view = student::register_student(
        db,
        &RecordingNotifier::default(),
        RegisterStudent {
            email: format!("{}@example.edu", code.to_lowercase()),
            full_name: format!("Student {code}"),
            phone: None,
            student_code: code.to_string(),
            department_id,
            class_id,
            enrollment_year: 2024,
            current_semester: Some(1),
        },
    )
    .await?;
    Student::find_by_id(view.id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", view.id))
}

/// Creates a fee structure charging `major` whole units.
pub async fn create_test_structure(
    db: &DatabaseConnection,
    department_id: i32,
    semester_id: i32,
    fee_category_id: i32,
    major: i64,
) -> Result<entities::fee_structure::Model> {
    fee_structure::create_fee_structure(
        db,
        FeeStructureInput {
            department_id,
            semester_id,
            fee_category_id,
            amount: Money::from_major(major),
            per_credit: false,
        },
    )
    .await
}

/// Creates an assessment with a single line item of `major` whole units.
pub async fn create_test_assessment(
    db: &DatabaseConnection,
    student_id: i32,
    semester_id: i32,
    fee_category_id: i32,
    major: i64,
) -> Result<entities::fee_assessment::Model> {
    assessment::create_assessment(
        db,
        CreateAssessment {
            student_id,
            semester_id,
            due_date: test_due_date(),
            line_items: vec![LineItemInput {
                fee_category_id,
                amount: Money::from_major(major),
            }],
        },
    )
    .await
}

/// Everything needed to record payments against one assessment.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub department: entities::department::Model,
    pub class: entities::class::Model,
    pub semester: entities::semester::Model,
    /// "Tuition"
    pub category: entities::fee_category::Model,
    /// "Cash"
    pub method: entities::payment_method::Model,
    pub student: entities::student::Model,
    pub assessment: entities::fee_assessment::Model,
}

/// Sets up a complete test environment with one student assessed `total_major` whole units.
/// Returns (db, fixture) for payment and invoice scenarios.
pub async fn setup_with_assessment(total_major: i64) -> Result<(DatabaseConnection, Fixture)> {
    let db = setup_test_db().await?;
    let department = create_test_department(&db, "CS").await?;
    let class = create_test_class(&db, department.id, "CS-A").await?;
    let semester = create_test_semester(&db, "Fall 2025").await?;
    let category = create_test_category(&db, "Tuition").await?;
    let method = create_test_method(&db, "Cash").await?;
    let student = create_test_student(&db, "CS001", department.id, class.id).await?;
    let assessment =
        create_test_assessment(&db, student.id, semester.id, category.id, total_major).await?;
    Ok((
        db,
        Fixture {
            department,
            class,
            semester,
            category,
            method,
            student,
            assessment,
        },
    ))
}

async fn next_transaction_ref(db: &DatabaseConnection) -> Result<String> {
    Ok(format!("TX-{:05}", Payment::find().count(db).await? + 1))
}

/// Inserts a payment row directly, without reconciling the assessment.
pub async fn insert_raw_payment(
    db: &DatabaseConnection,
    fx: &Fixture,
    major: i64,
    status: PaymentStatus,
) -> Result<entities::payment::Model> {
    entities::payment::ActiveModel {
        assessment_id: Set(fx.assessment.id),
        payment_method_id: Set(fx.method.id),
        amount: Set(Money::from_major(major)),
        transaction_ref: Set(next_transaction_ref(db).await?),
        occurred_at: Set(chrono::Utc::now()),
        status: Set(status),
        note: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Records a payment through the ledger, reconciling the assessment.
pub async fn record_test_payment(
    db: &DatabaseConnection,
    fx: &Fixture,
    major: i64,
    status: Option<PaymentStatus>,
) -> Result<entities::payment::Model> {
    payment::record_payment(
        db,
        RecordPayment {
            assessment_id: fx.assessment.id,
            payment_method_id: fx.method.id,
            amount: Money::from_major(major),
            transaction_ref: next_transaction_ref(db).await?,
            note: None,
            status,
        },
    )
    .await
}

/// Asserts that the stored total equals its line items and the stored status equals the
/// reconciled one.
pub async fn assert_status_consistent(db: &DatabaseConnection, assessment_id: i32) -> Result<()> {
    let stored = FeeAssessment::find_by_id(assessment_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Fee assessment", assessment_id))?;
    let items = FeeLineItem::find()
        .filter(fee_line_item::Column::AssessmentId.eq(assessment_id))
        .all(db)
        .await?;
    let line_total = Money::try_sum(items.iter().map(|i| i.amount))?;
    assert_eq!(stored.total_amount, line_total, "total out of sync with line items");

    let paid = paid_amount(db, assessment_id).await?;
    assert_eq!(
        stored.status,
        reconcile(stored.total_amount, paid),
        "stored status disagrees with paid {paid} of {}",
        stored.total_amount
    );
    Ok(())
}

/// Notifier that remembers every recipient instead of sending.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    /// Recipients in send order.
    pub fn sent_to(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|(to, _)| to.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, subject: &str, _body: &str) -> Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipient.to_string(), subject.to_string()));
        }
        Ok(())
    }
}
