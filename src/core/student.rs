//! Student registration and the student read model.
//!
//! Registering a student creates the login account and the enrollment record together. The
//! listing projection is flattened (code, name, department, class) so handlers never serialize
//! entity graphs directly.

use crate::{
    core::{
        notify::Notifier,
        paging::{PageWindow, Paged, fetch_page, search_term},
    },
    entities::{
        Class, Department, FeeAssessment, Notification, Student, User, UserRole, class, department,
        fee_assessment, notification, student, user,
    },
    errors::{Error, Result},
};
use sea_orm::{
    Condition, FromQueryResult, JoinType, QueryOrder, QuerySelect, Set, TransactionTrait,
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Fields accepted when registering a student.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStudent {
    /// Login and contact address
    pub email: String,
    /// Name shown on statements
    pub full_name: String,
    /// Optional phone number
    pub phone: Option<String>,
    /// Unique registry code
    pub student_code: String,
    /// Department to enroll in
    pub department_id: i32,
    /// Class inside `department_id`
    pub class_id: i32,
    /// Year of first enrollment
    pub enrollment_year: i32,
    /// Current semester ordinal, if tracked
    pub current_semester: Option<i32>,
}

/// Fields an administrator may change on an existing student.
///
/// Absent or blank values leave the stored value alone.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudent {
    /// New login address, lowercased
    pub email: Option<String>,
    /// New display name
    pub full_name: Option<String>,
    /// New phone number
    #[serde(alias = "phoneNumber")]
    pub phone: Option<String>,
    /// New registry code
    pub student_code: Option<String>,
    /// Department to move to
    pub department_id: Option<i32>,
    /// Must belong to the resulting department
    pub class_id: Option<i32>,
    /// Corrected enrollment year
    pub enrollment_year: Option<i32>,
    /// Current semester ordinal
    pub current_semester: Option<i32>,
    /// Deactivated accounts keep their records
    pub is_active: Option<bool>,
}

/// Flat student projection used by listings and detail views.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    /// Student id
    pub id: i32,
    /// Owning user account
    pub user_id: i32,
    /// Registry code
    pub student_code: String,
    /// Account full name
    pub full_name: String,
    /// Account email
    pub email: String,
    /// Account phone
    pub phone: Option<String>,
    /// Enrolled department
    pub department_id: i32,
    /// Enrolled department name
    pub department_name: String,
    /// Enrolled class
    pub class_id: i32,
    /// Enrolled class name
    pub class_name: String,
    /// Year of first enrollment
    pub enrollment_year: i32,
    /// Current semester ordinal
    pub current_semester: Option<i32>,
}

/// Filters for [`list_students`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentFilter {
    /// Only students in this department
    pub department_id: Option<i32>,
    /// Only students in this class
    pub class_id: Option<i32>,
    /// Substring of student code, name or email
    pub search_query: Option<String>,
}

/// Registers a user account and its student record in one transaction.
///
/// The class must belong to the chosen department. A duplicate email or student code is a
/// conflict. After commit a welcome message goes out through `notifier`; a delivery failure is
/// logged and does not undo the registration.
pub async fn register_student(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    input: RegisterStudent,
) -> Result<StudentView> {
    let email = input.email.trim().to_lowercase();
    let full_name = input.full_name.trim().to_string();
    let student_code = input.student_code.trim().to_string();
    if !email.contains('@') {
        return Err(Error::validation(format!("Invalid email address: {email:?}")));
    }
    if full_name.is_empty() || student_code.is_empty() {
        return Err(Error::validation("Full name and student code are required"));
    }

    let txn = db.begin().await?;

    if Department::find_by_id(input.department_id).one(&txn).await?.is_none() {
        return Err(Error::not_found("Department", input.department_id));
    }
    let class = Class::find_by_id(input.class_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Class", input.class_id))?;
    if class.department_id != input.department_id {
        return Err(Error::validation(format!(
            "Class {} does not belong to department {}",
            class.id, input.department_id
        )));
    }
    if User::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .count(&txn)
        .await?
        > 0
    {
        return Err(Error::conflict(format!("Email {email} is already registered")));
    }
    if Student::find()
        .filter(student::Column::StudentCode.eq(student_code.as_str()))
        .count(&txn)
        .await?
        > 0
    {
        return Err(Error::conflict(format!("Student code {student_code} already exists")));
    }

    let account = user::ActiveModel {
        email: Set(email),
        full_name: Set(full_name),
        phone: Set(input.phone),
        role: Set(UserRole::Student),
        is_active: Set(true),
        registered_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let created = student::ActiveModel {
        user_id: Set(account.id),
        student_code: Set(student_code),
        department_id: Set(input.department_id),
        class_id: Set(input.class_id),
        enrollment_year: Set(input.enrollment_year),
        current_semester: Set(input.current_semester),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(
        student_id = created.id,
        user_id = account.id,
        student_code = %created.student_code,
        "Registered student"
    );

    let body = format!(
        "Hello {}, your student account {} has been registered.",
        account.full_name, created.student_code
    );
    if let Err(e) = notifier
        .send(&account.email, "Account registered", &body)
        .await
    {
        tracing::warn!(user_id = account.id, error = %e, "Failed to send registration message");
    }

    get_student(db, created.id).await
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Applies an [`UpdateStudent`] to the student and its account in one transaction.
///
/// A new email or student code must not belong to anyone else. When the department or class
/// changes, the class must belong to the resulting department.
pub async fn update_student(
    db: &DatabaseConnection,
    id: i32,
    input: UpdateStudent,
) -> Result<StudentView> {
    let txn = db.begin().await?;

    let existing = Student::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Student", id))?;
    let account = User::find_by_id(existing.user_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("User", existing.user_id))?;

    let email = non_blank(input.email.as_deref()).map(str::to_lowercase);
    if let Some(email) = &email {
        if !email.contains('@') {
            return Err(Error::validation(format!("Invalid email address: {email:?}")));
        }
        let taken = User::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .filter(user::Column::Id.ne(account.id))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(Error::conflict(format!("Email {email} is already registered")));
        }
    }
    let student_code = non_blank(input.student_code.as_deref()).map(ToOwned::to_owned);
    if let Some(code) = &student_code {
        let taken = Student::find()
            .filter(student::Column::StudentCode.eq(code.as_str()))
            .filter(student::Column::Id.ne(id))
            .count(&txn)
            .await?;
        if taken > 0 {
            return Err(Error::conflict(format!("Student code {code} already exists")));
        }
    }

    let department_id = input.department_id.unwrap_or(existing.department_id);
    let class_id = input.class_id.unwrap_or(existing.class_id);
    if department_id != existing.department_id || class_id != existing.class_id {
        if Department::find_by_id(department_id).one(&txn).await?.is_none() {
            return Err(Error::not_found("Department", department_id));
        }
        let class = Class::find_by_id(class_id)
            .one(&txn)
            .await?
            .ok_or_else(|| Error::not_found("Class", class_id))?;
        if class.department_id != department_id {
            return Err(Error::validation(format!(
                "Class {class_id} does not belong to department {department_id}"
            )));
        }
    }

    let mut profile: user::ActiveModel = account.into();
    if let Some(email) = email {
        profile.email = Set(email);
    }
    if let Some(name) = non_blank(input.full_name.as_deref()) {
        profile.full_name = Set(name.to_string());
    }
    if let Some(phone) = non_blank(input.phone.as_deref()) {
        profile.phone = Set(Some(phone.to_string()));
    }
    if let Some(is_active) = input.is_active {
        profile.is_active = Set(is_active);
    }
    if profile.is_changed() {
        profile.update(&txn).await?;
    }

    let mut record: student::ActiveModel = existing.into();
    if let Some(code) = student_code {
        record.student_code = Set(code);
    }
    record.department_id = Set(department_id);
    record.class_id = Set(class_id);
    if let Some(year) = input.enrollment_year {
        record.enrollment_year = Set(year);
    }
    if let Some(semester) = input.current_semester {
        record.current_semester = Set(Some(semester));
    }
    record.update(&txn).await?;

    txn.commit().await?;
    tracing::info!(student_id = id, "Updated student");
    get_student(db, id).await
}

/// Removes a student together with its login account and notifications.
///
/// Refused with a conflict while any fee assessment exists for the student, so payment history
/// is never orphaned.
pub async fn delete_student(db: &DatabaseConnection, id: i32) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Student::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Student", id))?;
    let assessments = FeeAssessment::find()
        .filter(fee_assessment::Column::StudentId.eq(id))
        .count(&txn)
        .await?;
    if assessments > 0 {
        return Err(Error::conflict(format!(
            "Student {id} is still referenced by {assessments} fee assessments"
        )));
    }

    Notification::delete_many()
        .filter(notification::Column::UserId.eq(existing.user_id))
        .exec(&txn)
        .await?;
    Student::delete_by_id(id).exec(&txn).await?;
    User::delete_by_id(existing.user_id).exec(&txn).await?;

    txn.commit().await?;
    tracing::info!(
        student_id = id,
        user_id = existing.user_id,
        student_code = %existing.student_code,
        "Deleted student"
    );
    Ok(())
}

fn student_view_select() -> Select<Student> {
    Student::find()
        .select_only()
        .column(student::Column::Id)
        .column(student::Column::UserId)
        .column(student::Column::StudentCode)
        .column_as(user::Column::FullName, "full_name")
        .column_as(user::Column::Email, "email")
        .column_as(user::Column::Phone, "phone")
        .column(student::Column::DepartmentId)
        .column_as(department::Column::Name, "department_name")
        .column(student::Column::ClassId)
        .column_as(class::Column::Name, "class_name")
        .column(student::Column::EnrollmentYear)
        .column(student::Column::CurrentSemester)
        .join(JoinType::InnerJoin, student::Relation::User.def())
        .join(JoinType::InnerJoin, student::Relation::Department.def())
        .join(JoinType::InnerJoin, student::Relation::Class.def())
}

/// Retrieves one student's flat projection.
pub async fn get_student(db: &DatabaseConnection, id: i32) -> Result<StudentView> {
    student_view_select()
        .filter(student::Column::Id.eq(id))
        .into_model::<StudentView>()
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student", id))
}

/// Lists students by code, filtered and paginated.
pub async fn list_students(
    db: &DatabaseConnection,
    filter: &StudentFilter,
    window: PageWindow,
) -> Result<Paged<StudentView>> {
    let mut query = student_view_select();
    if let Some(department_id) = filter.department_id {
        query = query.filter(student::Column::DepartmentId.eq(department_id));
    }
    if let Some(class_id) = filter.class_id {
        query = query.filter(student::Column::ClassId.eq(class_id));
    }
    if let Some(term) = search_term(filter.search_query.as_deref()) {
        query = query.filter(student_search_condition(&term));
    }
    let query = query
        .order_by_asc(student::Column::StudentCode)
        .order_by_asc(student::Column::Id)
        .into_model::<StudentView>();
    fetch_page(db, query, window).await
}

/// Substring match over student code, full name and email. Requires the user join.
pub(crate) fn student_search_condition(term: &str) -> Condition {
    Condition::any()
        .add(student::Column::StudentCode.contains(term))
        .add(user::Column::FullName.contains(term))
        .add(user::Column::Email.contains(term))
}

/// Resolves the student record owned by a user account.
pub async fn find_student_by_user(db: &DatabaseConnection, user_id: i32) -> Result<student::Model> {
    Student::find()
        .filter(student::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Student for user", user_id))
}

/// Retrieves a user account by id.
pub async fn get_user(db: &DatabaseConnection, id: i32) -> Result<user::Model> {
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", id))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::paging::PageWindow;
    use crate::test_utils::*;

    fn registration(code: &str, email: &str, department_id: i32, class_id: i32) -> RegisterStudent {
        RegisterStudent {
            email: email.to_string(),
            full_name: format!("Student {code}"),
            phone: None,
            student_code: code.to_string(),
            department_id,
            class_id,
            enrollment_year: 2025,
            current_semester: Some(1),
        }
    }

    #[tokio::test]
    async fn test_register_student_creates_account_and_notifies() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        let class = create_test_class(&db, dept.id, "CS-A").await?;
        let notifier = RecordingNotifier::default();

        let view = register_student(
            &db,
            &notifier,
            registration("CS001", "Ada@Example.edu", dept.id, class.id),
        )
        .await?;

        assert_eq!(view.email, "ada@example.edu");
        assert_eq!(view.department_name, "Department CS");
        assert_eq!(view.class_name, "Class CS-A");
        let account = get_user(&db, view.user_id).await?;
        assert_eq!(account.role, UserRole::Student);
        assert_eq!(notifier.sent_to(), vec!["ada@example.edu".to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_register_rejects_class_from_other_department() -> Result<()> {
        let db = setup_test_db().await?;
        let cs = create_test_department(&db, "CS").await?;
        let ee = create_test_department(&db, "EE").await?;
        let ee_class = create_test_class(&db, ee.id, "EE-A").await?;

        let result = register_student(
            &db,
            &RecordingNotifier::default(),
            registration("CS001", "a@example.edu", cs.id, ee_class.id),
        )
        .await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        let class = create_test_class(&db, dept.id, "CS-A").await?;
        let notifier = RecordingNotifier::default();
        register_student(&db, &notifier, registration("CS001", "a@example.edu", dept.id, class.id))
            .await?;

        let result = register_student(
            &db,
            &notifier,
            registration("CS002", "a@example.edu", dept.id, class.id),
        )
        .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_update_student_moves_class_and_renames() -> Result<()> {
        let db = setup_test_db().await?;
        let cs = create_test_department(&db, "CS").await?;
        let a = create_test_class(&db, cs.id, "CS-A").await?;
        let b = create_test_class(&db, cs.id, "CS-B").await?;
        let created = create_test_student(&db, "CS001", cs.id, a.id).await?;

        let view = update_student(
            &db,
            created.id,
            UpdateStudent {
                full_name: Some("Ada Lovelace".to_string()),
                email: Some("  ".to_string()),
                class_id: Some(b.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(view.full_name, "Ada Lovelace");
        assert_eq!(view.email, "cs001@example.edu");
        assert_eq!(view.class_name, "Class CS-B");
        assert_eq!(view.student_code, "CS001");
        Ok(())
    }

    #[tokio::test]
    async fn test_update_student_rejects_taken_code_and_foreign_class() -> Result<()> {
        let db = setup_test_db().await?;
        let cs = create_test_department(&db, "CS").await?;
        let ee = create_test_department(&db, "EE").await?;
        let cs_a = create_test_class(&db, cs.id, "CS-A").await?;
        let ee_a = create_test_class(&db, ee.id, "EE-A").await?;
        let first = create_test_student(&db, "CS001", cs.id, cs_a.id).await?;
        create_test_student(&db, "CS002", cs.id, cs_a.id).await?;

        let taken = update_student(
            &db,
            first.id,
            UpdateStudent {
                student_code: Some("CS002".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(taken, Err(Error::Conflict { .. })));

        let own_code = update_student(
            &db,
            first.id,
            UpdateStudent {
                student_code: Some("CS001".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert!(own_code.is_ok());

        let foreign = update_student(
            &db,
            first.id,
            UpdateStudent {
                class_id: Some(ee_a.id),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(foreign, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_student_blocked_by_assessments() -> Result<()> {
        let (db, fx) = setup_with_assessment(1_000).await?;
        let result = delete_student(&db, fx.student.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        assert!(get_student(&db, fx.student.id).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_student_removes_account() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        let class = create_test_class(&db, dept.id, "CS-A").await?;
        let created = create_test_student(&db, "CS001", dept.id, class.id).await?;

        delete_student(&db, created.id).await?;
        assert!(matches!(
            get_student(&db, created.id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            get_user(&db, created.user_id).await,
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            delete_student(&db, created.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_students_filters_and_searches() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        let a = create_test_class(&db, dept.id, "CS-A").await?;
        let b = create_test_class(&db, dept.id, "CS-B").await?;
        create_test_student(&db, "CS001", dept.id, a.id).await?;
        create_test_student(&db, "CS002", dept.id, a.id).await?;
        create_test_student(&db, "CS003", dept.id, b.id).await?;

        let window = PageWindow { page: 1, page_size: 10 };
        let in_a = list_students(
            &db,
            &StudentFilter {
                class_id: Some(a.id),
                ..Default::default()
            },
            window,
        )
        .await?;
        assert_eq!(in_a.total_count, 2);

        let searched = list_students(
            &db,
            &StudentFilter {
                search_query: Some(" cs003 ".to_string()),
                ..Default::default()
            },
            window,
        )
        .await?;
        assert_eq!(searched.items.len(), 1);
        assert_eq!(searched.items[0].student_code, "CS003");
        Ok(())
    }
}
