//! Department management.
//!
//! Departments are master data. A department cannot be deleted while classes, students or fee
//! structures still reference it; [`ensure_department_unused`] names whichever dependents block the
//! removal.

use crate::{
    entities::{Class, Department, FeeStructure, Student, class, department, fee_structure, student},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a department.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentInput {
    /// Display name
    pub name: String,
    /// Unique short code
    pub code: String,
}

impl DepartmentInput {
    fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        let code = self.code.trim().to_string();
        if name.is_empty() || code.is_empty() {
            return Err(Error::validation("Department name and code are required"));
        }
        Ok(Self { name, code })
    }
}

/// Creates a new department; a duplicate code is a conflict.
pub async fn create_department(
    db: &DatabaseConnection,
    input: DepartmentInput,
) -> Result<department::Model> {
    let input = input.validated()?;
    ensure_code_free(db, &input.code, None).await?;

    let created = department::ActiveModel {
        name: Set(input.name),
        code: Set(input.code),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(department_id = created.id, code = %created.code, "Created department");
    Ok(created)
}

/// Lists all departments ordered by name.
pub async fn list_departments(db: &DatabaseConnection) -> Result<Vec<department::Model>> {
    Department::find()
        .order_by_asc(department::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a department by id.
pub async fn get_department(db: &DatabaseConnection, id: i32) -> Result<department::Model> {
    Department::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Department", id))
}

/// Replaces the name and code of a department.
pub async fn update_department(
    db: &DatabaseConnection,
    id: i32,
    input: DepartmentInput,
) -> Result<department::Model> {
    let input = input.validated()?;
    let existing = get_department(db, id).await?;
    ensure_code_free(db, &input.code, Some(id)).await?;

    let mut active: department::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.code = Set(input.code);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a department that nothing references any more.
pub async fn delete_department(db: &DatabaseConnection, id: i32) -> Result<()> {
    get_department(db, id).await?;
    ensure_department_unused(db, id).await?;
    Department::delete_by_id(id).exec(db).await?;
    tracing::info!(department_id = id, "Deleted department");
    Ok(())
}

/// Fails with a conflict naming the dependents that still reference the department.
pub async fn ensure_department_unused(db: &DatabaseConnection, id: i32) -> Result<()> {
    let classes = Class::find()
        .filter(class::Column::DepartmentId.eq(id))
        .count(db)
        .await?;
    let students = Student::find()
        .filter(student::Column::DepartmentId.eq(id))
        .count(db)
        .await?;
    let structures = FeeStructure::find()
        .filter(fee_structure::Column::DepartmentId.eq(id))
        .count(db)
        .await?;

    let blockers: Vec<String> = [
        (classes, "classes"),
        (students, "students"),
        (structures, "fee structures"),
    ]
    .into_iter()
    .filter(|(count, _)| *count > 0)
    .map(|(count, label)| format!("{count} {label}"))
    .collect();

    if blockers.is_empty() {
        Ok(())
    } else {
        Err(Error::conflict(format!(
            "Department {id} is still referenced by {}",
            blockers.join(", ")
        )))
    }
}

async fn ensure_code_free(db: &DatabaseConnection, code: &str, except: Option<i32>) -> Result<()> {
    let mut query = Department::find().filter(department::Column::Code.eq(code));
    if let Some(id) = except {
        query = query.filter(department::Column::Id.ne(id));
    }
    if query.count(db).await? > 0 {
        return Err(Error::conflict(format!("Department code {code} already exists")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn input(name: &str, code: &str) -> DepartmentInput {
        DepartmentInput {
            name: name.to_string(),
            code: code.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list_departments() -> Result<()> {
        let db = setup_test_db().await?;
        create_department(&db, input("Physics", "PH")).await?;
        create_department(&db, input("Biology", "BI")).await?;

        let names: Vec<String> = list_departments(&db)
            .await?
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Biology", "Physics"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_code_is_conflict() -> Result<()> {
        let db = setup_test_db().await?;
        create_department(&db, input("Physics", "PH")).await?;
        let result = create_department(&db, input("Philosophy", "PH")).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_fields_rejected_without_touching_db() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_department(&db, input("  ", "PH")).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_update_keeps_own_code() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_department(&db, input("Physics", "PH")).await?;
        let updated = update_department(&db, dept.id, input("Applied Physics", "PH")).await?;
        assert_eq!(updated.name, "Applied Physics");
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_blocked_while_classes_exist() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        create_test_class(&db, dept.id, "CS-A").await?;

        let err = delete_department(&db, dept.id).await.unwrap_err();
        assert!(matches!(err, Error::Conflict { ref message } if message.contains("1 classes")));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_unused_department() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        delete_department(&db, dept.id).await?;
        assert!(matches!(
            get_department(&db, dept.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
