//! Class management. Every class belongs to exactly one department.

use crate::{
    entities::{Class, Department, Student, class, student},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a class.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    /// Display name
    pub name: String,
    /// Unique short code
    pub code: String,
    /// Owning department
    pub department_id: i32,
}

async fn validate(
    db: &DatabaseConnection,
    input: ClassInput,
    except: Option<i32>,
) -> Result<ClassInput> {
    let name = input.name.trim().to_string();
    let code = input.code.trim().to_string();
    if name.is_empty() || code.is_empty() {
        return Err(Error::validation("Class name and code are required"));
    }
    if Department::find_by_id(input.department_id).one(db).await?.is_none() {
        return Err(Error::not_found("Department", input.department_id));
    }
    let mut dup = Class::find().filter(class::Column::Code.eq(code.as_str()));
    if let Some(id) = except {
        dup = dup.filter(class::Column::Id.ne(id));
    }
    if dup.count(db).await? > 0 {
        return Err(Error::conflict(format!("Class code {code} already exists")));
    }
    Ok(ClassInput {
        name,
        code,
        department_id: input.department_id,
    })
}

/// Creates a class inside an existing department.
pub async fn create_class(db: &DatabaseConnection, input: ClassInput) -> Result<class::Model> {
    let input = validate(db, input, None).await?;
    let created = class::ActiveModel {
        name: Set(input.name),
        code: Set(input.code),
        department_id: Set(input.department_id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(class_id = created.id, department_id = created.department_id, "Created class");
    Ok(created)
}

/// Lists classes, optionally restricted to one department, ordered by code.
pub async fn list_classes(
    db: &DatabaseConnection,
    department_id: Option<i32>,
) -> Result<Vec<class::Model>> {
    let mut query = Class::find();
    if let Some(department_id) = department_id {
        query = query.filter(class::Column::DepartmentId.eq(department_id));
    }
    query
        .order_by_asc(class::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a class by id.
pub async fn get_class(db: &DatabaseConnection, id: i32) -> Result<class::Model> {
    Class::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Class", id))
}

/// Replaces every field of a class.
pub async fn update_class(
    db: &DatabaseConnection,
    id: i32,
    input: ClassInput,
) -> Result<class::Model> {
    let existing = get_class(db, id).await?;
    let input = validate(db, input, Some(id)).await?;
    if input.department_id != existing.department_id {
        ensure_class_unused(db, id).await?;
    }
    let mut active: class::ActiveModel = existing.into();
    active.name = Set(input.name);
    active.code = Set(input.code);
    active.department_id = Set(input.department_id);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a class no student is enrolled in.
pub async fn delete_class(db: &DatabaseConnection, id: i32) -> Result<()> {
    get_class(db, id).await?;
    ensure_class_unused(db, id).await?;
    Class::delete_by_id(id).exec(db).await?;
    tracing::info!(class_id = id, "Deleted class");
    Ok(())
}

/// Fails with a conflict while students are enrolled in the class.
pub async fn ensure_class_unused(db: &DatabaseConnection, id: i32) -> Result<()> {
    let students = Student::find()
        .filter(student::Column::ClassId.eq(id))
        .count(db)
        .await?;
    if students > 0 {
        return Err(Error::conflict(format!(
            "Class {id} is still referenced by {students} students"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_class_requires_existing_department() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_class(
            &db,
            ClassInput {
                name: "Section A".to_string(),
                code: "A".to_string(),
                department_id: 77,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_classes_by_department() -> Result<()> {
        let db = setup_test_db().await?;
        let cs = create_test_department(&db, "CS").await?;
        let ee = create_test_department(&db, "EE").await?;
        create_test_class(&db, cs.id, "CS-B").await?;
        create_test_class(&db, cs.id, "CS-A").await?;
        create_test_class(&db, ee.id, "EE-A").await?;

        let codes: Vec<String> = list_classes(&db, Some(cs.id))
            .await?
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(codes, vec!["CS-A", "CS-B"]);
        assert_eq!(list_classes(&db, None).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_blocked_while_students_enrolled() -> Result<()> {
        let (db, fx) = setup_with_assessment(100).await?;
        let result = delete_class(&db, fx.class.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }
}
