//! Semester management.

use crate::{
    entities::{FeeAssessment, FeeStructure, Semester, fee_assessment, fee_structure, semester},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a semester.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterInput {
    /// Display name
    pub name: String,
    /// First day
    pub start_date: NaiveDate,
    /// Last day, strictly after `start_date`
    pub end_date: NaiveDate,
    /// Academic year label
    pub academic_year: String,
    /// Whether billing is open
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl SemesterInput {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Semester name is required"));
        }
        if self.start_date >= self.end_date {
            return Err(Error::validation(format!(
                "Semester must start before it ends ({} >= {})",
                self.start_date, self.end_date
            )));
        }
        Ok(())
    }
}

/// Creates a semester.
pub async fn create_semester(
    db: &DatabaseConnection,
    input: SemesterInput,
) -> Result<semester::Model> {
    input.validate()?;
    let created = semester::ActiveModel {
        name: Set(input.name.trim().to_string()),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        academic_year: Set(input.academic_year),
        is_active: Set(input.is_active),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(semester_id = created.id, name = %created.name, "Created semester");
    Ok(created)
}

/// Lists semesters, most recent first.
pub async fn list_semesters(db: &DatabaseConnection) -> Result<Vec<semester::Model>> {
    Semester::find()
        .order_by_desc(semester::Column::StartDate)
        .order_by_desc(semester::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a semester by id.
pub async fn get_semester<C: ConnectionTrait>(db: &C, id: i32) -> Result<semester::Model> {
    Semester::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Semester", id))
}

/// Replaces every field of a semester.
pub async fn update_semester(
    db: &DatabaseConnection,
    id: i32,
    input: SemesterInput,
) -> Result<semester::Model> {
    input.validate()?;
    let mut active: semester::ActiveModel = get_semester(db, id).await?.into();
    active.name = Set(input.name.trim().to_string());
    active.start_date = Set(input.start_date);
    active.end_date = Set(input.end_date);
    active.academic_year = Set(input.academic_year);
    active.is_active = Set(input.is_active);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a semester with no assessments or fee structures.
pub async fn delete_semester(db: &DatabaseConnection, id: i32) -> Result<()> {
    get_semester(db, id).await?;
    ensure_semester_unused(db, id).await?;
    Semester::delete_by_id(id).exec(db).await?;
    tracing::info!(semester_id = id, "Deleted semester");
    Ok(())
}

/// Fails with a conflict while assessments or fee structures reference the semester.
pub async fn ensure_semester_unused(db: &DatabaseConnection, id: i32) -> Result<()> {
    let assessments = FeeAssessment::find()
        .filter(fee_assessment::Column::SemesterId.eq(id))
        .count(db)
        .await?;
    let structures = FeeStructure::find()
        .filter(fee_structure::Column::SemesterId.eq(id))
        .count(db)
        .await?;
    if assessments + structures > 0 {
        return Err(Error::conflict(format!(
            "Semester {id} is used by {assessments} fee assessments, {structures} fee structures"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn input(start: (i32, u32, u32), end: (i32, u32, u32)) -> SemesterInput {
        SemesterInput {
            name: "Spring".to_string(),
            start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
            end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            academic_year: "2025-2026".to_string(),
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_start_must_precede_end() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = create_semester(&db, input((2026, 6, 1), (2026, 1, 10))).await;
        assert!(matches!(result, Err(Error::Validation { .. })));
        let same_day = create_semester(&db, input((2026, 1, 10), (2026, 1, 10))).await;
        assert!(matches!(same_day, Err(Error::Validation { .. })));
    }

    #[tokio::test]
    async fn test_list_semesters_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let older = create_semester(&db, input((2025, 1, 10), (2025, 5, 30))).await?;
        let newer = create_semester(&db, input((2025, 9, 1), (2026, 1, 15))).await?;
        let ids: Vec<i32> = list_semesters(&db).await?.into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_blocked_while_assessed() -> Result<()> {
        let (db, fx) = setup_with_assessment(100).await?;
        let result = delete_semester(&db, fx.semester.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }
}
