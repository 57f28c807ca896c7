//! Database connection and schema creation.
//!
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`, so the
//! schema always matches the Rust models. Uniqueness that spans several columns cannot be
//! expressed on an entity and is added here as separate indexes. Creation is idempotent and runs
//! on every startup.

use crate::entities::{
    Class, Counter, Department, FeeAssessment, FeeCategory, FeeLineItem, FeeStructure, Invoice,
    Notification, Payment, PaymentMethod, Semester, Student, User, fee_assessment, fee_structure,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

/// Connects to the database at `url`.
pub async fn connect(url: &str) -> Result<DatabaseConnection> {
    let db = Database::connect(url).await?;
    tracing::info!(url, "Connected to database");
    Ok(db)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

fn composite_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("ux_fee_assessments_student_semester")
            .table(FeeAssessment)
            .col(fee_assessment::Column::StudentId)
            .col(fee_assessment::Column::SemesterId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("ux_fee_structures_department_semester_category")
            .table(FeeStructure)
            .col(fee_structure::Column::DepartmentId)
            .col(fee_structure::Column::SemesterId)
            .col(fee_structure::Column::FeeCategoryId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates every table and index the portal needs, skipping those that already exist.
///
/// Tables are created parents first so foreign keys resolve.
pub async fn create_tables<C: ConnectionTrait>(db: &C) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Department).await?;
    create_table(db, &schema, Class).await?;
    create_table(db, &schema, Semester).await?;
    create_table(db, &schema, FeeCategory).await?;
    create_table(db, &schema, PaymentMethod).await?;
    create_table(db, &schema, User).await?;
    create_table(db, &schema, Student).await?;
    create_table(db, &schema, FeeStructure).await?;
    create_table(db, &schema, FeeAssessment).await?;
    create_table(db, &schema, FeeLineItem).await?;
    create_table(db, &schema, Payment).await?;
    create_table(db, &schema, Invoice).await?;
    create_table(db, &schema, Notification).await?;
    create_table(db, &schema, Counter).await?;

    for index in composite_indexes() {
        db.execute(builder.build(&index)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::errors::Error;
    use crate::test_utils::*;
    use sea_orm::{ActiveModelTrait, QuerySelect, Set};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        let _ = Department::find().limit(1).all(&db).await?;
        let _ = Payment::find().limit(1).all(&db).await?;
        let _ = Invoice::find().limit(1).all(&db).await?;
        let _ = Counter::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_assessment_rejected_by_index() -> Result<()> {
        let (db, fx) = setup_with_assessment(100).await?;
        let now = chrono::Utc::now();
        let duplicate = fee_assessment::ActiveModel {
            student_id: Set(fx.student.id),
            semester_id: Set(fx.semester.id),
            total_amount: Set(fx.assessment.total_amount),
            due_date: Set(fx.assessment.due_date),
            status: Set(fx.assessment.status),
            created_at: Set(now),
            last_updated: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .map_err(Error::from);
        assert!(matches!(duplicate, Err(Error::Conflict { .. })));
        Ok(())
    }
}
