//! Fee structure configuration.
//!
//! A structure prices one fee category for one department in one semester. Batch assessment
//! generation reads the structures of a semester and copies them into line items.

use crate::{
    core::{catalog::get_fee_category, money::Money, semester::get_semester},
    entities::{Department, FeeStructure, fee_structure},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a fee structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureInput {
    /// Department being charged
    pub department_id: i32,
    /// Semester being charged
    pub semester_id: i32,
    /// Category of the charge
    pub fee_category_id: i32,
    /// Charge amount, not negative
    pub amount: Money,
    /// Informational per-credit flag
    #[serde(default)]
    pub per_credit: bool,
}

/// Filters for [`list_fee_structures`].
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureFilter {
    /// Only this department
    pub department_id: Option<i32>,
    /// Only this semester
    pub semester_id: Option<i32>,
}

async fn validate(
    db: &DatabaseConnection,
    input: &FeeStructureInput,
    except: Option<i32>,
) -> Result<()> {
    if input.amount.is_negative() {
        return Err(Error::InvalidAmount {
            amount: input.amount.to_decimal(),
        });
    }
    if Department::find_by_id(input.department_id).one(db).await?.is_none() {
        return Err(Error::not_found("Department", input.department_id));
    }
    get_semester(db, input.semester_id).await?;
    get_fee_category(db, input.fee_category_id).await?;

    let mut dup = FeeStructure::find()
        .filter(fee_structure::Column::DepartmentId.eq(input.department_id))
        .filter(fee_structure::Column::SemesterId.eq(input.semester_id))
        .filter(fee_structure::Column::FeeCategoryId.eq(input.fee_category_id));
    if let Some(id) = except {
        dup = dup.filter(fee_structure::Column::Id.ne(id));
    }
    if dup.count(db).await? > 0 {
        return Err(Error::conflict(format!(
            "A fee structure already exists for department {}, semester {}, category {}",
            input.department_id, input.semester_id, input.fee_category_id
        )));
    }
    Ok(())
}

/// Creates a fee structure.
pub async fn create_fee_structure(
    db: &DatabaseConnection,
    input: FeeStructureInput,
) -> Result<fee_structure::Model> {
    validate(db, &input, None).await?;
    let now = chrono::Utc::now();
    let created = fee_structure::ActiveModel {
        department_id: Set(input.department_id),
        semester_id: Set(input.semester_id),
        fee_category_id: Set(input.fee_category_id),
        amount: Set(input.amount),
        per_credit: Set(input.per_credit),
        created_at: Set(now),
        last_updated: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(
        fee_structure_id = created.id,
        department_id = created.department_id,
        semester_id = created.semester_id,
        amount = %created.amount,
        "Created fee structure"
    );
    Ok(created)
}

/// Lists fee structures, optionally filtered.
pub async fn list_fee_structures(
    db: &DatabaseConnection,
    filter: FeeStructureFilter,
) -> Result<Vec<fee_structure::Model>> {
    let mut query = FeeStructure::find();
    if let Some(department_id) = filter.department_id {
        query = query.filter(fee_structure::Column::DepartmentId.eq(department_id));
    }
    if let Some(semester_id) = filter.semester_id {
        query = query.filter(fee_structure::Column::SemesterId.eq(semester_id));
    }
    query
        .order_by_asc(fee_structure::Column::DepartmentId)
        .order_by_asc(fee_structure::Column::FeeCategoryId)
        .order_by_asc(fee_structure::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// All structures priced for a semester.
pub async fn structures_for_semester<C: ConnectionTrait>(
    db: &C,
    semester_id: i32,
) -> Result<Vec<fee_structure::Model>> {
    FeeStructure::find()
        .filter(fee_structure::Column::SemesterId.eq(semester_id))
        .order_by_asc(fee_structure::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a fee structure by id.
pub async fn get_fee_structure(db: &DatabaseConnection, id: i32) -> Result<fee_structure::Model> {
    FeeStructure::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Fee structure", id))
}

/// Replaces every field of a fee structure.
///
/// Existing assessments keep the line items they were generated with.
pub async fn update_fee_structure(
    db: &DatabaseConnection,
    id: i32,
    input: FeeStructureInput,
) -> Result<fee_structure::Model> {
    let existing = get_fee_structure(db, id).await?;
    validate(db, &input, Some(id)).await?;
    let mut active: fee_structure::ActiveModel = existing.into();
    active.department_id = Set(input.department_id);
    active.semester_id = Set(input.semester_id);
    active.fee_category_id = Set(input.fee_category_id);
    active.amount = Set(input.amount);
    active.per_credit = Set(input.per_credit);
    active.last_updated = Set(chrono::Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Deletes a fee structure.
pub async fn delete_fee_structure(db: &DatabaseConnection, id: i32) -> Result<()> {
    get_fee_structure(db, id).await?;
    FeeStructure::delete_by_id(id).exec(db).await?;
    tracing::info!(fee_structure_id = id, "Deleted fee structure");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_structure_unique_per_department_semester_category() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        let semester = create_test_semester(&db, "Fall").await?;
        let tuition = create_test_category(&db, "Tuition").await?;

        let input = FeeStructureInput {
            department_id: dept.id,
            semester_id: semester.id,
            fee_category_id: tuition.id,
            amount: Money::from_major(1_000),
            per_credit: false,
        };
        create_fee_structure(&db, input.clone()).await?;
        let result = create_fee_structure(&db, input).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_negative_amount_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_fee_structure(
            &db,
            FeeStructureInput {
                department_id: 1,
                semester_id: 1,
                fee_category_id: 1,
                amount: Money::from_minor(-1),
                per_credit: false,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_filter_by_semester() -> Result<()> {
        let db = setup_test_db().await?;
        let dept = create_test_department(&db, "CS").await?;
        let fall = create_test_semester(&db, "Fall").await?;
        let spring = create_test_semester(&db, "Spring").await?;
        let tuition = create_test_category(&db, "Tuition").await?;
        create_test_structure(&db, dept.id, fall.id, tuition.id, 900).await?;
        create_test_structure(&db, dept.id, spring.id, tuition.id, 950).await?;

        let fall_only = list_fee_structures(
            &db,
            FeeStructureFilter {
                semester_id: Some(fall.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(fall_only.len(), 1);
        assert_eq!(fall_only[0].amount, Money::from_major(900));
        Ok(())
    }
}
