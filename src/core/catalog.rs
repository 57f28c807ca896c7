//! Fee categories and payment methods.
//!
//! Both catalogs share the same shape (unique name, optional description, active flag) and are
//! seeded from the `[[fee_categories]]` and `[[payment_methods]]` tables of the portal config on
//! startup. Seeding is keyed by name so it can run on every boot.

use crate::{
    config::portal::CatalogEntry,
    entities::{
        FeeCategory, FeeLineItem, FeeStructure, Payment, PaymentMethod, fee_category,
        fee_line_item, fee_structure, payment, payment_method,
    },
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;

/// Fields accepted when creating or updating a fee category or payment method.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInput {
    /// Unique display name
    pub name: String,
    /// Optional description
    pub description: Option<String>,
    /// Defaults to active
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

fn clean_name(name: &str, what: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

// Fee categories

/// Creates a fee category; duplicate names conflict.
pub async fn create_fee_category(
    db: &DatabaseConnection,
    input: CatalogInput,
) -> Result<fee_category::Model> {
    let name = clean_name(&input.name, "Fee category")?;
    if find_fee_category_by_name(db, &name).await?.is_some() {
        return Err(Error::conflict(format!("Fee category {name} already exists")));
    }
    let created = fee_category::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        is_active: Set(input.is_active),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(fee_category_id = created.id, name = %created.name, "Created fee category");
    Ok(created)
}

/// Lists fee categories by name.
pub async fn list_fee_categories(db: &DatabaseConnection) -> Result<Vec<fee_category::Model>> {
    FeeCategory::find()
        .order_by_asc(fee_category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a fee category by id.
pub async fn get_fee_category<C: ConnectionTrait>(db: &C, id: i32) -> Result<fee_category::Model> {
    FeeCategory::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Fee category", id))
}

/// Replaces every field of a fee category.
pub async fn update_fee_category(
    db: &DatabaseConnection,
    id: i32,
    input: CatalogInput,
) -> Result<fee_category::Model> {
    let name = clean_name(&input.name, "Fee category")?;
    let existing = get_fee_category(db, id).await?;
    if let Some(other) = find_fee_category_by_name(db, &name).await?
        && other.id != id
    {
        return Err(Error::conflict(format!("Fee category {name} already exists")));
    }
    let mut active: fee_category::ActiveModel = existing.into();
    active.name = Set(name);
    active.description = Set(input.description);
    active.is_active = Set(input.is_active);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a fee category used by no structure or line item.
pub async fn delete_fee_category(db: &DatabaseConnection, id: i32) -> Result<()> {
    get_fee_category(db, id).await?;
    let structures = FeeStructure::find()
        .filter(fee_structure::Column::FeeCategoryId.eq(id))
        .count(db)
        .await?;
    let line_items = FeeLineItem::find()
        .filter(fee_line_item::Column::FeeCategoryId.eq(id))
        .count(db)
        .await?;
    if structures + line_items > 0 {
        return Err(Error::conflict(format!(
            "Fee category {id} is used by {structures} fee structures, {line_items} line items"
        )));
    }
    FeeCategory::delete_by_id(id).exec(db).await?;
    tracing::info!(fee_category_id = id, "Deleted fee category");
    Ok(())
}

async fn find_fee_category_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<fee_category::Model>> {
    FeeCategory::find()
        .filter(fee_category::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

// Payment methods

/// Creates a payment method; duplicate names conflict.
pub async fn create_payment_method(
    db: &DatabaseConnection,
    input: CatalogInput,
) -> Result<payment_method::Model> {
    let name = clean_name(&input.name, "Payment method")?;
    if find_payment_method_by_name(db, &name).await?.is_some() {
        return Err(Error::conflict(format!("Payment method {name} already exists")));
    }
    let created = payment_method::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        is_active: Set(input.is_active),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!(payment_method_id = created.id, name = %created.name, "Created payment method");
    Ok(created)
}

/// Lists payment methods by name.
pub async fn list_payment_methods(db: &DatabaseConnection) -> Result<Vec<payment_method::Model>> {
    PaymentMethod::find()
        .order_by_asc(payment_method::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a payment method by id.
pub async fn get_payment_method<C: ConnectionTrait>(
    db: &C,
    id: i32,
) -> Result<payment_method::Model> {
    PaymentMethod::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Payment method", id))
}

/// Replaces every field of a payment method.
pub async fn update_payment_method(
    db: &DatabaseConnection,
    id: i32,
    input: CatalogInput,
) -> Result<payment_method::Model> {
    let name = clean_name(&input.name, "Payment method")?;
    let existing = get_payment_method(db, id).await?;
    if let Some(other) = find_payment_method_by_name(db, &name).await?
        && other.id != id
    {
        return Err(Error::conflict(format!("Payment method {name} already exists")));
    }
    let mut active: payment_method::ActiveModel = existing.into();
    active.name = Set(name);
    active.description = Set(input.description);
    active.is_active = Set(input.is_active);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a payment method no payment has used.
pub async fn delete_payment_method(db: &DatabaseConnection, id: i32) -> Result<()> {
    get_payment_method(db, id).await?;
    let payments = Payment::find()
        .filter(payment::Column::PaymentMethodId.eq(id))
        .count(db)
        .await?;
    if payments > 0 {
        return Err(Error::conflict(format!(
            "Payment method {id} is still referenced by {payments} payments"
        )));
    }
    PaymentMethod::delete_by_id(id).exec(db).await?;
    tracing::info!(payment_method_id = id, "Deleted payment method");
    Ok(())
}

async fn find_payment_method_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<payment_method::Model>> {
    PaymentMethod::find()
        .filter(payment_method::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

// Seeding

/// Counts of catalog rows inserted by [`seed_catalogs`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    /// Fee categories added
    pub fee_categories: usize,
    /// Payment methods added
    pub payment_methods: usize,
}

/// Inserts any configured fee categories and payment methods that are not present yet.
pub async fn seed_catalogs(
    db: &DatabaseConnection,
    fee_categories: &[CatalogEntry],
    payment_methods: &[CatalogEntry],
) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for entry in fee_categories {
        if find_fee_category_by_name(db, entry.name.trim()).await?.is_none() {
            create_fee_category(db, entry.clone().into()).await?;
            summary.fee_categories += 1;
        }
    }
    for entry in payment_methods {
        if find_payment_method_by_name(db, entry.name.trim()).await?.is_none() {
            create_payment_method(db, entry.clone().into()).await?;
            summary.payment_methods += 1;
        }
    }

    if summary != SeedSummary::default() {
        tracing::info!(
            fee_categories = summary.fee_categories,
            payment_methods = summary.payment_methods,
            "Seeded catalogs from config"
        );
    }
    Ok(summary)
}

impl From<CatalogEntry> for CatalogInput {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            name: entry.name,
            description: entry.description,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_seed_catalogs_is_idempotent() -> Result<()> {
        let db = setup_test_db().await?;
        let categories = [entry("Tuition"), entry("Lab fee")];
        let methods = [entry("Cash"), entry("Bank Transfer")];

        let first = seed_catalogs(&db, &categories, &methods).await?;
        assert_eq!(first.fee_categories, 2);
        assert_eq!(first.payment_methods, 2);

        let second = seed_catalogs(&db, &categories, &methods).await?;
        assert_eq!(second, SeedSummary::default());
        assert_eq!(list_fee_categories(&db).await?.len(), 2);
        assert_eq!(list_payment_methods(&db).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_method_name_conflicts_on_update() -> Result<()> {
        let db = setup_test_db().await?;
        create_test_method(&db, "Cash").await?;
        let card = create_test_method(&db, "Card").await?;
        let result = update_payment_method(
            &db,
            card.id,
            CatalogInput {
                name: "Cash".to_string(),
                description: None,
                is_active: true,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_category_delete_blocked_by_line_items() -> Result<()> {
        let (db, fx) = setup_with_assessment(100).await?;
        let result = delete_fee_category(&db, fx.category.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_method_delete_blocked_by_payments() -> Result<()> {
        let (db, fx) = setup_with_assessment(100).await?;
        insert_raw_payment(&db, &fx, 10, crate::entities::PaymentStatus::Success).await?;
        let result = delete_payment_method(&db, fx.method.id).await;
        assert!(matches!(result, Err(Error::Conflict { .. })));

        let unused = create_test_method(&db, "Cheque").await?;
        delete_payment_method(&db, unused.id).await?;
        Ok(())
    }
}
