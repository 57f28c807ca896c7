//! Reference data routes: departments, classes, semesters, fee categories, payment methods.
//!
//! Any authenticated caller may read; only administrators may change anything.

use super::{ApiJson, ApiPath, ApiQuery, AppState, Caller};
use crate::{
    core::{
        catalog::{self, CatalogInput},
        class::{self, ClassInput},
        department::{self, DepartmentInput},
        semester::{self, SemesterInput},
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

/// Master-data routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/departments", get(list_departments).post(create_department))
        .route(
            "/api/departments/:id",
            get(get_department).put(update_department).delete(delete_department),
        )
        .route("/api/classes", get(list_classes).post(create_class))
        .route(
            "/api/classes/:id",
            get(get_class).put(update_class).delete(delete_class),
        )
        .route("/api/semesters", get(list_semesters).post(create_semester))
        .route(
            "/api/semesters/:id",
            get(get_semester).put(update_semester).delete(delete_semester),
        )
        .route("/api/fee-categories", get(list_fee_categories).post(create_fee_category))
        .route(
            "/api/fee-categories/:id",
            get(get_fee_category)
                .put(update_fee_category)
                .delete(delete_fee_category),
        )
        .route(
            "/api/payment-methods",
            get(list_payment_methods).post(create_payment_method),
        )
        .route(
            "/api/payment-methods/:id",
            get(get_payment_method)
                .put(update_payment_method)
                .delete(delete_payment_method),
        )
}

// Departments

async fn list_departments(
    State(state): State<AppState>,
    _caller: Caller,
) -> Result<impl IntoResponse> {
    Ok(Json(department::list_departments(state.db.as_ref()).await?))
}

async fn create_department(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = department::create_department(state.db.as_ref(), input).await?;
    tracing::info!(department_id = created.id, code = %created.code, "Created department");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_department(
    State(state): State<AppState>,
    _caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(department::get_department(state.db.as_ref(), id).await?))
}

async fn update_department(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<DepartmentInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(department::update_department(state.db.as_ref(), id, input).await?))
}

async fn delete_department(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    department::delete_department(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Classes

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassQuery {
    department_id: Option<i32>,
}

async fn list_classes(
    State(state): State<AppState>,
    _caller: Caller,
    ApiQuery(query): ApiQuery<ClassQuery>,
) -> Result<impl IntoResponse> {
    Ok(Json(class::list_classes(state.db.as_ref(), query.department_id).await?))
}

async fn create_class(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<ClassInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = class::create_class(state.db.as_ref(), input).await?;
    tracing::info!(class_id = created.id, code = %created.code, "Created class");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_class(
    State(state): State<AppState>,
    _caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(class::get_class(state.db.as_ref(), id).await?))
}

async fn update_class(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<ClassInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(class::update_class(state.db.as_ref(), id, input).await?))
}

async fn delete_class(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    class::delete_class(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Semesters

async fn list_semesters(
    State(state): State<AppState>,
    _caller: Caller,
) -> Result<impl IntoResponse> {
    Ok(Json(semester::list_semesters(state.db.as_ref()).await?))
}

async fn create_semester(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<SemesterInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = semester::create_semester(state.db.as_ref(), input).await?;
    tracing::info!(semester_id = created.id, name = %created.name, "Created semester");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_semester(
    State(state): State<AppState>,
    _caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(semester::get_semester(state.db.as_ref(), id).await?))
}

async fn update_semester(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<SemesterInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(semester::update_semester(state.db.as_ref(), id, input).await?))
}

async fn delete_semester(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    semester::delete_semester(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Fee categories

async fn list_fee_categories(
    State(state): State<AppState>,
    _caller: Caller,
) -> Result<impl IntoResponse> {
    Ok(Json(catalog::list_fee_categories(state.db.as_ref()).await?))
}

async fn create_fee_category(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<CatalogInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = catalog::create_fee_category(state.db.as_ref(), input).await?;
    tracing::info!(fee_category_id = created.id, name = %created.name, "Created fee category");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_fee_category(
    State(state): State<AppState>,
    _caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(catalog::get_fee_category(state.db.as_ref(), id).await?))
}

async fn update_fee_category(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<CatalogInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(catalog::update_fee_category(state.db.as_ref(), id, input).await?))
}

async fn delete_fee_category(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    catalog::delete_fee_category(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Payment methods

async fn list_payment_methods(
    State(state): State<AppState>,
    _caller: Caller,
) -> Result<impl IntoResponse> {
    Ok(Json(catalog::list_payment_methods(state.db.as_ref()).await?))
}

async fn create_payment_method(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<CatalogInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = catalog::create_payment_method(state.db.as_ref(), input).await?;
    tracing::info!(payment_method_id = created.id, name = %created.name, "Created payment method");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_payment_method(
    State(state): State<AppState>,
    _caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(catalog::get_payment_method(state.db.as_ref(), id).await?))
}

async fn update_payment_method(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<CatalogInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(catalog::update_payment_method(state.db.as_ref(), id, input).await?))
}

async fn delete_payment_method(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    catalog::delete_payment_method(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
