//! Fee structure routes.

use super::{ApiJson, ApiPath, ApiQuery, AppState, Caller};
use crate::{
    core::fee_structure::{self, FeeStructureFilter, FeeStructureInput},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

/// Fee structure routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/fee-structure", get(list).post(create))
        .route("/api/fee-structure/:id", get(show).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    _caller: Caller,
    ApiQuery(filter): ApiQuery<FeeStructureFilter>,
) -> Result<impl IntoResponse> {
    Ok(Json(fee_structure::list_fee_structures(state.db.as_ref(), filter).await?))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<FeeStructureInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = fee_structure::create_fee_structure(state.db.as_ref(), input).await?;
    tracing::info!(
        fee_structure_id = created.id,
        department_id = created.department_id,
        semester_id = created.semester_id,
        amount = %created.amount,
        "Created fee structure"
    );
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(
    State(state): State<AppState>,
    _caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(fee_structure::get_fee_structure(state.db.as_ref(), id).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<FeeStructureInput>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(fee_structure::update_fee_structure(state.db.as_ref(), id, input).await?))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    fee_structure::delete_fee_structure(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
