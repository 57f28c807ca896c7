//! Payment ledger routes (administrators only).

use super::{ApiJson, ApiPath, ApiQuery, AppState, Caller};
use crate::{
    core::{
        paging::PageRequest,
        payment::{self, PaymentFilter, RecordPayment, UpdatePaymentStatus},
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
};

/// Payment ledger routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments", get(list).post(record))
        .route("/api/payments/without-invoice", get(without_invoice))
        .route("/api/payments/:id", get(show).delete(remove))
        .route("/api/payments/:id/status", put(update_status))
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(filter): ApiQuery<PaymentFilter>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let window = state.page(paging)?;
    Ok(Json(payment::list_payments(state.db.as_ref(), &filter, window).await?))
}

async fn record(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<RecordPayment>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = payment::record_payment(state.db.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn without_invoice(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let window = state.page(paging)?;
    Ok(Json(payment::payments_without_invoice(state.db.as_ref(), window).await?))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(payment::get_payment_detail(state.db.as_ref(), id).await?))
}

async fn update_status(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(update): ApiJson<UpdatePaymentStatus>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let policy = state.transition_policy();
    payment::update_payment_status(state.db.as_ref(), id, update, policy).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    payment::delete_payment(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
