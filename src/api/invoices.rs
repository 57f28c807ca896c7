//! Invoice routes (`/api/payments/invoices`, administrators only).

use super::{ApiJson, ApiPath, AppState, Caller};
use crate::{
    core::invoice::{self, GenerateInvoice, InvoiceSearch},
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

/// Invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/payments/invoices/search", post(search))
        .route("/api/payments/invoices/generate", post(generate))
        .route("/api/payments/invoices/send-batch", post(send_batch))
        .route("/api/payments/invoices/:id", get(show))
        .route("/api/payments/invoices/:id/download", get(download))
        .route("/api/payments/invoices/:id/send-email", post(send_email))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBatch {
    #[serde(default)]
    invoice_ids: Vec<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Generated {
    invoice_id: i32,
    invoice_number: String,
    email_sent: bool,
}

async fn search(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(search): ApiJson<InvoiceSearch>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let window = state.page(search.paging)?;
    Ok(Json(invoice::search_invoices(state.db.as_ref(), &search, window).await?))
}

async fn generate(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<GenerateInvoice>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let issued = invoice::generate_invoice(
        state.db.as_ref(),
        state.documents.as_ref(),
        state.notifier.as_ref(),
        request,
    )
    .await?;
    Ok(Json(Generated {
        invoice_id: issued.id,
        invoice_number: issued.invoice_number,
        email_sent: issued.email_sent,
    }))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(invoice::get_invoice_view(state.db.as_ref(), id).await?))
}

async fn download(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let (number, bytes) =
        invoice::download_invoice(state.db.as_ref(), state.documents.as_ref(), id).await?;
    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{number}.pdf\""),
        ),
    ];
    Ok((headers, bytes))
}

async fn send_email(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let sent = invoice::send_invoice_email(
        state.db.as_ref(),
        state.documents.as_ref(),
        state.notifier.as_ref(),
        id,
    )
    .await?;
    Ok(Json(sent))
}

async fn send_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<SendBatch>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let outcome = invoice::send_invoice_batch(
        state.db.as_ref(),
        state.documents.as_ref(),
        state.notifier.as_ref(),
        &request.invoice_ids,
    )
    .await?;
    Ok(Json(outcome))
}
