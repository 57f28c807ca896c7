//! Student self-service routes.
//!
//! The caller's student record is resolved from their user id; callers without one get 404.

use super::{ApiQuery, AppState, Caller};
use crate::{
    core::{
        assessment,
        paging::PageRequest,
        payment::{self, PaymentFilter},
        student::find_student_by_user,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};

/// Self-service routes for the calling student.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/me/fees", get(my_fees))
        .route("/api/me/payments", get(my_payments))
}

async fn my_fees(State(state): State<AppState>, caller: Caller) -> Result<impl IntoResponse> {
    let student = find_student_by_user(state.db.as_ref(), caller.user_id).await?;
    Ok(Json(assessment::student_assessments(state.db.as_ref(), student.id).await?))
}

async fn my_payments(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> Result<impl IntoResponse> {
    let student = find_student_by_user(state.db.as_ref(), caller.user_id).await?;
    let window = state.page(paging)?;
    let filter = PaymentFilter {
        student_id: Some(student.id),
        ..Default::default()
    };
    Ok(Json(payment::list_payments(state.db.as_ref(), &filter, window).await?))
}
