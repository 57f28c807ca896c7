//! Reporting routes (administrators only).

use super::{ApiPath, AppState, Caller};
use crate::{core::report, errors::Result};
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};

/// Report routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/api/reports/semesters/:id", get(semester))
}

async fn semester(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(report::semester_report(state.db.as_ref(), id).await?))
}
