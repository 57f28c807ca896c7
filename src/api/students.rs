//! Student registration and maintenance routes (administrators only).

use super::{ApiJson, ApiPath, ApiQuery, AppState, Caller};
use crate::{
    core::{
        paging::PageRequest,
        student::{self, RegisterStudent, StudentFilter, UpdateStudent},
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

/// Student routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(list).post(register))
        .route("/api/students/:id", get(show).put(update).delete(remove))
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(filter): ApiQuery<StudentFilter>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let window = state.page(paging)?;
    Ok(Json(student::list_students(state.db.as_ref(), &filter, window).await?))
}

async fn register(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<RegisterStudent>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created =
        student::register_student(state.db.as_ref(), state.notifier.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(student::get_student(state.db.as_ref(), id).await?))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateStudent>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(student::update_student(state.db.as_ref(), id, input).await?))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    student::delete_student(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
