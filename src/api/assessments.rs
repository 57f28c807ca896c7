//! Fee assessment routes (`/api/student-fees`).

use super::{ApiJson, ApiPath, ApiQuery, AppState, Caller};
use crate::{
    core::{
        assessment::{self, AssessmentFilter, BatchRequest, CreateAssessment, UpdateAssessment},
        paging::PageRequest,
        student::find_student_by_user,
    },
    errors::{Error, Result},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

/// Assessment routes under `/api/student-fees`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/student-fees", get(list).post(create))
        .route("/api/student-fees/batch", post(generate_batch))
        .route(
            "/api/student-fees/:id",
            get(show).put(update).delete(remove),
        )
        .route("/api/student-fees/student/:student_id", get(for_student))
}

/// Admins see everyone; a student only sees their own record.
async fn ensure_can_view(state: &AppState, caller: &Caller, student_id: i32) -> Result<()> {
    if caller.is_admin() {
        return Ok(());
    }
    let own = find_student_by_user(state.db.as_ref(), caller.user_id).await?;
    if own.id == student_id {
        Ok(())
    } else {
        Err(Error::Forbidden {
            message: "Students may only view their own fees".to_string(),
        })
    }
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(filter): ApiQuery<AssessmentFilter>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let window = state.page(paging)?;
    Ok(Json(assessment::list_assessments(state.db.as_ref(), &filter, window).await?))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<CreateAssessment>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = assessment::create_assessment(state.db.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn generate_batch(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<BatchRequest>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(assessment::generate_batch(state.db.as_ref(), request).await?))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    let detail = assessment::get_assessment_detail(state.db.as_ref(), id).await?;
    ensure_can_view(&state, &caller, detail.summary.assessment.student_id).await?;
    Ok(Json(detail))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
    ApiJson(input): ApiJson<UpdateAssessment>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    Ok(Json(assessment::update_assessment(state.db.as_ref(), id, input).await?))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    assessment::delete_assessment(state.db.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn for_student(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(student_id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    ensure_can_view(&state, &caller, student_id).await?;
    Ok(Json(assessment::student_assessments(state.db.as_ref(), student_id).await?))
}
