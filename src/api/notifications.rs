//! Notification routes.

use super::{ApiJson, ApiPath, ApiQuery, AppState, Caller};
use crate::{
    core::{
        notification::{self, CreateNotification, NotificationFilter, ReminderRequest},
        paging::PageRequest,
    },
    errors::Result,
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use serde_json::json;

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_own).post(create))
        .route("/api/notifications/tuition-reminder", post(tuition_reminder))
        .route("/api/notifications/mark-all-read", patch(mark_all_read))
        .route("/api/notifications/:id", get(show))
        .route("/api/notifications/:id/read", put(mark_read))
}

async fn list_own(
    State(state): State<AppState>,
    caller: Caller,
    ApiQuery(filter): ApiQuery<NotificationFilter>,
    ApiQuery(paging): ApiQuery<PageRequest>,
) -> Result<impl IntoResponse> {
    let window = state.page(paging)?;
    let page =
        notification::list_notifications(state.db.as_ref(), caller.user_id, &filter, window)
            .await?;
    Ok(Json(page))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(input): ApiJson<CreateNotification>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let created = notification::create_notification(state.db.as_ref(), input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn show(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    let found =
        notification::get_notification(state.db.as_ref(), id, caller.user_id, caller.is_admin())
            .await?;
    Ok(Json(found))
}

async fn mark_read(
    State(state): State<AppState>,
    caller: Caller,
    ApiPath(id): ApiPath<i32>,
) -> Result<impl IntoResponse> {
    Ok(Json(notification::mark_read(state.db.as_ref(), id, caller.user_id).await?))
}

async fn mark_all_read(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<impl IntoResponse> {
    let marked = notification::mark_all_read(state.db.as_ref(), caller.user_id).await?;
    Ok(Json(json!({ "markedRead": marked })))
}

async fn tuition_reminder(
    State(state): State<AppState>,
    caller: Caller,
    ApiJson(request): ApiJson<ReminderRequest>,
) -> Result<impl IntoResponse> {
    caller.require_admin()?;
    let outcome = notification::send_tuition_reminders(
        state.db.as_ref(),
        state.notifier.as_ref(),
        request,
    )
    .await?;
    Ok(Json(outcome))
}
