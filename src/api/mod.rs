//! HTTP surface of the portal.
//!
//! Handlers are thin: they authorize the [`Caller`], parse the request through the [`extract`]
//! wrappers and delegate to `crate::core`. Every route answers JSON; errors, including malformed
//! input, become `{"message": ...}` bodies via the `IntoResponse` impl in [`error`].

pub mod caller;
pub mod error;
pub mod extract;

mod assessments;
mod fee_structures;
mod invoices;
mod me;
mod notifications;
mod payments;
mod reference;
mod reports;
mod students;

pub use caller::Caller;
pub use extract::{ApiJson, ApiPath, ApiQuery};

use crate::{
    config::portal::PortalConfig,
    core::{
        documents::{DocumentStore, FsDocumentStore},
        notify::{Notifier, TracingNotifier},
        paging::{PageRequest, PageWindow},
        payment::TransitionPolicy,
    },
    errors::Result,
};
use axum::{Json, Router, body::Body, http::Request, routing::get};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::Span;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Pooled database connection
    pub db: Arc<DatabaseConnection>,
    /// Settings loaded at startup
    pub config: Arc<PortalConfig>,
    /// Outbound email channel
    pub notifier: Arc<dyn Notifier>,
    /// Invoice document storage
    pub documents: Arc<dyn DocumentStore>,
}

impl AppState {
    /// State with the default collaborators: log-only notifications and invoice documents under
    /// `config.invoice_dir`.
    pub fn new(db: DatabaseConnection, config: PortalConfig) -> Self {
        let documents = FsDocumentStore::new(config.invoice_dir.clone());
        Self {
            db: Arc::new(db),
            config: Arc::new(config),
            notifier: Arc::new(TracingNotifier),
            documents: Arc::new(documents),
        }
    }

    /// Validates paging parameters against the configured limits.
    pub fn page(&self, request: PageRequest) -> Result<PageWindow> {
        self.config.page_limits().resolve(request)
    }

    /// Payment status policy selected by configuration.
    #[must_use]
    pub fn transition_policy(&self) -> TransitionPolicy {
        TransitionPolicy::from_strict(self.config.strict_payment_transitions)
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Builds the complete router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(reference::routes())
        .merge(fee_structures::routes())
        .merge(students::routes())
        .merge(assessments::routes())
        .merge(payments::routes())
        .merge(invoices::routes())
        .merge(notifications::routes())
        .merge(reports::routes())
        .merge(me::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(CorsLayer::permissive())
}

/// Span wrapping one request. `user_id` is filled in by the [`Caller`] extractor.
fn request_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        user_id = tracing::field::Empty,
    )
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_state_clones_share_connection() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let state = AppState::new(db, PortalConfig::default());
        let copy = state.clone();
        assert!(Arc::ptr_eq(&state.db, &copy.db));
        assert!(Arc::ptr_eq(&state.config, &copy.config));
    }

    #[test]
    fn test_request_span_declares_user_id() {
        tracing::subscriber::with_default(tracing_subscriber::registry(), || {
            let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
            let span = request_span(&request);
            let fields = span.metadata().map(|meta| meta.fields());
            assert!(fields.is_some_and(|fields| fields.field("user_id").is_some()));
        });
    }
}
