//! The axum route table (spec §6.2), generalized from the teacher's own
//! `control::routes`/`cmd::serve` split: one `Router<Arc<AppContext>>`
//! mounted under a single middleware stack.

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, patch, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::controllers::{documents, health, stubs};
use crate::middleware::require_auth_context;

/// Builds the full application router. Protected routes run behind
/// [`require_auth_context`]; `/health` does not (spec §5: liveness probes
/// are not bearer-token gated in the teacher's own deployment either).
pub fn routes(ctx: Arc<AppContext>) -> Router {
    let protected = Router::<Arc<AppContext>>::new()
        .route("/documents", get(documents::list))
        .route("/documents/entities-with-documents", get(documents::entities_with_documents))
        .route(
            "/documents/required-documents/:required_document_id/metadata-filters",
            get(documents::metadata_filters),
        )
        .route("/documents/:doc_id", get(documents::show))
        .route("/documents/:doc_id/metadata/quality-check", post(documents::quality_check))
        .route("/documents/:doc_id/metadata/confirm", patch(documents::confirm_document))
        .route("/documents/:doc_id/integrity/verify", get(documents::verify_integrity))
        .route("/storage/proxy/*object_path", get(documents::storage_proxy))
        .route_layer(from_fn_with_state(ctx.clone(), require_auth_context));

    let out_of_scope = Router::<Arc<AppContext>>::new()
        .route("/catalog/*path", get(stubs::catalog))
        .route("/templates/*path", get(stubs::templates))
        .route("/admin/force-sync", post(stubs::force_sync));

    Router::<Arc<AppContext>>::new()
        .route("/health", get(health::show))
        .merge(protected)
        .merge(out_of_scope)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(ConcurrencyLimitLayer::new(64)),
        )
        .with_state(ctx)
}
