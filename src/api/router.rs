//! Router construction.
//!
//! Returns a composable `Router` that can be mounted on any axum server.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;
use crate::pipeline::image::MAX_UPLOAD_BYTES;

/// Request body limit for uploads: the image cap plus room for the
/// multipart envelope and the `lang` field.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES + 64 * 1024;

/// Build the API router.
///
/// Endpoint handlers use `State<ApiContext>` (provided via `with_state`).
pub fn api_router(core: Arc<CoreState>) -> Router {
    let ctx = ApiContext::new(core);

    Router::new()
        .route(
            "/analyze_car",
            post(endpoints::analyze::analyze_car).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/history", get(endpoints::history::list))
        .route("/collection", get(endpoints::collection::get))
        .route("/brands", get(endpoints::brands::list))
        .route("/test_api", get(endpoints::probe::test_api))
        .with_state(ctx)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
