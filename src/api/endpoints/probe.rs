//! `GET /test_api`: connectivity check against the research endpoint.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::ConfigError;
use crate::pipeline::analysis::Lang;

#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    pub response: String,
}

pub async fn test_api(State(ctx): State<ApiContext>) -> Result<Json<ProbeResponse>, ApiError> {
    if ctx.core.config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey.into());
    }

    let analyzer = ctx.core.analyzer.clone();
    let response = tokio::task::spawn_blocking(move || analyzer.probe())
        .await
        .map_err(|e| ApiError::Internal {
            lang: Lang::En,
            detail: format!("Probe task failed: {e}"),
        })?
        .map_err(ApiError::Probe)?;

    tracing::info!(chars = response.len(), "Probe succeeded");

    Ok(Json(ProbeResponse {
        status: "success",
        response,
    }))
}
