//! `GET /history`

use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::analysis::CarSpecRecord;

/// `GET /history`: every analyzed record, newest first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<Vec<CarSpecRecord>>, ApiError> {
    let records = ctx.core.history.read_all()?;
    Ok(Json(records))
}
