//! `GET /collection?name=`

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::analysis::CarSpecRecord;
use crate::store::DEFAULT_COLLECTION;

#[derive(Debug, Deserialize)]
pub struct CollectionQuery {
    pub name: Option<String>,
}

/// `GET /collection`: one named collection, `[]` when it does not exist.
pub async fn get(
    State(ctx): State<ApiContext>,
    Query(query): Query<CollectionQuery>,
) -> Result<Json<Vec<CarSpecRecord>>, ApiError> {
    let name = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_COLLECTION);
    let records = ctx.core.collections.read_all(name)?;
    Ok(Json(records))
}
