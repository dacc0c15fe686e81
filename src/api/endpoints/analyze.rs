//! `POST /analyze_car`: photo upload → analyzed, stored record.

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::ConfigError;
use crate::pipeline::analysis::{CarSpecRecord, Lang};
use crate::pipeline::image::{prepare_image, ImageError};
use crate::store::DEFAULT_COLLECTION;

/// Image part of the multipart form.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// `POST /analyze_car`: multipart `image` file plus optional `lang` field.
///
/// The record is filed in history and in the default collection; a store
/// failure is logged but does not fail the request.
pub async fn analyze_car(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<CarSpecRecord>, ApiError> {
    if ctx.core.config.api_key.trim().is_empty() {
        return Err(ConfigError::MissingApiKey.into());
    }

    let mut upload: Option<Upload> = None;
    let mut lang_param: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, lang_param.as_deref()))?
    {
        match field.name() {
            Some("image") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error(e, lang_param.as_deref()))?;
                upload = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Some("lang") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| multipart_error(e, lang_param.as_deref()))?;
                lang_param = Some(text);
            }
            _ => {}
        }
    }

    let lang = Lang::from_param(lang_param.as_deref());
    let upload = upload.ok_or(ApiError::MissingImage)?;
    if upload.file_name.trim().is_empty() {
        return Err(ApiError::EmptyFilename);
    }

    tracing::info!(
        file = %upload.file_name,
        size = upload.bytes.len(),
        lang = %lang,
        "Received analyze_car request"
    );

    let core = ctx.core.clone();
    let record = tokio::task::spawn_blocking(move || -> Result<CarSpecRecord, ApiError> {
        let image = prepare_image(&upload.bytes)
            .map_err(|source| ApiError::InvalidImage { lang, source })?;

        let outcome = core
            .analyzer
            .analyze_image(&image, lang)
            .map_err(|e| ApiError::from_analysis(e, lang))?;

        for degradation in &outcome.degradations {
            tracing::info!(%degradation, "Pipeline degraded");
        }

        let record = outcome.record;
        if let Err(e) = core.history.append(&record) {
            tracing::error!(error = %e, "Failed to save to history");
        }
        if let Err(e) = core.collections.append_if_absent(DEFAULT_COLLECTION, &record) {
            tracing::error!(error = %e, collection = DEFAULT_COLLECTION, "Failed to save to collection");
        }

        Ok(record)
    })
    .await
    .map_err(|e| ApiError::Internal {
        lang,
        detail: format!("Analysis task failed: {e}"),
    })??;

    tracing::info!(
        car = %record.car_name,
        seconds = record.processing_time,
        "Analysis request completed"
    );

    Ok(Json(record))
}

/// A body over the upload limit reads as an oversized image; `lang` may not
/// have been read yet, in which case the default language is used.
fn multipart_error(e: MultipartError, lang_param: Option<&str>) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::InvalidImage {
            lang: Lang::from_param(lang_param),
            source: ImageError::TooLarge,
        }
    } else {
        ApiError::BadRequest(e.body_text())
    }
}
