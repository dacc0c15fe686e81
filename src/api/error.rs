//! API error types with localized JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::config::ConfigError;
use crate::pipeline::analysis::{AnalysisError, Lang};
use crate::pipeline::image::ImageError;
use crate::store::StoreError;

/// Error body returned to clients: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API-level errors with HTTP status mapping.
///
/// Variants raised on the analysis path carry the request language so the
/// message can be shown to the user as-is.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingImage,
    #[error("No image file selected")]
    EmptyFilename,
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Image preparation failed: {source}")]
    InvalidImage { lang: Lang, source: ImageError },
    #[error("Analysis timed out")]
    Timeout { lang: Lang },
    #[error("Analysis rejected: {detail}")]
    Rejected { lang: Lang, detail: String },
    #[error("Analysis service unavailable: {detail}")]
    Unavailable { lang: Lang, detail: String },
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Probe failed: {0}")]
    Probe(AnalysisError),
    #[error("Internal error: {detail}")]
    Internal { lang: Lang, detail: String },
}

impl ApiError {
    /// Classify a failed analysis call for the client.
    pub fn from_analysis(err: AnalysisError, lang: Lang) -> Self {
        let detail = err.to_string();
        match err {
            AnalysisError::Timeout(_) => ApiError::Timeout { lang },
            e if e.is_transport() => ApiError::Unavailable { lang, detail },
            _ => ApiError::Rejected { lang, detail },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage
            | ApiError::EmptyFilename
            | ApiError::BadRequest(_)
            | ApiError::InvalidImage { .. }
            | ApiError::Rejected { .. } => StatusCode::BAD_REQUEST,
            ApiError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Unavailable { .. }
            | ApiError::Configuration(_)
            | ApiError::Store(_)
            | ApiError::Probe(_)
            | ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client.
    pub fn message(&self) -> String {
        match self {
            ApiError::MissingImage | ApiError::EmptyFilename => self.to_string(),
            ApiError::BadRequest(detail) => detail.clone(),
            ApiError::InvalidImage { lang, .. } => localized(
                *lang,
                "Lỗi xử lý ảnh. Vui lòng thử lại với ảnh khác.",
                "Image processing failed. Please try with a different image.",
            ),
            ApiError::Timeout { lang } => localized(
                *lang,
                "Quá thời gian phân tích. Vui lòng thử lại với ảnh khác (ảnh rõ nét hơn hoặc góc chụp khác).",
                "Analysis timeout. Please try again with a different image (clearer image or different angle).",
            ),
            ApiError::Rejected { lang, .. } => localized(
                *lang,
                "Không thể phân tích ảnh. Vui lòng thử lại với ảnh khác.",
                "Unable to analyze image. Please try with a different image.",
            ),
            ApiError::Unavailable { lang, .. } => localized(
                *lang,
                "Lỗi kết nối đến máy chủ. Vui lòng kiểm tra kết nối mạng và thử lại sau.",
                "Server connection error. Please check your network and try again later.",
            ),
            ApiError::Configuration(ConfigError::MissingApiKey) => {
                "API key is not configured".to_string()
            }
            ApiError::Configuration(e) => e.to_string(),
            ApiError::Store(_) => "An internal error occurred".to_string(),
            ApiError::Probe(e) => e.to_string(),
            ApiError::Internal { lang, .. } => localized(
                *lang,
                "Đã xảy ra lỗi không mong muốn. Vui lòng thử lại sau.",
                "An unexpected error occurred. Please try again later.",
            ),
        }
    }
}

fn localized(lang: Lang, vi: &str, en: &str) -> String {
    match lang {
        Lang::Vi => vi.to_string(),
        Lang::En => en.to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "API request failed");
        } else {
            tracing::warn!(error = %self, "API request rejected");
        }

        let body = ErrorBody {
            error: self.message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), 4096).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn missing_image_returns_400() {
        let response = ApiError::MissingImage.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "No image file provided");
    }

    #[tokio::test]
    async fn timeout_returns_504_localized() {
        let err = ApiError::from_analysis(AnalysisError::Timeout(15), Lang::En);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = body_json(response).await;
        assert!(json["error"].as_str().unwrap().starts_with("Analysis timeout"));
    }

    #[tokio::test]
    async fn rejection_returns_400_in_vietnamese() {
        let err = ApiError::from_analysis(AnalysisError::EmptyCandidates, Lang::Vi);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(
            json["error"],
            "Không thể phân tích ảnh. Vui lòng thử lại với ảnh khác."
        );
    }

    #[test]
    fn upstream_failures_classified() {
        let status = AnalysisError::Status {
            status: 403,
            body: "forbidden".into(),
        };
        assert_eq!(
            ApiError::from_analysis(status, Lang::En).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from_analysis(AnalysisError::Upstream("quota".into()), Lang::En).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from_analysis(AnalysisError::Connection("refused".into()), Lang::En).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(matches!(
            ApiError::from_analysis(AnalysisError::HttpClient("reset".into()), Lang::Vi),
            ApiError::Unavailable { lang: Lang::Vi, .. }
        ));
    }

    #[tokio::test]
    async fn missing_key_returns_500() {
        let response = ApiError::from(ConfigError::MissingApiKey).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "API key is not configured");
    }

    #[tokio::test]
    async fn store_error_hides_detail() {
        let err = ApiError::from(StoreError::LockPoisoned);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "An internal error occurred");
    }
}
