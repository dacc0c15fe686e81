//! Wire types for the `generateContent` endpoint.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! response is ignored by serde.

use serde::{Deserialize, Serialize};

use super::types::InlineImage;
use super::AnalysisError;

// ──────────────────────────────────────────────
// Request
// ──────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GenerateContentRequest<'a> {
    pub contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Content<'a> {
    pub parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
pub struct InlineData<'a> {
    pub mime_type: &'a str,
    pub data: &'a str,
}

impl<'a> GenerateContentRequest<'a> {
    /// Single-turn request: the prompt, then the optional image.
    pub fn new(prompt: &'a str, image: Option<&'a InlineImage>) -> Self {
        let mut parts = vec![Part::Text { text: prompt }];
        if let Some(img) = image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: &img.mime_type,
                    data: &img.data,
                },
            });
        }
        Self {
            contents: vec![Content { parts }],
        }
    }
}

// ──────────────────────────────────────────────
// Response
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// The first candidate's first text part, the only field the pipeline consumes.
    pub fn into_first_text(self) -> Result<String, AnalysisError> {
        if let Some(err) = self.error {
            return Err(AnalysisError::Upstream(err.to_string()));
        }
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or(AnalysisError::EmptyCandidates)?;
        candidate
            .content
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text)
            .ok_or_else(|| AnalysisError::MalformedResponse("First candidate has no text part".into()))
    }
}

/// Parse a raw response body.
pub fn parse_generate_response(body: &str) -> Result<String, AnalysisError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;
    parsed.into_first_text()
}
