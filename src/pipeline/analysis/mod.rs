pub mod types;
pub mod gemini;
pub mod gemini_types;
pub mod retry;
pub mod prompt;
pub mod parser;
pub mod gaps;
pub mod enrichment;
pub mod language;
pub mod normalize;
pub mod orchestrator;

pub use types::*;
pub use gemini::*;
pub use retry::*;
pub use parser::*;
pub use gaps::*;
pub use enrichment::*;
pub use language::*;
pub use normalize::*;
pub use orchestrator::*;

use thiserror::Error;

/// Failures of an outbound text-generation call.
///
/// Only the primary analysis call surfaces these to the caller; research
/// and translation stages record them as degradations and carry on.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Cannot connect to text-generation service: {0}")]
    Connection(String),

    #[error("Text-generation service returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Text-generation service reported an error: {0}")]
    Upstream(String),

    #[error("Response contained no candidates")]
    EmptyCandidates,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

impl AnalysisError {
    /// Transport-level failure (as opposed to a well-formed rejection).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AnalysisError::Connection(_) | AnalysisError::HttpClient(_)
        )
    }
}
