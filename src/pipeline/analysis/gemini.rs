use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::gemini_types::{parse_generate_response, GenerateContentRequest};
use super::types::{GenerationRequest, ModelRole, TextGenerator};
use super::AnalysisError;
use crate::config::AppConfig;

/// Blocking HTTP client for the `generateContent` API.
///
/// One client serves all three roles; the role picks the endpoint and the
/// response timeout. The connect timeout is shared.
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
    analysis_url: String,
    research_url: String,
    translation_url: String,
    analysis_timeout: Duration,
    follow_up_timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &AppConfig) -> Result<Self, AnalysisError> {
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(config.timeouts.connect)
            .build()
            .map_err(|e| AnalysisError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            analysis_url: config.analysis_url.clone(),
            research_url: config.research_url.clone(),
            translation_url: config.translation_url.clone(),
            analysis_timeout: config.timeouts.analysis,
            follow_up_timeout: config.timeouts.follow_up,
        })
    }

    fn endpoint(&self, role: ModelRole) -> (&str, Duration) {
        match role {
            ModelRole::Analysis => (&self.analysis_url, self.analysis_timeout),
            ModelRole::Research => (&self.research_url, self.follow_up_timeout),
            ModelRole::Translation => (&self.translation_url, self.follow_up_timeout),
        }
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AnalysisError> {
        let (url, timeout) = self.endpoint(request.role);
        let body = GenerateContentRequest::new(&request.prompt, request.image.as_ref());

        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .timeout(timeout)
            .json(&body)
            .send()
            .map_err(|e| request_error(&e, timeout))?;

        let status = response.status();
        let text = response.text().map_err(|e| request_error(&e, timeout))?;

        if !status.is_success() {
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_generate_response(&text)
    }
}

fn request_error(e: &reqwest::Error, timeout: Duration) -> AnalysisError {
    let failure = TransportFailure {
        connect: e.is_connect(),
        timed_out: e.is_timeout(),
        io: has_io_source(e),
    };
    failure.into_error(e.to_string(), timeout)
}

/// Walk the source chain for a socket-level error.
fn has_io_source(e: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(e);
    while let Some(err) = source {
        if err.is::<std::io::Error>() {
            return true;
        }
        source = err.source();
    }
    false
}

/// Flags of a failed HTTP exchange.
///
/// A connect timeout sets both `connect` and `timed_out`; it is a
/// connection failure. Only a response timeout maps to `Timeout`.
#[derive(Debug, Clone, Copy)]
struct TransportFailure {
    connect: bool,
    timed_out: bool,
    io: bool,
}

impl TransportFailure {
    fn into_error(self, detail: String, timeout: Duration) -> AnalysisError {
        if self.connect {
            AnalysisError::Connection(detail)
        } else if self.timed_out {
            AnalysisError::Timeout(timeout.as_secs())
        } else if self.io {
            AnalysisError::Connection(detail)
        } else {
            AnalysisError::HttpClient(detail)
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Mock
// ═══════════════════════════════════════════════════════════

/// Scripted generator for tests: answers per role from a queue, falling
/// back to a fixed response per role. Records every request it receives.
pub struct MockGenerator {
    default_response: Result<String, u16>,
    scripted: Mutex<Vec<(ModelRole, VecDeque<Result<String, u16>>)>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    /// Every call returns `response`.
    pub fn new(response: &str) -> Self {
        Self {
            default_response: Ok(response.to_string()),
            scripted: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every unscripted call fails with the given HTTP status.
    pub fn failing(status: u16) -> Self {
        Self {
            default_response: Err(status),
            scripted: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a response for the next call with this role.
    pub fn then(self, role: ModelRole, response: &str) -> Self {
        self.push(role, Ok(response.to_string()));
        self
    }

    /// Queue a failure (HTTP status) for the next call with this role.
    pub fn then_fail(self, role: ModelRole, status: u16) -> Self {
        self.push(role, Err(status));
        self
    }

    fn push(&self, role: ModelRole, outcome: Result<String, u16>) {
        if let Ok(mut scripted) = self.scripted.lock() {
            match scripted.iter_mut().find(|(r, _)| *r == role) {
                Some((_, queue)) => queue.push_back(outcome),
                None => scripted.push((role, VecDeque::from([outcome]))),
            }
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn calls_for(&self, role: ModelRole) -> usize {
        self.requests
            .lock()
            .map(|r| r.iter().filter(|req| req.role == role).count())
            .unwrap_or(0)
    }

    pub fn prompts_for(&self, role: ModelRole) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| {
                r.iter()
                    .filter(|req| req.role == role)
                    .map(|req| req.prompt.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<String, AnalysisError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let scripted = self.scripted.lock().ok().and_then(|mut s| {
            s.iter_mut()
                .find(|(r, _)| *r == request.role)
                .and_then(|(_, queue)| queue.pop_front())
        });

        match scripted.unwrap_or_else(|| self.default_response.clone()) {
            Ok(text) => Ok(text),
            Err(status) => Err(AnalysisError::Status {
                status,
                body: "mock failure".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis::RetryPolicy;

    #[test]
    fn mock_returns_default_response() {
        let mock = MockGenerator::new("test response");
        let req = GenerationRequest::text(ModelRole::Research, "prompt".into());
        assert_eq!(mock.generate(&req).unwrap(), "test response");
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn mock_scripted_per_role() {
        let mock = MockGenerator::new("default")
            .then(ModelRole::Translation, "first")
            .then_fail(ModelRole::Translation, 503);
        let tr = GenerationRequest::text(ModelRole::Translation, "x".into());
        let rs = GenerationRequest::text(ModelRole::Research, "y".into());

        assert_eq!(mock.generate(&rs).unwrap(), "default");
        assert_eq!(mock.generate(&tr).unwrap(), "first");
        assert!(matches!(
            mock.generate(&tr),
            Err(AnalysisError::Status { status: 503, .. })
        ));
        assert_eq!(mock.generate(&tr).unwrap(), "default");
        assert_eq!(mock.calls_for(ModelRole::Translation), 3);
        assert_eq!(mock.prompts_for(ModelRole::Research), vec!["y".to_string()]);
    }

    #[test]
    fn failing_mock_returns_status() {
        let mock = MockGenerator::failing(500);
        let req = GenerationRequest::text(ModelRole::Analysis, "p".into());
        assert!(matches!(
            mock.generate(&req),
            Err(AnalysisError::Status { status: 500, .. })
        ));
    }

    #[test]
    fn client_routes_roles_to_endpoints() {
        let mut config = AppConfig::new("key");
        config.analysis_url = "http://localhost/analysis".into();
        config.research_url = "http://localhost/research".into();
        config.translation_url = "http://localhost/translate".into();
        let client = GeminiClient::new(&config).unwrap();

        let (url, timeout) = client.endpoint(ModelRole::Analysis);
        assert_eq!(url, "http://localhost/analysis");
        assert_eq!(timeout, Duration::from_secs(15));

        let (url, timeout) = client.endpoint(ModelRole::Translation);
        assert_eq!(url, "http://localhost/translate");
        assert_eq!(timeout, Duration::from_secs(20));
    }

    #[test]
    fn connect_timeout_is_retryable_connection_failure() {
        let failure = TransportFailure {
            connect: true,
            timed_out: true,
            io: false,
        };
        let err = failure.into_error("connect timed out".into(), Duration::from_secs(15));
        assert!(matches!(err, AnalysisError::Connection(_)));
        assert!(RetryPolicy::is_retryable(&err));
    }

    #[test]
    fn response_timeout_is_not_retried() {
        let failure = TransportFailure {
            connect: false,
            timed_out: true,
            io: false,
        };
        let err = failure.into_error("operation timed out".into(), Duration::from_secs(15));
        assert!(matches!(err, AnalysisError::Timeout(15)));
        assert!(!RetryPolicy::is_retryable(&err));
    }

    #[test]
    fn socket_error_after_connect_is_connection_failure() {
        let failure = TransportFailure {
            connect: false,
            timed_out: false,
            io: true,
        };
        let err = failure.into_error("connection reset".into(), Duration::from_secs(20));
        assert!(RetryPolicy::is_retryable(&err));
    }

    #[test]
    fn blackholed_address_does_not_surface_as_timeout() {
        let mut config = AppConfig::new("key");
        config.timeouts.connect = Duration::from_millis(1);
        config.analysis_url = "http://10.255.255.1:81/analysis".into();
        let client = GeminiClient::new(&config).unwrap();
        let req = GenerationRequest::text(ModelRole::Analysis, "hi".into());
        let err = client.generate(&req).unwrap_err();
        assert!(!matches!(err, AnalysisError::Timeout(_)), "unexpected error: {err:?}");
    }

    #[test]
    fn unreachable_endpoint_is_transport_error() {
        let mut config = AppConfig::new("key");
        // Port 9 (discard) on localhost is closed on test machines.
        config.research_url = "http://127.0.0.1:9/research".into();
        let client = GeminiClient::new(&config).unwrap();
        let req = GenerationRequest::text(ModelRole::Research, "hi".into());
        let err = client.generate(&req).unwrap_err();
        assert!(
            matches!(err, AnalysisError::Connection(_) | AnalysisError::Timeout(_) | AnalysisError::HttpClient(_)),
            "unexpected error: {err:?}"
        );
    }
}
