use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use super::enrichment::{EnrichmentStage, Enricher};
use super::gaps::{detect_gaps, needs_engine_research};
use super::gemini::GeminiClient;
use super::normalize::Normalizer;
use super::parser::parse_with_fallback;
use super::prompt::{ANALYSIS_PROMPT, PROBE_PROMPT};
use super::retry::RetryPolicy;
use super::types::{CarSpecRecord, GenerationRequest, InlineImage, Lang, ModelRole, TextGenerator};
use super::AnalysisError;
use crate::config::AppConfig;

/// A fail-soft event: the pipeline carried on with the prior state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Degradation {
    /// Analysis text could not be parsed; the fallback record was used.
    ParseFallback { reason: String },
    Enrichment {
        stage: EnrichmentStage,
        reason: String,
    },
    Translation { field: String, reason: String },
}

impl fmt::Display for Degradation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseFallback { reason } => write!(f, "parse fallback: {reason}"),
            Self::Enrichment { stage, reason } => write!(f, "{stage} failed: {reason}"),
            Self::Translation { field, reason } => {
                write!(f, "translation of {field} failed: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub record: CarSpecRecord,
    pub degradations: Vec<Degradation>,
}

/// Runs the whole pipeline for one photo:
/// analysis call → parse → gaps → enrichment → normalization.
pub struct CarAnalyzer {
    generator: Arc<dyn TextGenerator>,
    retry: RetryPolicy,
    enricher: Enricher,
    normalizer: Normalizer,
}

impl CarAnalyzer {
    pub fn new(generator: Arc<dyn TextGenerator>, retry: RetryPolicy) -> Self {
        Self {
            enricher: Enricher::new(generator.clone()),
            normalizer: Normalizer::new(generator.clone()),
            generator,
            retry,
        }
    }

    /// Analyzer backed by the Gemini endpoints in `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AnalysisError> {
        let client = GeminiClient::new(config)?;
        Ok(Self::new(Arc::new(client), RetryPolicy::from(&config.retry)))
    }

    /// Analyze an encoded photo. Only the analysis call itself can fail;
    /// every later stage degrades instead.
    pub fn analyze_image(
        &self,
        image: &InlineImage,
        lang: Lang,
    ) -> Result<AnalysisOutcome, AnalysisError> {
        let started = Instant::now();
        let _span = tracing::info_span!("analyze_image", lang = %lang).entered();

        let request =
            GenerationRequest::with_image(ModelRole::Analysis, ANALYSIS_PROMPT.to_string(), image.clone());
        let raw = self.retry.generate(self.generator.as_ref(), &request)?;
        tracing::debug!(chars = raw.len(), "Analysis text received");

        Ok(self.process(&raw, lang, started))
    }

    /// Run everything after the analysis call on already obtained text.
    pub fn analyze_text(&self, raw_text: &str, lang: Lang) -> AnalysisOutcome {
        self.process(raw_text, lang, Instant::now())
    }

    /// Single unretried request to the research endpoint.
    pub fn probe(&self) -> Result<String, AnalysisError> {
        let request = GenerationRequest::text(ModelRole::Research, PROBE_PROMPT.to_string());
        self.generator.generate(&request)
    }

    fn process(&self, raw_text: &str, lang: Lang, started: Instant) -> AnalysisOutcome {
        let mut degradations = Vec::new();

        let (record, parse_error) = parse_with_fallback(raw_text);
        if let Some(e) = parse_error {
            degradations.push(Degradation::ParseFallback {
                reason: e.to_string(),
            });
        }

        let gaps = detect_gaps(&record);
        let engine_gap = needs_engine_research(&record);
        tracing::info!(
            car = %record.car_name,
            gaps = gaps.len(),
            engine_gap,
            "Record parsed"
        );

        let enriched = self.enricher.enrich(record, &gaps, engine_gap, lang);
        degradations.extend(enriched.failures.into_iter().map(|f| Degradation::Enrichment {
            stage: f.stage,
            reason: f.reason,
        }));

        let normalized = self.normalizer.normalize(enriched.record, lang);
        degradations.extend(
            normalized
                .failures
                .into_iter()
                .map(|f| Degradation::Translation {
                    field: f.field,
                    reason: f.reason,
                }),
        );

        let mut record = normalized.record;
        record.processing_time = started.elapsed().as_secs_f64();
        record.timestamp = Utc::now();

        tracing::info!(
            car = %record.car_name,
            degradations = degradations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        AnalysisOutcome {
            record,
            degradations,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::pipeline::analysis::gemini::MockGenerator;
    use crate::pipeline::analysis::types::{NOT_AVAILABLE, UNKNOWN_CAR};

    const COROLLA: &str = "Brand: Toyota\nModel: Corolla\nYear: 2022\nPrice: $25,000\nPower: 169 hp\n0-60 mph: 8.0s\nTop Speed: 200 km/h\n\nEngine Details:\n- Configuration: inline-4\n\nInterior & Features:\n- Seating: cloth";

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
        }
    }

    fn analyzer(mock: &Arc<MockGenerator>) -> CarAnalyzer {
        CarAnalyzer::new(mock.clone() as Arc<dyn TextGenerator>, fast_retry())
    }

    fn image() -> InlineImage {
        InlineImage::jpeg("aGVsbG8=".into())
    }

    #[test]
    fn corolla_end_to_end_in_english() {
        let mock = Arc::new(MockGenerator::new("unused").then(ModelRole::Analysis, COROLLA));
        let outcome = analyzer(&mock).analyze_image(&image(), Lang::En).unwrap();

        let record = &outcome.record;
        assert_eq!(record.car_name, "Toyota Corolla");
        assert_eq!(record.year, "2022");
        assert_eq!(record.price, "$25,000");
        assert_eq!(record.power, "169 hp");
        assert_eq!(record.acceleration, "8.0s");
        assert_eq!(record.top_speed, "200 km/h");
        assert!(record.engine_detail.lines().any(|l| l == "• Configuration: inline-4"));
        assert_eq!(record.features, vec!["Seating: cloth"]);
        assert!(outcome.degradations.is_empty());

        // one analysis call, no research, nothing to translate
        assert_eq!(mock.call_count(), 1);
        assert_eq!(mock.calls_for(ModelRole::Analysis), 1);
    }

    #[test]
    fn analysis_request_carries_image_and_prompt() {
        let mock = Arc::new(MockGenerator::new("unused").then(ModelRole::Analysis, COROLLA));
        analyzer(&mock).analyze_image(&image(), Lang::En).unwrap();
        let prompts = mock.prompts_for(ModelRole::Analysis);
        assert_eq!(prompts, vec![ANALYSIS_PROMPT.to_string()]);
    }

    #[test]
    fn transient_analysis_failure_is_retried() {
        let mock = Arc::new(
            MockGenerator::new("unused")
                .then_fail(ModelRole::Analysis, 503)
                .then(ModelRole::Analysis, COROLLA),
        );
        let outcome = analyzer(&mock).analyze_image(&image(), Lang::En).unwrap();
        assert_eq!(outcome.record.car_name, "Toyota Corolla");
        assert_eq!(mock.calls_for(ModelRole::Analysis), 2);
    }

    #[test]
    fn rejected_analysis_surfaces_error() {
        let mock = Arc::new(MockGenerator::failing(400));
        let err = analyzer(&mock).analyze_image(&image(), Lang::En).unwrap_err();
        assert!(matches!(err, AnalysisError::Status { status: 400, .. }));
        assert_eq!(mock.calls_for(ModelRole::Analysis), 1);
        assert_eq!(mock.calls_for(ModelRole::Research), 0);
    }

    #[test]
    fn exhausted_retries_surface_last_error() {
        let mock = Arc::new(MockGenerator::failing(503));
        let err = analyzer(&mock).analyze_image(&image(), Lang::En).unwrap_err();
        assert!(matches!(err, AnalysisError::Status { status: 503, .. }));
        assert_eq!(mock.calls_for(ModelRole::Analysis), 3);
    }

    #[test]
    fn missing_metrics_filled_by_research() {
        let analysis = "Brand: Honda\nModel: Civic\nEngine Details:\n- 1.5L turbo\nInterior & Features:\n- Seats: cloth";
        let research = "Power: 180 hp\n0-60 mph: 7.5s\nTop Speed: 220 km/h";
        let mock = Arc::new(
            MockGenerator::new("unused")
                .then(ModelRole::Analysis, analysis)
                .then(ModelRole::Research, research),
        );
        let outcome = analyzer(&mock).analyze_image(&image(), Lang::En).unwrap();
        assert_eq!(outcome.record.power, "180 hp");
        assert_eq!(outcome.record.acceleration, "7.5s");
        assert_eq!(outcome.record.top_speed, "220 km/h");
        assert_eq!(outcome.record.engine_detail, "• 1.5L turbo");
        assert_eq!(mock.calls_for(ModelRole::Research), 1);
        assert!(outcome.degradations.is_empty());
    }

    #[test]
    fn research_failure_is_recorded_not_surfaced() {
        let analysis = "Brand: Honda\nModel: Civic\nEngine Details:\n- 1.5L turbo";
        let mock = Arc::new(
            MockGenerator::new("unused")
                .then(ModelRole::Analysis, analysis)
                .then_fail(ModelRole::Research, 500),
        );
        let outcome = analyzer(&mock).analyze_image(&image(), Lang::En).unwrap();
        assert_eq!(outcome.record.power, NOT_AVAILABLE);
        assert_eq!(
            outcome.degradations,
            vec![Degradation::Enrichment {
                stage: EnrichmentStage::GeneralResearch,
                reason: "Text-generation service returned status 500: mock failure".into(),
            }]
        );
    }

    #[test]
    fn unparseable_text_yields_fallback_with_degradation() {
        let mock = Arc::new(MockGenerator::failing(500));
        let outcome = analyzer(&mock).analyze_text("", Lang::En);
        assert_eq!(outcome.record.car_name, UNKNOWN_CAR);
        assert!(matches!(
            outcome.degradations[0],
            Degradation::ParseFallback { .. }
        ));
        // engine and general research were still attempted
        assert!(outcome
            .degradations
            .iter()
            .any(|d| matches!(d, Degradation::Enrichment { .. })));
    }

    #[test]
    fn vietnamese_target_translates_english_sections() {
        let analysis = "Brand: Toyota\nModel: Corolla\nPrice: $25,000 depending on year and trim level\nPower: 169 hp\n0-60 mph: 8.0s\nTop Speed: 200 km/h\nOverview:\nA compact sedan.\nEngine Details:\n- Configuration: inline-4\nInterior & Features:\n- Seating: cloth";
        let mock = Arc::new(
            MockGenerator::new("unused")
                .then(ModelRole::Analysis, analysis)
                .then(ModelRole::Translation, "Một chiếc sedan cỡ nhỏ.")
                .then(ModelRole::Translation, "• Ghế: vải")
                .then(ModelRole::Translation, "• Cấu hình: 4 xi-lanh thẳng hàng"),
        );
        let outcome = analyzer(&mock).analyze_image(&image(), Lang::Vi).unwrap();
        let record = outcome.record;

        assert_eq!(record.price, "$25,000 tùy thuộc vào phiên bản và năm sản xuất");
        assert_eq!(record.description, "Một chiếc sedan cỡ nhỏ.");
        assert_eq!(record.interior, "• Ghế: vải");
        assert_eq!(record.engine_detail, "• Cấu hình: 4 xi-lanh thẳng hàng");
        assert_eq!(record.features, vec!["Ghế: vải"]);
        assert_eq!(mock.calls_for(ModelRole::Translation), 3);
    }

    #[test]
    fn processing_metadata_is_set() {
        let mock = Arc::new(MockGenerator::new("unused"));
        let before = Utc::now();
        let outcome = analyzer(&mock).analyze_text(COROLLA, Lang::En);
        assert!(outcome.record.processing_time >= 0.0);
        assert!(outcome.record.timestamp >= before);
    }

    #[test]
    fn probe_hits_research_endpoint_once() {
        let mock = Arc::new(MockGenerator::new("Hello!"));
        assert_eq!(analyzer(&mock).probe().unwrap(), "Hello!");
        assert_eq!(mock.prompts_for(ModelRole::Research), vec![PROBE_PROMPT.to_string()]);
    }
}
