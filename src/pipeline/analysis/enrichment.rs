//! Gap enrichment: follow-up research queries merged into the record.
//!
//! Two stages, always in this order:
//! 1. engine stage: dedicated engine query, then one constrained general
//!    query if the first yields nothing usable;
//! 2. general stage: one full research query whose metrics overwrite the
//!    detected gaps and whose long-form sections only fill sentinels.
//!
//! Every query is a single attempt. A failed stage leaves the record as it
//! was and is reported as a `StageFailure`.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::parser::try_parse;
use super::prompt::{build_engine_prompt, build_research_prompt, ResearchScope};
use super::types::{
    is_long_form_sentinel, CarSpecRecord, GapField, GenerationRequest, Lang, LongFormField,
    ModelRole, TextGenerator,
};

/// Which research query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentStage {
    EngineResearch,
    EngineFallbackResearch,
    GeneralResearch,
}

impl fmt::Display for EnrichmentStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EngineResearch => write!(f, "engine research"),
            Self::EngineFallbackResearch => write!(f, "engine fallback research"),
            Self::GeneralResearch => write!(f, "general research"),
        }
    }
}

/// A research query that did not contribute to the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageFailure {
    pub stage: EnrichmentStage,
    pub reason: String,
}

impl StageFailure {
    fn new(stage: EnrichmentStage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichmentOutcome {
    pub record: CarSpecRecord,
    pub failures: Vec<StageFailure>,
}

pub struct Enricher {
    generator: Arc<dyn TextGenerator>,
}

impl Enricher {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Fill engine and metric gaps for `record`.
    pub fn enrich(
        &self,
        mut record: CarSpecRecord,
        gaps: &BTreeSet<GapField>,
        engine_gap: bool,
        lang: Lang,
    ) -> EnrichmentOutcome {
        let _span = tracing::info_span!(
            "enrich",
            car = %record.car_name,
            engine_gap,
            gaps = gaps.len(),
        )
        .entered();
        let mut failures = Vec::new();

        if engine_gap {
            self.engine_stage(&mut record, lang, &mut failures);
        }

        if !gaps.is_empty() {
            if let Err(failure) = self.general_stage(&mut record, gaps, lang) {
                tracing::warn!(stage = %failure.stage, reason = %failure.reason, "Enrichment stage skipped");
                failures.push(failure);
            }
        }

        EnrichmentOutcome { record, failures }
    }

    // ── Engine stage ────────────────────────────────────────

    fn engine_stage(
        &self,
        record: &mut CarSpecRecord,
        lang: Lang,
        failures: &mut Vec<StageFailure>,
    ) {
        match self.research_engine(&record.car_name, lang) {
            Ok(detail) => {
                tracing::info!("Engine details filled by dedicated research");
                record.engine_detail = detail;
                return;
            }
            Err(failure) => {
                tracing::warn!(reason = %failure.reason, "Engine research unusable, trying general research");
                failures.push(failure);
            }
        }

        match self.research_engine_fallback(&record.car_name, lang) {
            Ok(detail) => {
                tracing::info!("Engine details filled by general research");
                record.engine_detail = detail;
            }
            Err(failure) => {
                tracing::warn!(reason = %failure.reason, "Engine details left unchanged");
                failures.push(failure);
            }
        }
    }

    fn research_engine(&self, car_name: &str, lang: Lang) -> Result<String, StageFailure> {
        let stage = EnrichmentStage::EngineResearch;
        let request = GenerationRequest::text(ModelRole::Research, build_engine_prompt(car_name, lang));
        let response = self
            .generator
            .generate(&request)
            .map_err(|e| StageFailure::new(stage, e.to_string()))?;

        format_engine_research(&response)
            .ok_or_else(|| StageFailure::new(stage, "empty engine research response"))
    }

    fn research_engine_fallback(&self, car_name: &str, lang: Lang) -> Result<String, StageFailure> {
        let stage = EnrichmentStage::EngineFallbackResearch;
        let prompt = build_research_prompt(car_name, ResearchScope::EngineOnly, lang);
        let response = self
            .generator
            .generate(&GenerationRequest::text(ModelRole::Research, prompt))
            .map_err(|e| StageFailure::new(stage, e.to_string()))?;

        let researched = try_parse(&response).map_err(|e| StageFailure::new(stage, e.to_string()))?;
        if researched.has_engine_detail() {
            Ok(researched.engine_detail)
        } else {
            Err(StageFailure::new(stage, "research returned no engine section"))
        }
    }

    // ── General stage ───────────────────────────────────────

    fn general_stage(
        &self,
        record: &mut CarSpecRecord,
        gaps: &BTreeSet<GapField>,
        lang: Lang,
    ) -> Result<(), StageFailure> {
        let stage = EnrichmentStage::GeneralResearch;
        let prompt = build_research_prompt(&record.car_name, ResearchScope::Full, lang);
        let response = self
            .generator
            .generate(&GenerationRequest::text(ModelRole::Research, prompt))
            .map_err(|e| StageFailure::new(stage, e.to_string()))?;

        let researched = try_parse(&response).map_err(|e| StageFailure::new(stage, e.to_string()))?;
        merge_research(record, researched, gaps);
        let filled: Vec<&str> = gaps.iter().map(GapField::name).collect();
        tracing::info!(filled = ?filled, "General research merged");
        Ok(())
    }
}

/// Merge a researched record into `record`.
///
/// Metrics named in `gaps` are overwritten unconditionally, even when the
/// researched value is itself `N/A`. Long-form sections are only replaced
/// while the local value is still a sentinel.
pub fn merge_research(record: &mut CarSpecRecord, researched: CarSpecRecord, gaps: &BTreeSet<GapField>) {
    for field in gaps {
        *field.value_mut(record) = field.value(&researched).to_string();
    }

    if is_long_form_sentinel(LongFormField::EngineDetail, &record.engine_detail) {
        record.engine_detail = researched.engine_detail;
    }
    if is_long_form_sentinel(LongFormField::Interior, &record.interior) {
        record.interior = researched.interior;
    }
    if is_long_form_sentinel(LongFormField::Description, &record.description) {
        record.description = researched.description;
    }
}

/// Re-shape a free-form engine answer into `- ` bullet lines.
///
/// Blocks that already start with a dash are kept verbatim; every line of
/// any other block becomes its own bullet. Returns `None` when nothing
/// usable remains.
pub fn format_engine_research(text: &str) -> Option<String> {
    let mut lines: Vec<String> = Vec::new();

    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        if block.starts_with('-') {
            lines.push(block.to_string());
        } else {
            lines.extend(
                block
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(|l| format!("- {l}")),
            );
        }
    }

    let formatted = lines.join("\n");
    if is_long_form_sentinel(LongFormField::EngineDetail, &formatted)
        || formatted.trim_start_matches("- ") == LongFormField::EngineDetail.sentinel()
    {
        None
    } else {
        Some(formatted)
    }
}
