use std::collections::BTreeSet;

use super::types::{is_long_form_sentinel, is_not_available, CarSpecRecord, GapField, LongFormField};

/// Phrase the vision model emits when it could not read the engine bay.
pub const ENGINE_RESEARCH_MARKER: &str = "needs the engine specifications";

/// Metric fields that are empty or `N/A`.
pub fn detect_gaps(record: &CarSpecRecord) -> BTreeSet<GapField> {
    GapField::ALL
        .into_iter()
        .filter(|field| is_not_available(field.value(record)))
        .collect()
}

/// Whether the engine section should get a dedicated research query.
pub fn needs_engine_research(record: &CarSpecRecord) -> bool {
    is_long_form_sentinel(LongFormField::EngineDetail, &record.engine_detail)
        || record.engine_detail.contains(ENGINE_RESEARCH_MARKER)
}
