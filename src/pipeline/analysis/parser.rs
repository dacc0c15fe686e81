//! Response parser: loosely formatted model text → `CarSpecRecord`.
//!
//! The model is asked for `Key: value` metric lines and three bulleted
//! sections, but in practice headers drift, bullets change and lines go
//! missing. The scan below is deliberately line-local so that one odd line
//! never derails the rest of the text.

use chrono::Utc;

use super::types::{
    compose_car_name, derive_features, strip_bullet, CarSpecRecord, BULLET, NOT_AVAILABLE,
    NO_DESCRIPTION, NO_ENGINE_DETAILS, NO_INTERIOR_DETAILS,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Analysis text is empty")]
    EmptyInput,

    #[error("Metric line has no value: {line}")]
    MissingValue { line: String },
}

/// Section currently receiving body lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Overview,
    Engine,
    Interior,
}

impl Section {
    /// Classify a header label (text before the trailing colon).
    fn from_header(label: &str) -> Option<Self> {
        let label = label.to_lowercase();
        if label.contains("overview") {
            Some(Self::Overview)
        } else if label.contains("engine") {
            Some(Self::Engine)
        } else if label.contains("interior") || label.contains("features") {
            Some(Self::Interior)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
struct ScanState {
    brand: String,
    model: String,
    year: String,
    price: String,
    power: String,
    acceleration: String,
    top_speed: String,
    overview: Vec<String>,
    engine: Vec<String>,
    interior: Vec<String>,
    current: Option<Section>,
}

impl ScanState {
    fn buffer(&mut self, section: Section) -> &mut Vec<String> {
        match section {
            Section::Overview => &mut self.overview,
            Section::Engine => &mut self.engine,
            Section::Interior => &mut self.interior,
        }
    }
}

/// Parse model text into a record. Never fails: any parse error yields
/// the canonical fallback record.
pub fn parse(raw_text: &str) -> CarSpecRecord {
    parse_with_fallback(raw_text).0
}

/// Like [`parse`], but also hands back the error that forced the fallback.
pub fn parse_with_fallback(raw_text: &str) -> (CarSpecRecord, Option<ParseError>) {
    match try_parse(raw_text) {
        Ok(record) => (record, None),
        Err(e) => {
            tracing::warn!(error = %e, "Falling back to empty car record");
            (CarSpecRecord::fallback(), Some(e))
        }
    }
}

/// Fallible parse. Used directly by enrichment, where a parse failure
/// means "skip this stage" rather than "use the fallback record".
pub fn try_parse(raw_text: &str) -> Result<CarSpecRecord, ParseError> {
    if raw_text.trim().is_empty() {
        return Err(ParseError::EmptyInput);
    }

    let mut state = ScanState::default();

    for line in raw_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        scan_line(&mut state, line)?;
    }

    Ok(finalize(state))
}

fn scan_line(state: &mut ScanState, line: &str) -> Result<(), ParseError> {
    // 1. Bare section header
    if let Some(label) = line.strip_suffix(':') {
        if let Some(section) = Section::from_header(label) {
            state.current = Some(section);
        }
        return Ok(());
    }

    let lower = line.to_lowercase();

    // 2. Metrics, wherever they appear
    if lower.contains("power:") {
        state.power = value_after_colon(line)?;
        return Ok(());
    }
    if lower.contains("0-60") || lower.contains("0-100") {
        state.acceleration = value_after_colon(line)?;
        return Ok(());
    }
    if lower.contains("top speed") {
        state.top_speed = value_after_colon(line)?;
        return Ok(());
    }

    // 3. Identity key: value lines
    let bullet = strip_bullet(line);
    if bullet.is_none() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();
            if key.contains("brand") {
                state.brand = value;
            } else if key.contains("model") {
                state.model = value;
            } else if key.contains("year") {
                state.year = value;
            } else if key.contains("price") {
                state.price = value;
            }
            return Ok(());
        }
    }

    // 4. Section body
    if let Some(section) = state.current {
        let entry = bullet.unwrap_or(line);
        if !entry.is_empty() {
            state.buffer(section).push(entry.to_string());
        }
    }

    Ok(())
}

fn value_after_colon(line: &str) -> Result<String, ParseError> {
    line.split_once(':')
        .map(|(_, value)| value.trim().to_string())
        .ok_or_else(|| ParseError::MissingValue {
            line: line.to_string(),
        })
}

fn bulleted(lines: &[String]) -> String {
    lines
        .iter()
        .map(|l| format!("{BULLET}{l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn or_sentinel(value: String, sentinel: &str) -> String {
    if value.trim().is_empty() {
        sentinel.to_string()
    } else {
        value
    }
}

fn finalize(state: ScanState) -> CarSpecRecord {
    let car_name = compose_car_name(&state.brand, &state.model);
    let description = state.overview.join(" ").trim().to_string();
    let engine_detail = bulleted(&state.engine);
    let interior = or_sentinel(bulleted(&state.interior), NO_INTERIOR_DETAILS);
    let features = derive_features(&interior);

    CarSpecRecord {
        car_name,
        brand: or_sentinel(state.brand, NOT_AVAILABLE),
        model: or_sentinel(state.model, NOT_AVAILABLE),
        year: or_sentinel(state.year, NOT_AVAILABLE),
        price: or_sentinel(state.price, NOT_AVAILABLE),
        power: or_sentinel(state.power, NOT_AVAILABLE),
        acceleration: or_sentinel(state.acceleration, NOT_AVAILABLE),
        top_speed: or_sentinel(state.top_speed, NOT_AVAILABLE),
        description: or_sentinel(description, NO_DESCRIPTION),
        engine_detail: or_sentinel(engine_detail, NO_ENGINE_DETAILS),
        interior,
        features,
        processing_time: 0.0,
        timestamp: Utc::now(),
    }
}
