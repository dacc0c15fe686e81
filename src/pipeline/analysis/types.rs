use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AnalysisError;

// ═══════════════════════════════════════════════════════════
// Sentinels
// ═══════════════════════════════════════════════════════════

/// Placeholder for short scalar fields.
pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_CAR: &str = "Unknown Car";
pub const NO_ENGINE_DETAILS: &str = "No engine details available.";
pub const NO_INTERIOR_DETAILS: &str = "No interior details available.";
pub const NO_DESCRIPTION: &str = "No detailed description available.";
/// Description of the fallback record produced when parsing fails outright.
pub const UNABLE_TO_EXTRACT: &str = "Unable to extract detailed information from the image.";

/// Bullet prefix used when rendering section buffers.
pub const BULLET: &str = "• ";

/// Bullet markers recognised on input lines.
const BULLET_MARKERS: &[char] = &['•', '-', '*'];

/// True when the value is empty or the `N/A` placeholder.
pub fn is_not_available(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v == NOT_AVAILABLE
}

/// Strip one leading bullet marker (and the whitespace after it).
/// Returns `None` when the line is not a bullet line.
pub fn strip_bullet(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix(BULLET_MARKERS)?;
    Some(rest.trim())
}

// ═══════════════════════════════════════════════════════════
// Language
// ═══════════════════════════════════════════════════════════

/// Output language of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    En,
    #[default]
    Vi,
}

impl Lang {
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Vi => "vi",
        }
    }

    /// Language name as used inside prompts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Vi => "Vietnamese",
        }
    }

    /// Lenient parse for request parameters; anything unknown maps to the default.
    pub fn from_param(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Lang {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "vi" => Ok(Self::Vi),
            other => Err(format!("Unsupported language: {other}")),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CarSpecRecord
// ═══════════════════════════════════════════════════════════

/// Structured specification of one analyzed vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarSpecRecord {
    pub car_name: String,
    pub brand: String,
    pub model: String,
    pub year: String,
    pub price: String,
    pub power: String,
    pub acceleration: String,
    pub top_speed: String,
    pub description: String,
    pub engine_detail: String,
    pub interior: String,
    pub features: Vec<String>,
    /// Seconds spent in the pipeline.
    pub processing_time: f64,
    pub timestamp: DateTime<Utc>,
}

impl CarSpecRecord {
    /// Canonical record returned when the analysis text cannot be parsed.
    pub fn fallback() -> Self {
        Self {
            car_name: UNKNOWN_CAR.to_string(),
            brand: NOT_AVAILABLE.to_string(),
            model: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            price: NOT_AVAILABLE.to_string(),
            power: NOT_AVAILABLE.to_string(),
            acceleration: NOT_AVAILABLE.to_string(),
            top_speed: NOT_AVAILABLE.to_string(),
            description: UNABLE_TO_EXTRACT.to_string(),
            engine_detail: NO_ENGINE_DETAILS.to_string(),
            interior: NO_INTERIOR_DETAILS.to_string(),
            features: Vec::new(),
            processing_time: 0.0,
            timestamp: Utc::now(),
        }
    }

    pub fn has_engine_detail(&self) -> bool {
        !is_long_form_sentinel(LongFormField::EngineDetail, &self.engine_detail)
    }

    pub fn has_interior(&self) -> bool {
        !is_long_form_sentinel(LongFormField::Interior, &self.interior)
    }

    pub fn has_description(&self) -> bool {
        !is_long_form_sentinel(LongFormField::Description, &self.description)
    }

    /// Re-derive `features` from `interior`: one entry per bullet line.
    pub fn refresh_features(&mut self) {
        self.features = derive_features(&self.interior);
    }
}

/// Build the display name from brand and model.
pub fn compose_car_name(brand: &str, model: &str) -> String {
    let name = format!("{} {}", brand.trim(), model.trim());
    let name = name.trim();
    if name.is_empty() {
        UNKNOWN_CAR.to_string()
    } else {
        name.to_string()
    }
}

/// Extract feature entries from an interior section.
pub fn derive_features(interior: &str) -> Vec<String> {
    if is_long_form_sentinel(LongFormField::Interior, interior) {
        return Vec::new();
    }
    interior
        .lines()
        .filter_map(strip_bullet)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Long-form sections that carry a field-specific sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LongFormField {
    Description,
    EngineDetail,
    Interior,
}

impl LongFormField {
    pub fn sentinel(&self) -> &'static str {
        match self {
            Self::Description => NO_DESCRIPTION,
            Self::EngineDetail => NO_ENGINE_DETAILS,
            Self::Interior => NO_INTERIOR_DETAILS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::EngineDetail => "engineDetail",
            Self::Interior => "interior",
        }
    }
}

/// True when a long-form section holds no real content.
pub fn is_long_form_sentinel(field: LongFormField, value: &str) -> bool {
    let v = value.trim();
    v.is_empty()
        || v == field.sentinel()
        || (field == LongFormField::Description && v == UNABLE_TO_EXTRACT)
}

// ═══════════════════════════════════════════════════════════
// Gap fields
// ═══════════════════════════════════════════════════════════

/// Metric fields eligible for general research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GapField {
    Power,
    Acceleration,
    TopSpeed,
}

impl GapField {
    pub const ALL: [GapField; 3] = [GapField::Power, GapField::Acceleration, GapField::TopSpeed];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Acceleration => "acceleration",
            Self::TopSpeed => "topSpeed",
        }
    }

    pub fn value<'a>(&self, record: &'a CarSpecRecord) -> &'a str {
        match self {
            Self::Power => &record.power,
            Self::Acceleration => &record.acceleration,
            Self::TopSpeed => &record.top_speed,
        }
    }

    pub fn value_mut<'a>(&self, record: &'a mut CarSpecRecord) -> &'a mut String {
        match self {
            Self::Power => &mut record.power,
            Self::Acceleration => &mut record.acceleration,
            Self::TopSpeed => &mut record.top_speed,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Text generation seam
// ═══════════════════════════════════════════════════════════

/// Which model endpoint a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    /// Photo analysis (vision model, strict timeouts).
    Analysis,
    /// Gap research (engine + general).
    Research,
    /// Section translation.
    Translation,
}

/// Image attached inline to a generation request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 (standard alphabet) payload.
    pub data: String,
}

impl InlineImage {
    pub fn jpeg(data: String) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }
}

/// One outbound text-generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub role: ModelRole,
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl GenerationRequest {
    pub fn text(role: ModelRole, prompt: String) -> Self {
        Self {
            role,
            prompt,
            image: None,
        }
    }

    pub fn with_image(role: ModelRole, prompt: String, image: InlineImage) -> Self {
        Self {
            role,
            prompt,
            image: Some(image),
        }
    }
}

/// Text-generation client abstraction (allows mocking).
pub trait TextGenerator: Send + Sync {
    /// Issue one request and return the first candidate's first text part.
    fn generate(&self, request: &GenerationRequest) -> Result<String, AnalysisError>;
}
