//! Language normalization of a finished record.
//!
//! Free-text sections are split into blank-line separated units; only the
//! units that are not already in the target language are sent for
//! translation. `price` gets a fixed phrase swap instead of a model call.

use std::sync::Arc;

use serde::Serialize;

use super::language::{KeywordLanguageDetector, LanguageDetector};
use super::prompt::build_translation_prompt;
use super::types::{
    is_long_form_sentinel, CarSpecRecord, GenerationRequest, Lang, LongFormField, ModelRole,
    TextGenerator, NO_DESCRIPTION, NO_ENGINE_DETAILS, NO_INTERIOR_DETAILS, UNABLE_TO_EXTRACT,
};
use super::AnalysisError;

/// Price phrases swapped between languages, longest first.
const PRICE_PHRASES: &[(&str, &str)] = &[
    (
        "depending on year and trim level",
        "tùy thuộc vào phiên bản và năm sản xuất",
    ),
    ("depending on", "tùy thuộc"),
];

/// Long-form placeholders in both languages, swapped without a model call.
const SENTINEL_PHRASES: &[(&str, &str)] = &[
    (NO_DESCRIPTION, "Không có mô tả chi tiết."),
    (NO_ENGINE_DETAILS, "Không có thông tin chi tiết về động cơ."),
    (NO_INTERIOR_DETAILS, "Không có thông tin chi tiết về nội thất."),
    (
        UNABLE_TO_EXTRACT,
        "Không thể trích xuất thông tin chi tiết từ hình ảnh.",
    ),
];

/// Vietnamese fragments that mark a price as needing the English swap.
const VIETNAMESE_PRICE_HINTS: &[&str] = &["tùy thuộc", "phiên bản", "năm sản xuất"];

/// A field left untranslated because a unit failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationFailure {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub record: CarSpecRecord,
    pub failures: Vec<TranslationFailure>,
}

pub struct Normalizer {
    generator: Arc<dyn TextGenerator>,
    detector: Box<dyn LanguageDetector>,
}

impl Normalizer {
    /// Normalizer using the keyword detector.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::with_detector(generator, Box::new(KeywordLanguageDetector))
    }

    pub fn with_detector(
        generator: Arc<dyn TextGenerator>,
        detector: Box<dyn LanguageDetector>,
    ) -> Self {
        Self {
            generator,
            detector,
        }
    }

    /// Bring every free-text field of `record` into `target`.
    ///
    /// `features` is re-derived from the normalized interior before its
    /// entries are normalized.
    pub fn normalize(&self, mut record: CarSpecRecord, target: Lang) -> NormalizeOutcome {
        let _span = tracing::info_span!("normalize", target = %target).entered();
        let mut failures = Vec::new();

        record.price = substitute_price_phrases(&record.price, target);

        for field in [
            LongFormField::Description,
            LongFormField::Interior,
            LongFormField::EngineDetail,
        ] {
            let value = long_form_mut(&mut record, field);
            if let Some(swapped) = localize_sentinel(value, target) {
                *value = swapped.to_string();
                continue;
            }
            if is_long_form_sentinel(field, value) {
                continue;
            }
            match self.translate_text(value, target) {
                Ok(translated) => *value = translated,
                Err(e) => {
                    tracing::warn!(field = field.name(), error = %e, "Translation failed, field kept");
                    failures.push(TranslationFailure {
                        field: field.name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        record.refresh_features();
        for (idx, feature) in record.features.iter_mut().enumerate() {
            match self.translate_text(feature, target) {
                Ok(translated) => *feature = translated,
                Err(e) => {
                    tracing::warn!(index = idx, error = %e, "Feature translation failed, entry kept");
                    failures.push(TranslationFailure {
                        field: format!("features[{idx}]"),
                        reason: e.to_string(),
                    });
                }
            }
        }

        NormalizeOutcome { record, failures }
    }

    /// Translate the units of `text` that are not already in `target`.
    ///
    /// Any unit failure fails the whole text so callers can keep the
    /// original value intact.
    pub fn translate_text(&self, text: &str, target: Lang) -> Result<String, AnalysisError> {
        let mut units: Vec<String> = Vec::new();

        for unit in text.split("\n\n").filter(|u| !u.trim().is_empty()) {
            if self.detector.is_in_language(unit, target) {
                units.push(unit.to_string());
                continue;
            }

            let request = GenerationRequest::text(
                ModelRole::Translation,
                build_translation_prompt(unit, target),
            );
            let translated = self.generator.generate(&request)?;
            let translated = translated.trim();
            if translated.is_empty() {
                return Err(AnalysisError::MalformedResponse("Empty translation".into()));
            }
            units.push(translated.to_string());
        }

        Ok(units.join("\n\n"))
    }
}

fn long_form_mut(record: &mut CarSpecRecord, field: LongFormField) -> &mut String {
    match field {
        LongFormField::Description => &mut record.description,
        LongFormField::Interior => &mut record.interior,
        LongFormField::EngineDetail => &mut record.engine_detail,
    }
}

/// The `target` form of a long-form placeholder, or `None` for real content.
pub fn localize_sentinel(value: &str, target: Lang) -> Option<&'static str> {
    let v = value.trim();
    SENTINEL_PHRASES
        .iter()
        .find(|(en, vi)| v == *en || v == *vi)
        .map(|(en, vi)| match target {
            Lang::En => *en,
            Lang::Vi => *vi,
        })
}

/// Swap the known price qualifiers into `target`.
pub fn substitute_price_phrases(price: &str, target: Lang) -> String {
    let lower = price.to_lowercase();
    let mut out = price.to_string();
    match target {
        Lang::Vi => {
            if lower.contains("depending on") {
                for (en, vi) in PRICE_PHRASES {
                    out = out.replace(en, vi);
                }
            }
        }
        Lang::En => {
            if VIETNAMESE_PRICE_HINTS.iter().any(|h| lower.contains(h)) {
                for (en, vi) in PRICE_PHRASES {
                    out = out.replace(vi, en);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analysis::gemini::MockGenerator;
    use crate::pipeline::analysis::parser::parse;

    fn normalizer(mock: &Arc<MockGenerator>) -> Normalizer {
        Normalizer::new(mock.clone() as Arc<dyn TextGenerator>)
    }

    #[test]
    fn target_language_marker_paragraph_not_translated() {
        let mock = Arc::new(MockGenerator::new("SHOULD NOT APPEAR"));
        let text = "động cơ nội thất tính năng";
        let out = normalizer(&mock).translate_text(text, Lang::Vi).unwrap();
        assert_eq!(out, text);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn only_foreign_units_are_translated() {
        let mock = Arc::new(MockGenerator::new("• Ghế: vải"));
        let text = "Xe có động cơ mạnh mẽ.\n\n• Seating: cloth";
        let out = normalizer(&mock).translate_text(text, Lang::Vi).unwrap();
        assert_eq!(out, "Xe có động cơ mạnh mẽ.\n\n• Ghế: vải");
        assert_eq!(mock.calls_for(ModelRole::Translation), 1);
        assert!(mock.prompts_for(ModelRole::Translation)[0].contains("• Seating: cloth"));
    }

    #[test]
    fn english_target_skips_english_units() {
        let mock = Arc::new(MockGenerator::new("unused"));
        let text = "A reliable sedan.\n\n• Seating: cloth";
        let out = normalizer(&mock).translate_text(text, Lang::En).unwrap();
        assert_eq!(out, text);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn blank_units_are_dropped() {
        let mock = Arc::new(MockGenerator::new("unused"));
        let out = normalizer(&mock)
            .translate_text("First.\n\n\n\nSecond.", Lang::En)
            .unwrap();
        assert_eq!(out, "First.\n\nSecond.");
    }

    #[test]
    fn failed_field_is_left_unchanged() {
        let mock = Arc::new(
            MockGenerator::failing(500)
                .then(ModelRole::Translation, "Một chiếc sedan đáng tin cậy."),
        );
        let record = parse(
            "Brand: Toyota\nOverview:\nA reliable sedan.\nInterior & Features:\n- Seating: cloth",
        );
        let outcome = normalizer(&mock).normalize(record, Lang::Vi);

        assert_eq!(outcome.record.description, "Một chiếc sedan đáng tin cậy.");
        assert_eq!(outcome.record.interior, "• Seating: cloth");
        assert_eq!(outcome.failures.len(), 2);
        assert_eq!(outcome.failures[0].field, "interior");
        assert_eq!(outcome.failures[1].field, "features[0]");
        assert_eq!(outcome.record.features, vec!["Seating: cloth"]);
    }

    #[test]
    fn sentinels_use_fixed_vietnamese_text() {
        let mock = Arc::new(MockGenerator::new("translated"));
        let record = parse("Brand: Toyota\nModel: Corolla");
        let outcome = normalizer(&mock).normalize(record, Lang::Vi);
        assert_eq!(outcome.record.description, "Không có mô tả chi tiết.");
        assert_eq!(
            outcome.record.engine_detail,
            "Không có thông tin chi tiết về động cơ."
        );
        assert_eq!(
            outcome.record.interior,
            "Không có thông tin chi tiết về nội thất."
        );
        assert!(outcome.record.features.is_empty());
        assert!(outcome.failures.is_empty());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn sentinels_swap_back_to_english() {
        assert_eq!(
            localize_sentinel("Không có mô tả chi tiết.", Lang::En),
            Some(NO_DESCRIPTION)
        );
        assert_eq!(localize_sentinel(NO_ENGINE_DETAILS, Lang::En), Some(NO_ENGINE_DETAILS));
        assert_eq!(localize_sentinel("A reliable sedan.", Lang::Vi), None);

        let mock = Arc::new(MockGenerator::new("unused"));
        let record = parse("Brand: Toyota");
        let outcome = normalizer(&mock).normalize(record, Lang::En);
        assert_eq!(outcome.record.description, NO_DESCRIPTION);
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn vietnamese_unit_translated_for_english_target() {
        let mock = Arc::new(MockGenerator::new("A powerful engine."));
        let text = "Xe có động cơ mạnh mẽ.\n\nA reliable sedan.";
        let out = normalizer(&mock).translate_text(text, Lang::En).unwrap();
        assert_eq!(out, "A powerful engine.\n\nA reliable sedan.");
        assert_eq!(mock.calls_for(ModelRole::Translation), 1);
        let prompt = &mock.prompts_for(ModelRole::Translation)[0];
        assert!(prompt.contains("Xe có động cơ mạnh mẽ."));
        assert!(!prompt.contains("A reliable sedan."));
    }

    #[test]
    fn features_follow_translated_interior() {
        let mock = Arc::new(MockGenerator::new("• Ghế: vải\n• Màn hình: cảm ứng"));
        let record = parse("Interior & Features:\n- Seating: cloth\n- Screen: touch");
        let outcome = normalizer(&mock).normalize(record, Lang::Vi);
        assert_eq!(outcome.record.interior, "• Ghế: vải\n• Màn hình: cảm ứng");
        assert_eq!(outcome.record.features, vec!["Ghế: vải", "Màn hình: cảm ứng"]);
        // one call for interior, features already Vietnamese
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn custom_detector_is_used() {
        struct AlwaysMatches;
        impl LanguageDetector for AlwaysMatches {
            fn is_in_language(&self, _text: &str, _lang: Lang) -> bool {
                true
            }
        }
        let mock = Arc::new(MockGenerator::new("unused"));
        let normalizer =
            Normalizer::with_detector(mock.clone() as Arc<dyn TextGenerator>, Box::new(AlwaysMatches));
        let record = parse("Overview:\nA reliable sedan.");
        let outcome = normalizer.normalize(record, Lang::Vi);
        assert_eq!(outcome.record.description, "A reliable sedan.");
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn price_phrase_swapped_to_vietnamese() {
        assert_eq!(
            substitute_price_phrases("$25,000 - $30,000 depending on year and trim level", Lang::Vi),
            "$25,000 - $30,000 tùy thuộc vào phiên bản và năm sản xuất"
        );
        assert_eq!(
            substitute_price_phrases("$40,000 depending on options", Lang::Vi),
            "$40,000 tùy thuộc options"
        );
        assert_eq!(substitute_price_phrases("$25,000", Lang::Vi), "$25,000");
    }

    #[test]
    fn price_phrase_swapped_to_english() {
        assert_eq!(
            substitute_price_phrases("$25,000 tùy thuộc vào phiên bản và năm sản xuất", Lang::En),
            "$25,000 depending on year and trim level"
        );
        assert_eq!(substitute_price_phrases("$25,000", Lang::En), "$25,000");
    }
}
