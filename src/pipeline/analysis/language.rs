//! Lightweight language detection for record sections.
//!
//! Only English and Vietnamese are in play. Vietnamese is recognised by a
//! small vocabulary of automotive marker words and by letters that do not
//! occur in English; text with no Vietnamese signal is treated as English.

use std::sync::LazyLock;

use regex::Regex;

use super::types::Lang;

/// Strategy deciding whether a text unit is already in a language.
pub trait LanguageDetector: Send + Sync {
    fn is_in_language(&self, text: &str, lang: Lang) -> bool;
}

/// Vietnamese automotive marker words.
pub const VIETNAMESE_MARKERS: &[&str] = &[
    "động cơ",
    "nội thất",
    "tính năng",
    "công suất",
    "tốc độ",
    "xe",
    "hệ thống",
    "trang bị",
];

/// Marker words, matched whole-word and case-insensitively.
static VIETNAMESE_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = VIETNAMESE_MARKERS
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).expect("Invalid marker regex pattern")
});

/// Keyword + letter heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordLanguageDetector;

impl KeywordLanguageDetector {
    /// Count of Vietnamese signals in `text`.
    pub fn vietnamese_score(text: &str) -> usize {
        let markers = VIETNAMESE_MARKER_RE.find_iter(text).count();
        let letters = text.chars().filter(|c| is_vietnamese_letter(*c)).count();
        markers + letters
    }
}

impl LanguageDetector for KeywordLanguageDetector {
    fn is_in_language(&self, text: &str, lang: Lang) -> bool {
        let vietnamese = Self::vietnamese_score(text) > 0;
        match lang {
            Lang::Vi => vietnamese,
            Lang::En => !vietnamese,
        }
    }
}

/// Letters specific to Vietnamese orthography (never used in English or
/// in the European brand names the model tends to output).
fn is_vietnamese_letter(c: char) -> bool {
    matches!(
        c.to_lowercase().next().unwrap_or(c),
        'đ' | 'ă' | 'ơ' | 'ư'
            | 'ạ' | 'ả' | 'ấ' | 'ầ' | 'ẩ' | 'ẫ' | 'ậ' | 'ắ' | 'ằ' | 'ẳ' | 'ẵ' | 'ặ'
            | 'ẹ' | 'ẻ' | 'ẽ' | 'ế' | 'ề' | 'ể' | 'ễ' | 'ệ'
            | 'ỉ' | 'ĩ' | 'ị'
            | 'ọ' | 'ỏ' | 'ố' | 'ồ' | 'ổ' | 'ỗ' | 'ộ' | 'ớ' | 'ờ' | 'ở' | 'ỡ' | 'ợ'
            | 'ủ' | 'ũ' | 'ụ' | 'ứ' | 'ừ' | 'ử' | 'ữ' | 'ự'
            | 'ỳ' | 'ỷ' | 'ỹ' | 'ỵ'
    )
}
