// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language detection for OCR output
//!
//! Keyword frequency plus a diacritic bonus, scoring Vietnamese against
//! English. Ties and text too short to judge resolve to the default language.

/// Sentinel requesting automatic detection
pub const AUTO_LANGUAGE: &str = "auto";

/// Text with fewer non-whitespace characters than this is not scored
const MIN_SCORABLE_CHARS: usize = 8;

/// Phrases common on Vietnamese identity documents and in general text
const VIETNAMESE_INDICATORS: &[&str] = &[
    // Card labels
    "căn cước", "công dân", "chứng minh", "nhân dân", "họ và tên", "họ tên",
    "ngày sinh", "giới tính", "quốc tịch", "quê quán", "nơi thường trú",
    "nơi cư trú", "có giá trị đến", "cộng hòa", "xã hội chủ nghĩa",
    "việt nam", "độc lập", "tự do", "hạnh phúc",
    // Common words
    "của ", "và ", "là ", "không ", "người ", "được ", "những ", "tỉnh ",
    "thành phố", "quận ", "huyện ", "phường ", "đường ",
];

/// Phrases common on English identity documents and in general text
const ENGLISH_INDICATORS: &[&str] = &[
    // Card labels
    "identity", "identification", "card", "name", "surname", "given names",
    "date of birth", "place of birth", "address", "nationality", "sex",
    "gender", "expiry", "issued", "valid until", "driver", "license",
    "licence", "passport",
    // Common words
    "the ", " of ", "and ", "for ", "with ", "this ", "that ", "from ",
    "street", "road", "avenue",
];

/// Detects the primary language of a block of text
pub trait LanguageDetector: Send + Sync {
    /// Best-guess language code for `text`. Never returns `AUTO_LANGUAGE`.
    fn detect(&self, text: &str) -> String;

    fn name(&self) -> &str {
        "language-detector"
    }
}

/// Returns true when `preference` asks for automatic detection
///
/// Matching is case-insensitive; blank input counts as automatic.
pub fn is_auto(preference: &str) -> bool {
    let trimmed = preference.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO_LANGUAGE)
}

/// Heuristic `vi` / `en` detector
#[derive(Debug, Clone)]
pub struct HeuristicLanguageDetector {
    default_language: String,
}

impl HeuristicLanguageDetector {
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
        }
    }
}

impl Default for HeuristicLanguageDetector {
    fn default() -> Self {
        Self::new("en")
    }
}

impl LanguageDetector for HeuristicLanguageDetector {
    fn detect(&self, text: &str) -> String {
        let scorable = text.chars().filter(|c| !c.is_whitespace()).count();
        if scorable < MIN_SCORABLE_CHARS {
            return self.default_language.clone();
        }

        let lower = text.to_lowercase();
        let vietnamese = count_indicators(&lower, VIETNAMESE_INDICATORS)
            + count_vietnamese_letters(&lower);
        let english = count_indicators(&lower, ENGLISH_INDICATORS);

        tracing::debug!(vietnamese, english, "Language scores");

        match vietnamese.cmp(&english) {
            std::cmp::Ordering::Greater => "vi".to_string(),
            std::cmp::Ordering::Less => "en".to_string(),
            std::cmp::Ordering::Equal => self.default_language.clone(),
        }
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

fn count_indicators(lower_text: &str, indicators: &[&str]) -> u32 {
    indicators
        .iter()
        .map(|indicator| lower_text.matches(indicator).count() as u32)
        .sum()
}

/// Letters that only Vietnamese uses among Latin scripts, two per point
fn count_vietnamese_letters(lower_text: &str) -> u32 {
    let count = lower_text
        .chars()
        .filter(|&ch| matches!(ch, 'ă' | 'đ' | 'ơ' | 'ư' | '\u{1EA0}'..='\u{1EF9}'))
        .count() as u32;
    count / 2
}
