// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structured field extraction from OCR text
//!
//! Each language has a rule set mapping a field name to a regex whose first
//! capture group holds the value. Rule sets can be extended or overridden
//! with a `patterns.toml` in the language's rules directory:
//!
//! ```toml
//! [fields]
//! id_number = '(?m)^ID[ \t]*:[ \t]*(\d{9})$'
//! ```

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Override file looked up in each rules directory
pub const PATTERNS_FILE: &str = "patterns.toml";

/// Language whose rules are used when no rule set matches
pub const FALLBACK_LANGUAGE: &str = "en";

/// Fields surfaced as first-class response fields
pub const PRIMARY_FIELDS: [&str; 4] = ["id_number", "name", "date_of_birth", "address"];

/// Field name to extracted value
pub type ExtractedFields = BTreeMap<String, String>;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: String, message: String },

    #[error("Pattern for field '{0}' has no capture group")]
    MissingCaptureGroup(String),

    #[error("Failed to read {path}: {message}")]
    OverrideFile { path: PathBuf, message: String },
}

/// Pulls structured fields out of document text
pub trait InfoExtractor: Send + Sync {
    /// Fields found in `text` for `language`. Fields that are not found are
    /// absent from the map.
    fn extract(&self, text: &str, language: &str) -> Result<ExtractedFields, ExtractionError>;

    fn name(&self) -> &str {
        "info-extractor"
    }
}

const DATE: &str = r"(\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2,4}|\d{4}-\d{2}-\d{2})";

fn english_rules() -> Vec<(&'static str, String)> {
    vec![
        (
            "id_number",
            r"(?mi)\b(?:id|identity[ \t]+card|card|document|passport)[ \t]*(?:no\.?|number|#)[ \t]*[:.]?[ \t]*([A-Z0-9][A-Z0-9\-]{4,})".to_string(),
        ),
        (
            "name",
            r"(?mi)^[ \t]*(?:full[ \t]+)?name[ \t]*[:.]?[ \t]*(.+?)[ \t]*$".to_string(),
        ),
        (
            "date_of_birth",
            format!(r"(?mi)\b(?:date[ \t]+of[ \t]+birth|dob|birth[ \t]*date)[ \t]*[:.]?[ \t]*{DATE}"),
        ),
        (
            "address",
            r"(?mi)^[ \t]*(?:address|residence|place[ \t]+of[ \t]+residence)[ \t]*[:.]?[ \t]*(.+?)[ \t]*$".to_string(),
        ),
        (
            "sex",
            r"(?mi)\b(?:sex|gender)[ \t]*[:.]?[ \t]*(male|female|m|f)\b".to_string(),
        ),
        (
            "nationality",
            r"(?mi)\bnationality[ \t]*[:.]?[ \t]*([a-z][a-z \t]*[a-z])[ \t]*$".to_string(),
        ),
        (
            "date_of_expiry",
            format!(r"(?mi)\b(?:date[ \t]+of[ \t]+expiry|expiry(?:[ \t]+date)?|expires|valid[ \t]+until)[ \t]*[:.]?[ \t]*{DATE}"),
        ),
    ]
}

/// Vietnamese citizen identity card labels, with the bilingual
/// `label / English label` form printed on newer cards
fn vietnamese_rules() -> Vec<(&'static str, String)> {
    vec![
        (
            "id_number",
            r"(?mi)(?:số|no\.?)[^\d\n]{0,40}(\d{9,12})\b".to_string(),
        ),
        (
            "name",
            r"(?mi)^[ \t]*họ[ \t]+(?:và[ \t]+)?tên(?:[ \t]*/[ \t]*full[ \t]+name)?[ \t]*[:.]?[ \t]*(.+?)[ \t]*$".to_string(),
        ),
        (
            "date_of_birth",
            format!(r"(?mi)ngày[ \t]+sinh(?:[ \t]*/[ \t]*date[ \t]+of[ \t]+birth)?[ \t]*[:.]?[ \t]*{DATE}"),
        ),
        (
            "address",
            r"(?mi)^[ \t]*(?:nơi[ \t]+thường[ \t]+trú|nơi[ \t]+cư[ \t]+trú|địa[ \t]+chỉ)(?:[ \t]*/[ \t]*place[ \t]+of[ \t]+residence)?[ \t]*[:.]?[ \t]*(.+?)[ \t]*$".to_string(),
        ),
        (
            "sex",
            r"(?mi)giới[ \t]+tính(?:[ \t]*/[ \t]*sex)?[ \t]*[:.]?[ \t]*(nam|nữ)".to_string(),
        ),
        (
            "nationality",
            r"(?mi)quốc[ \t]+tịch(?:[ \t]*/[ \t]*nationality)?[ \t]*[:.]?[ \t]*([^\n]+?)[ \t]*$".to_string(),
        ),
        (
            "date_of_expiry",
            format!(r"(?mi)(?:có[ \t]+giá[ \t]+trị[ \t]+đến|ngày[ \t]+hết[ \t]+hạn)(?:[ \t]*/[ \t]*date[ \t]+of[ \t]+expiry)?[ \t]*[:.]?[ \t]*{DATE}"),
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct PatternFile {
    #[serde(default)]
    fields: BTreeMap<String, String>,
}

/// Compiled rules for one language, in field-name order
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: BTreeMap<String, Regex>,
}

impl RuleSet {
    /// Compile `(field, pattern)` pairs
    pub fn compile<I, K, V>(patterns: I) -> Result<Self, ExtractionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut rules = BTreeMap::new();
        for (field, pattern) in patterns {
            let field = field.into();
            let regex = compile_rule(&field, pattern.as_ref())?;
            rules.insert(field, regex);
        }
        Ok(Self { rules })
    }

    /// Merge overrides from `<dir>/patterns.toml` if the file exists
    pub fn with_overrides(mut self, dir: &Path) -> Result<Self, ExtractionError> {
        let path = dir.join(PATTERNS_FILE);
        if !path.exists() {
            return Ok(self);
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ExtractionError::OverrideFile {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let file: PatternFile =
            toml::from_str(&content).map_err(|e| ExtractionError::OverrideFile {
                path: path.clone(),
                message: e.to_string(),
            })?;

        let overrides = Self::compile(file.fields)?;
        info!(
            "Loaded {} extraction pattern overrides from {}",
            overrides.rules.len(),
            path.display()
        );
        self.rules.extend(overrides.rules);
        Ok(self)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn apply(&self, text: &str) -> ExtractedFields {
        self.rules
            .iter()
            .filter_map(|(field, regex)| {
                let value = regex.captures(text)?.get(1)?.as_str().trim();
                (!value.is_empty()).then(|| (field.clone(), value.to_string()))
            })
            .collect()
    }
}

fn compile_rule(field: &str, pattern: &str) -> Result<Regex, ExtractionError> {
    let regex = Regex::new(pattern).map_err(|e| ExtractionError::InvalidPattern {
        field: field.to_string(),
        message: e.to_string(),
    })?;
    if regex.captures_len() < 2 {
        return Err(ExtractionError::MissingCaptureGroup(field.to_string()));
    }
    Ok(regex)
}

/// Regex-driven extractor with one rule set per language
#[derive(Debug, Clone)]
pub struct RuleBasedExtractor {
    rule_sets: HashMap<String, RuleSet>,
}

impl RuleBasedExtractor {
    /// Built-in `en` and `vi` rules
    pub fn with_builtin_rules() -> Result<Self, ExtractionError> {
        let mut rule_sets = HashMap::new();
        rule_sets.insert("en".to_string(), RuleSet::compile(english_rules())?);
        rule_sets.insert("vi".to_string(), RuleSet::compile(vietnamese_rules())?);
        Ok(Self { rule_sets })
    }

    /// Built-in rules extended by `patterns.toml` in each language directory
    ///
    /// A broken override file is logged and that language keeps its
    /// built-in rules.
    pub fn load(en_dir: &Path, vi_dir: &Path) -> Result<Self, ExtractionError> {
        let mut extractor = Self::with_builtin_rules()?;

        for (language, dir) in [("en", en_dir), ("vi", vi_dir)] {
            let Some(builtin) = extractor.rule_sets.get(language).cloned() else {
                continue;
            };
            match builtin.with_overrides(dir) {
                Ok(rules) => {
                    extractor.rule_sets.insert(language.to_string(), rules);
                }
                Err(e) => {
                    warn!(
                        "Ignoring extraction overrides for '{}', using built-in rules: {}",
                        language, e
                    );
                }
            }
        }

        Ok(extractor)
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.rule_sets.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// Rule set for `language`, matching on the primary subtag (`vi-VN` is `vi`)
    fn rules_for(&self, language: &str) -> Option<&RuleSet> {
        let primary = language
            .trim()
            .split(['-', '_'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        self.rule_sets
            .get(&primary)
            .or_else(|| self.rule_sets.get(FALLBACK_LANGUAGE))
    }
}

impl InfoExtractor for RuleBasedExtractor {
    fn extract(&self, text: &str, language: &str) -> Result<ExtractedFields, ExtractionError> {
        let Some(rules) = self.rules_for(language) else {
            return Ok(ExtractedFields::new());
        };

        let fields = rules.apply(text);
        debug!(
            "Extracted {} fields for language '{}'",
            fields.len(),
            language
        );
        Ok(fields)
    }

    fn name(&self) -> &str {
        "rule-based"
    }
}
