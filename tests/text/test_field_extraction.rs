// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Extractor rule loading from the configured rules directories

use id_card_scanner::text::{ExtractionError, InfoExtractor, RuleBasedExtractor};
use std::fs;

const ENGLISH_CARD: &str = "DRIVER LICENCE\nLicence No: DL-99887766\nName: JANE DOE\nDOB: 1990-04-01";

#[test]
fn test_missing_rule_directories_use_builtin_rules() {
    let dir = tempfile::tempdir().unwrap();
    let extractor =
        RuleBasedExtractor::load(&dir.path().join("ner_en"), &dir.path().join("ner_vi")).unwrap();

    assert_eq!(extractor.languages(), vec!["en", "vi"]);
    let fields = extractor.extract(ENGLISH_CARD, "en").unwrap();
    assert_eq!(fields["name"], "JANE DOE");
    assert_eq!(fields["date_of_birth"], "1990-04-01");
}

#[test]
fn test_override_file_adds_fields() {
    let dir = tempfile::tempdir().unwrap();
    let en_dir = dir.path().join("ner_en");
    fs::create_dir_all(&en_dir).unwrap();
    fs::write(
        en_dir.join("patterns.toml"),
        "[fields]\nlicence_number = '(?mi)licence[ \\t]+no[ \\t]*:[ \\t]*([A-Z0-9\\-]+)'\n",
    )
    .unwrap();

    let extractor = RuleBasedExtractor::load(&en_dir, &dir.path().join("ner_vi")).unwrap();
    let fields = extractor.extract(ENGLISH_CARD, "en").unwrap();

    assert_eq!(fields["licence_number"], "DL-99887766");
    assert_eq!(fields["name"], "JANE DOE");
}

#[test]
fn test_broken_override_keeps_builtin_rules() {
    let dir = tempfile::tempdir().unwrap();
    let en_dir = dir.path().join("ner_en");
    fs::create_dir_all(&en_dir).unwrap();
    fs::write(en_dir.join("patterns.toml"), "[fields]\nname = '(unclosed'\n").unwrap();

    let extractor = RuleBasedExtractor::load(&en_dir, &dir.path().join("ner_vi")).unwrap();
    let fields = extractor.extract(ENGLISH_CARD, "en").unwrap();
    assert_eq!(fields["name"], "JANE DOE");
}

#[test]
fn test_unknown_language_falls_back_to_english_rules() {
    let extractor = RuleBasedExtractor::with_builtin_rules().unwrap();
    let fields = extractor.extract(ENGLISH_CARD, "fr").unwrap();
    assert_eq!(fields["name"], "JANE DOE");
}

#[test]
fn test_region_subtag_selects_language_rules() {
    let extractor = RuleBasedExtractor::with_builtin_rules().unwrap();
    let fields = extractor
        .extract("Họ và tên: TRẦN THỊ BÌNH\nNgày sinh: 15/08/1995", "vi-VN")
        .unwrap();
    assert_eq!(fields["name"], "TRẦN THỊ BÌNH");
    assert_eq!(fields["date_of_birth"], "15/08/1995");
}

#[test]
fn test_error_messages_name_the_field() {
    let err = ExtractionError::MissingCaptureGroup("id_number".to_string());
    assert_eq!(err.to_string(), "Pattern for field 'id_number' has no capture group");
}
