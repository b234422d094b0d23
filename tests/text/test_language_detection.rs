// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language detection feeding field extraction

use id_card_scanner::text::{
    is_auto, HeuristicLanguageDetector, InfoExtractor, LanguageDetector, RuleBasedExtractor,
};

#[test]
fn test_detected_language_drives_extraction() {
    let detector = HeuristicLanguageDetector::default();
    let extractor = RuleBasedExtractor::with_builtin_rules().unwrap();

    let text = "CĂN CƯỚC CÔNG DÂN\nSố: 079203001122\nHọ và tên: LÊ MINH KHOA\nQuê quán: Đà Nẵng";
    let language = detector.detect(text);
    assert_eq!(language, "vi");

    let fields = extractor.extract(text, &language).unwrap();
    assert_eq!(fields["id_number"], "079203001122");
    assert_eq!(fields["name"], "LÊ MINH KHOA");
}

#[test]
fn test_configured_default_used_when_undecided() {
    let detector = HeuristicLanguageDetector::new("vi");

    assert_eq!(detector.detect("12345"), "vi");
    assert_eq!(detector.detect("0123456789 / 0123456789"), "vi");
}

#[test]
fn test_detector_never_returns_auto() {
    let detector = HeuristicLanguageDetector::default();
    for text in ["", "auto", "AUTO AUTO AUTO AUTO", "Name: A"] {
        assert!(!is_auto(&detector.detect(text)));
    }
}
