// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! GET /api/v1/models

use axum::http::StatusCode;
use serde_json::Value;

use super::common::{get_request, router_with_text, router_without_models, send};

fn entry<'a>(json: &'a Value, model_type: &str) -> &'a Value {
    json["models"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["model_type"] == model_type)
        .unwrap_or_else(|| panic!("no {} entry in {}", model_type, json))
}

#[tokio::test]
async fn test_models_all_available() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) = send(router_with_text("", dir.path()), get_request("/api/v1/models")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["models"].as_array().unwrap().len(), 4);
    assert_eq!(entry(&json, "card_detection")["available"], true);
    assert_eq!(entry(&json, "ocr")["available"], true);
    assert_eq!(entry(&json, "ocr")["name"], "fixed-ocr");
    assert_eq!(entry(&json, "language_detection")["name"], "heuristic");
    assert_eq!(entry(&json, "field_extraction")["name"], "rule-based");
}

#[tokio::test]
async fn test_models_reports_missing_vision_models() {
    let dir = tempfile::tempdir().unwrap();
    let (status, json) =
        send(router_without_models(dir.path()), get_request("/api/v1/models")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry(&json, "card_detection")["available"], false);
    assert_eq!(entry(&json, "ocr")["available"], false);
    assert_eq!(entry(&json, "language_detection")["available"], true);
    assert_eq!(entry(&json, "field_extraction")["available"], true);
}
