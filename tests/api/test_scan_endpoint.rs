// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! POST /api/v1/scan through the full router

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use std::sync::Arc;
use std::time::Duration;

use super::common::{
    jpeg, png, router_with_ocr, router_with_text, router_without_models, scan_request, send,
    settings, Part, SlowOcr,
};

const VIETNAMESE_CARD: &str = "CỘNG HÒA XÃ HỘI CHỦ NGHĨA VIỆT NAM\n\
CĂN CƯỚC CÔNG DÂN\n\
Số: 001234567890\n\
Họ và tên: NGUYỄN VĂN AN\n\
Ngày sinh: 01/02/1990\n\
Giới tính: Nam\n\
Nơi thường trú: 12 Phố Huế, Hà Nội";

const ENGLISH_CARD: &str = "IDENTITY CARD\n\
ID No: A1234567\n\
Name: JOHN SMITH\n\
Date of Birth: 12/03/1985\n\
Address: 42 Baker Street, London";

#[tokio::test]
async fn test_scan_vietnamese_card_auto_language() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(VIETNAMESE_CARD, dir.path());

    let (status, json) = send(
        router,
        scan_request(&[Part::file("cccd.jpg", jpeg(500, 500)), Part::text("language", "auto")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["detected_language"], "vi");
    assert_eq!(json["id_number"], "001234567890");
    assert_eq!(json["name"], "NGUYỄN VĂN AN");
    assert_eq!(json["date_of_birth"], "01/02/1990");
    assert_eq!(json["address"], "12 Phố Huế, Hà Nội");
    assert_eq!(json["raw_text"], VIETNAMESE_CARD);

    let metadata = &json["metadata"];
    assert_eq!(metadata["sex"], "Nam");
    assert_eq!(metadata["card_detected"], true);
    assert_eq!(metadata["image_width"], 500);
    assert_eq!(metadata["image_height"], 500);
    assert_eq!(metadata["original_filename"], "cccd.jpg");
    assert!(metadata["processing_time_ms"].is_u64());

    let scan_id = json["scan_id"].as_str().unwrap();
    assert!(uuid::Uuid::parse_str(scan_id).is_ok());
    assert!(dir.path().join(format!("{}_cccd.jpg", scan_id)).exists());
}

#[tokio::test]
async fn test_scan_declared_vietnamese() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(VIETNAMESE_CARD, dir.path());

    let (status, json) = send(
        router,
        scan_request(&[Part::file("front.jpg", jpeg(500, 500)), Part::text("language", "vi")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["detected_language"], "vi");
    assert!(json["raw_text"].is_string());
    assert_eq!(json["id_number"], "001234567890");
}

#[tokio::test]
async fn test_scan_without_language_field_detects_english() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("card.jpeg", jpeg(320, 200))])).await;

    assert_eq!(status, StatusCode::OK, "body: {}", json);
    assert_eq!(json["detected_language"], "en");
    assert_eq!(json["id_number"], "A1234567");
    assert_eq!(json["name"], "JOHN SMITH");
    assert_eq!(json["date_of_birth"], "12/03/1985");
    assert_eq!(json["address"], "42 Baker Street, London");
}

#[tokio::test]
async fn test_explicit_language_is_reported_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, json) = send(
        router,
        scan_request(&[Part::file("card.jpg", jpeg(100, 100)), Part::text("language", "vi")]),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["detected_language"], "vi");
}

#[tokio::test]
async fn test_missing_fields_serialize_as_null() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text("", dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("blank.png", png(40, 40))])).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["detected_language"], "en");
    assert_eq!(json["raw_text"], "");
    assert!(json["id_number"].is_null());
    assert!(json["name"].is_null());
    assert!(json["date_of_birth"].is_null());
    assert!(json["address"].is_null());
}

#[tokio::test]
async fn test_uppercase_extension_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, _) = send(router, scan_request(&[Part::file("CARD.PNG", png(60, 40))])).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_each_scan_gets_a_new_id() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (_, first) = send(router.clone(), scan_request(&[Part::file("a.jpg", jpeg(50, 50))])).await;
    let (_, second) = send(router, scan_request(&[Part::file("a.jpg", jpeg(50, 50))])).await;

    assert_ne!(first["scan_id"], second["scan_id"]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn test_missing_file_part() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, json) = send(router, scan_request(&[Part::text("language", "en")])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file part in the request");
    assert_eq!(json["status_code"], 400);
}

#[tokio::test]
async fn test_empty_filename() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("", Vec::new())])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file selected");
}

#[tokio::test]
async fn test_disallowed_extension() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("card.gif", jpeg(20, 20))])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "File type not allowed. Allowed types: jpg, jpeg, png");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_file_over_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut limits = settings();
    limits.max_content_length = 1024;
    let router = router_with_ocr(Arc::new(super::common::FixedOcr("")), limits, dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("big.jpg", vec![0u8; 4096])])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "File too large. Maximum size is 1024 bytes");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_body_over_transport_limit() {
    let dir = tempfile::tempdir().unwrap();
    let mut limits = settings();
    limits.max_content_length = 1024;
    let router = router_with_ocr(Arc::new(super::common::FixedOcr("")), limits, dir.path());

    let (status, json) =
        send(router, scan_request(&[Part::file("huge.jpg", vec![0u8; 256 * 1024])])).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status_code"], 400);

    // Cut off while streaming the part, before the file validator runs
    let error = json["error"].as_str().unwrap();
    assert!(error.starts_with("Failed to read"), "error: {}", error);
    assert!(!error.starts_with("File too large"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_non_multipart_request() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/scan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"file":"card.jpg"}"#))
        .unwrap();
    let (status, json) = send(router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status_code"], 400);
}

#[tokio::test]
async fn test_undecodable_image_is_processing_error() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let (status, json) = send(
        router,
        scan_request(&[Part::file("card.jpg", b"definitely not a jpeg".to_vec())]),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status_code"], 500);
    assert!(!json["error"].as_str().unwrap().is_empty());
    // Audit copy is written before decoding
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_bmp_bytes_under_png_name_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_with_text(ENGLISH_CARD, dir.path());

    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(32, 32));
    let mut bmp = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bmp, image::ImageFormat::Bmp).unwrap();

    let (status, json) =
        send(router, scan_request(&[Part::file("card.png", bmp.into_inner())])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Unsupported image format");
}

#[tokio::test]
async fn test_models_not_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_without_models(dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("card.jpg", jpeg(50, 50))])).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status_code"], 503);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Required models could not be loaded"));
}

#[tokio::test]
async fn test_validation_precedes_model_check() {
    let dir = tempfile::tempdir().unwrap();
    let router = router_without_models(dir.path());

    let (status, _) = send(router, scan_request(&[Part::file("card.bmp", jpeg(50, 50))])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_ocr_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut limits = settings();
    limits.ocr_timeout = Duration::from_millis(200);
    let router = router_with_ocr(Arc::new(SlowOcr(Duration::from_secs(1))), limits, dir.path());

    let (status, json) = send(router, scan_request(&[Part::file("card.jpg", jpeg(50, 50))])).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("timed out"));
}
