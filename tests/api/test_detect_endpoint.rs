// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Detection endpoint tests for POST /v1/detect

use axum::http::StatusCode;
use image::ImageFormat;
use std::sync::atomic::Ordering;

use super::common::*;

#[tokio::test]
async fn test_detect_with_damage() {
    let detector = StubDetector::with_regions(vec![
        region(0, "dent", 2.0, 2.0),
        region(1, "scratch", 20.0, 10.0),
    ]);
    let app = test_app(detector, true).await;
    let file_name = upload_png(&app, 40, 30).await;

    let response = app.send(detect_request(&file_name)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let result_name = format!("result_{}", file_name);
    assert_eq!(json["fileName"], file_name);
    assert_eq!(json["resultFileName"], result_name);
    assert_eq!(json["resultUrl"], format!("/results/{}", result_name));
    assert_eq!(json["count"], 2);
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Detected 2 issue(s)!");
    assert_eq!(json["model"], "stub-detector");
    assert_eq!(json["regions"][1]["label"], "scratch");
    assert_eq!(json["regions"][0]["boundingBox"]["width"], 12.0);

    let saved = image::open(app.state.store.result_dir().join(&result_name)).unwrap();
    assert_eq!((saved.width(), saved.height()), (40, 30));
}

#[tokio::test]
async fn test_detect_without_damage() {
    let app = test_app(StubDetector::with_regions(vec![]), true).await;
    let file_name = upload_png(&app, 10, 10).await;

    let json = body_json(app.send(detect_request(&file_name)).await).await;
    assert_eq!(json["count"], 0);
    assert_eq!(json["status"], "info");
    assert_eq!(json["message"], "No visible damage detected.");
    assert_eq!(json["regions"].as_array().unwrap().len(), 0);

    // The result image is still written and served
    let response = app
        .send(get(json["resultUrl"].as_str().unwrap()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_detect_missing_model_file() {
    let detector = StubDetector::with_regions(vec![region(0, "dent", 1.0, 1.0)]);
    let calls = detector.call_counter();
    let app = test_app(detector, false).await;
    let file_name = upload_png(&app, 10, 10).await;

    let response = app.send(detect_request(&file_name)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["errorType"], "model_not_found");
    let expected = format!(
        "Model file not found at: {}. {}",
        app.model_path().display(),
        "Please ensure 'damage-detector.onnx' is in the project directory."
    );
    assert_eq!(json["message"], expected);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(std::fs::read_dir(app.state.store.result_dir()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_detect_checks_model_every_time() {
    let detector = StubDetector::with_regions(vec![]);
    let calls = detector.call_counter();
    let app = test_app(detector, true).await;
    let file_name = upload_png(&app, 10, 10).await;

    let response = app.send(detect_request(&file_name)).await;
    assert_eq!(response.status(), StatusCode::OK);

    std::fs::remove_file(app.model_path()).unwrap();
    let response = app.send(detect_request(&file_name)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_detect_inference_failure_surfaced() {
    let app = test_app(StubDetector::failing("tensor shape mismatch"), true).await;
    let file_name = upload_png(&app, 10, 10).await;

    let response = app.send(detect_request(&file_name)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let json = body_json(response).await;
    assert_eq!(json["errorType"], "detection_failed");
    assert_eq!(
        json["message"],
        "Error during detection: Inference failed: tensor shape mismatch"
    );
}

#[tokio::test]
async fn test_detect_unknown_upload() {
    let app = test_app(StubDetector::with_regions(vec![]), true).await;

    let response = app.send(detect_request("0000.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detect_rejects_traversal() {
    let app = test_app(StubDetector::with_regions(vec![]), true).await;

    for name in ["../secret.png", "uploads/a.png", "/etc/passwd"] {
        let response = app.send(detect_request(name)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", name);
    }
}

#[tokio::test]
async fn test_detect_requires_file_name() {
    let app = test_app(StubDetector::with_regions(vec![]), true).await;

    let response = app.send(detect_request("  ")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["details"]["field"], "fileName");
}

#[tokio::test]
async fn test_detect_wrong_field_type_is_json_error() {
    let detector = StubDetector::with_regions(vec![]);
    let calls = detector.call_counter();
    let app = test_app(detector, true).await;

    let response = app
        .send(raw_detect_request(Some("application/json"), r#"{"fileName": 5}"#))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["errorType"], "invalid_request");
    assert!(!json["message"].as_str().unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_detect_malformed_body_is_json_error() {
    let app = test_app(StubDetector::with_regions(vec![]), true).await;

    let response = app
        .send(raw_detect_request(Some("application/json"), "{not json"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["errorType"], "invalid_request");
}

#[tokio::test]
async fn test_detect_without_content_type_is_json_error() {
    let app = test_app(StubDetector::with_regions(vec![]), true).await;

    let response = app
        .send(raw_detect_request(None, r#"{"fileName": "a.png"}"#))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["errorType"], "invalid_request");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("application/json"));
}

#[tokio::test]
async fn test_detect_jpeg_result_keeps_format() {
    let detector = StubDetector::with_regions(vec![region(0, "dent", 1.0, 1.0)]);
    let app = test_app(detector, true).await;
    let bytes = encode_image(24, 16, ImageFormat::Jpeg);
    let upload = body_json(
        app.send(multipart_request("file", "photo.jpeg", "image/jpeg", &bytes))
            .await,
    )
    .await;
    let file_name = upload["fileName"].as_str().unwrap().to_string();
    assert!(file_name.ends_with(".jpeg"));

    let json = body_json(app.send(detect_request(&file_name)).await).await;
    let result_path = app
        .state
        .store
        .result_dir()
        .join(json["resultFileName"].as_str().unwrap());

    let saved = std::fs::read(result_path).unwrap();
    assert_eq!(&saved[..3], &[0xFF, 0xD8, 0xFF]);
}
