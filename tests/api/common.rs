// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared helpers for the HTTP tests: a temp-dir backed app with a stub detector

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use damage_detector::{
    api::{create_app, AppState},
    config::AppConfig,
    storage::ImageStore,
    vision::{
        Annotator, BoundingBox, DamageDetector, DetectionError, DetectionRegion,
        VisionModelManager,
    },
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use tempfile::TempDir;

pub const BOUNDARY: &str = "damage-test-boundary";

/// Detector returning canned regions (or a canned failure) and counting calls
pub struct StubDetector {
    regions: Vec<DetectionRegion>,
    failure: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl StubDetector {
    pub fn with_regions(regions: Vec<DetectionRegion>) -> Self {
        Self {
            regions,
            failure: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            regions: vec![],
            failure: Some(message.to_string()),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl DamageDetector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<DetectionRegion>, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(DetectionError::Inference(message.clone())),
            None => Ok(self.regions.clone()),
        }
    }

    fn model_name(&self) -> String {
        "stub-detector".to_string()
    }
}

pub struct TestApp {
    pub dir: TempDir,
    pub app: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn model_path(&self) -> PathBuf {
        self.state.config.model_path.clone()
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Build an app whose directories live in a fresh temp dir
pub async fn test_app(detector: StubDetector, with_model_file: bool) -> TestApp {
    test_app_with(detector, with_model_file, |_| {}).await
}

pub async fn test_app_with<F>(
    detector: StubDetector,
    with_model_file: bool,
    customize: F,
) -> TestApp
where
    F: FnOnce(&mut AppConfig),
{
    let dir = TempDir::new().unwrap();

    let mut config = AppConfig {
        upload_dir: dir.path().join("uploads"),
        result_dir: dir.path().join("results"),
        model_path: dir.path().join("damage-detector.onnx"),
        ..AppConfig::default()
    };
    customize(&mut config);

    if with_model_file {
        std::fs::write(&config.model_path, b"stub model").unwrap();
    }

    let store = ImageStore::open(&config.upload_dir, &config.result_dir)
        .await
        .unwrap();
    let vision = VisionModelManager::with_detector(
        config.model_path.clone(),
        Arc::new(detector),
        config.max_upload_bytes,
        Annotator::new(),
    );

    let state = AppState::new(config, store, vision);
    let app = create_app(state.clone());

    TestApp { dir, app, state }
}

pub fn region(class_id: usize, label: &str, x: f32, y: f32) -> DetectionRegion {
    DetectionRegion {
        class_id,
        label: label.to_string(),
        confidence: 0.91,
        bounding_box: BoundingBox {
            x,
            y,
            width: 12.0,
            height: 8.0,
        },
    }
}

pub fn encode_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 120, 160]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

pub fn multipart_request(
    field: &str,
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/v1/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn detect_request(file_name: &str) -> Request<Body> {
    raw_detect_request(
        Some("application/json"),
        serde_json::json!({ "fileName": file_name }).to_string(),
    )
}

/// POST /v1/detect with an arbitrary body and optional content type
pub fn raw_detect_request(content_type: Option<&str>, body: impl Into<Body>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri("/v1/detect");
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body.into()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Upload a PNG and return the stored file name
pub async fn upload_png(app: &TestApp, width: u32, height: u32) -> String {
    let bytes = encode_image(width, height, ImageFormat::Png);
    let response = app
        .send(multipart_request("file", "car.png", "image/png", &bytes))
        .await;
    assert_eq!(response.status(), 200);
    body_json(response).await["fileName"]
        .as_str()
        .unwrap()
        .to_string()
}
