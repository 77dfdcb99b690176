// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Decoding, drawing and storing a detection without a real model

use damage_detector::{
    render::{DetectionOutcome, OutcomeStatus},
    storage::ImageStore,
    vision::{
        detector::{
            postprocess::{decode_output, PostprocessParams},
            preprocess_for_detection, LetterboxInfo,
        },
        draw::class_color,
        Annotator,
    },
};
use image::{DynamicImage, Rgb, RgbImage};
use ndarray::Array3;
use tempfile::TempDir;

const INPUT_SIZE: u32 = 320;

fn names() -> Vec<String> {
    ["dent", "scratch", "broken-glass", "smash"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Channels-first YOLOv8 output with the given (cx, cy, w, h, class, score) anchors
fn model_output(anchors: &[(f32, f32, f32, f32, usize, f32)], num_classes: usize) -> Array3<f32> {
    let mut out = Array3::zeros((1, 4 + num_classes, anchors.len()));
    for (i, &(cx, cy, w, h, class, score)) in anchors.iter().enumerate() {
        out[[0, 0, i]] = cx;
        out[[0, 1, i]] = cy;
        out[[0, 2, i]] = w;
        out[[0, 3, i]] = h;
        out[[0, 4 + class, i]] = score;
    }
    out
}

#[test]
fn test_letterbox_round_trip_through_decode() {
    // 640x320 photo letterboxed into 320: scale 0.5, 80px of padding top and bottom
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(640, 320, Rgb([50, 50, 50])));
    let (tensor, info) = preprocess_for_detection(&image, INPUT_SIZE);
    assert_eq!(tensor.shape(), &[1, 3, 320, 320]);
    assert_eq!(info, LetterboxInfo::from_dimensions(640, 320, INPUT_SIZE));

    let out = model_output(&[(100.0, 140.0, 40.0, 20.0, 2, 0.8)], 4);
    let regions =
        decode_output(out.view().into_dyn(), &info, &PostprocessParams::default(), &names())
            .unwrap();

    assert_eq!(regions.len(), 1);
    let b = regions[0].bounding_box;
    assert_eq!(regions[0].label, "broken-glass");
    assert_eq!((b.x, b.y, b.width, b.height), (160.0, 100.0, 80.0, 40.0));
}

#[tokio::test]
async fn test_annotated_result_saved() {
    let dir = TempDir::new().unwrap();
    let store = ImageStore::open(dir.path().join("uploads"), dir.path().join("results"))
        .await
        .unwrap();

    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(320, 320, Rgb([0, 0, 0])));
    let (_, info) = preprocess_for_detection(&image, INPUT_SIZE);

    let out = model_output(
        &[
            (100.0, 100.0, 50.0, 50.0, 0, 0.9),
            (104.0, 102.0, 50.0, 50.0, 0, 0.6),
            (250.0, 250.0, 30.0, 30.0, 3, 0.7),
            (10.0, 10.0, 5.0, 5.0, 1, 0.1),
        ],
        4,
    );
    let regions =
        decode_output(out.view().into_dyn(), &info, &PostprocessParams::default(), &names())
            .unwrap();
    assert_eq!(regions.len(), 2);

    let outcome = DetectionOutcome::from_regions(&regions);
    assert_eq!(outcome.status, OutcomeStatus::Success);
    assert_eq!(outcome.message, "Detected 2 issue(s)!");

    let annotated = Annotator::new().plot(&image, &regions);
    let stored = store.save_result("car.png", &annotated).await.unwrap();
    assert_eq!(stored.file_name, "result_car.png");

    let reloaded = image::open(&stored.path).unwrap().to_rgb8();
    // Left edge of the first box (x = 75)
    assert_eq!(*reloaded.get_pixel(75, 100), class_color(0));
    // Left edge of the smash box (x = 235)
    assert_eq!(*reloaded.get_pixel(235, 250), class_color(3));
    // Background untouched
    assert_eq!(*reloaded.get_pixel(300, 10), Rgb([0, 0, 0]));
}
