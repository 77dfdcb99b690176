// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 output decoding
//!
//! A YOLOv8 detection head produces one tensor of shape `[1, 4 + nc, N]`:
//! for each of the N anchors, box center/size in input pixels followed by
//! one score per class. Some exports transpose this to `[1, N, 4 + nc]`.

use ndarray::{ArrayViewD, IxDyn};
use regex::Regex;
use std::sync::OnceLock;

use super::error::{DetectionError, Result};
use super::model::{BoundingBox, DetectionRegion};
use super::preprocessing::LetterboxInfo;

/// Filtering parameters applied after the model call
#[derive(Debug, Clone, PartialEq)]
pub struct PostprocessParams {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl Default for PostprocessParams {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 300,
        }
    }
}

/// Decode raw model output into regions in original image coordinates
pub fn decode_output(
    output: ArrayViewD<f32>,
    info: &LetterboxInfo,
    params: &PostprocessParams,
    class_names: &[String],
) -> Result<Vec<DetectionRegion>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(DetectionError::UnexpectedOutput(format!(
            "shape {:?}, expected [1, 4 + classes, anchors]",
            shape
        )));
    }

    let channels_first = is_channels_first(shape[1], shape[2], class_names.len());
    let (channels, anchors) = if channels_first {
        (shape[1], shape[2])
    } else {
        (shape[2], shape[1])
    };

    if channels < 5 {
        return Err(DetectionError::UnexpectedOutput(format!(
            "shape {:?} has no class scores",
            shape
        )));
    }

    let value = |channel: usize, anchor: usize| -> f32 {
        if channels_first {
            output[IxDyn(&[0, channel, anchor])]
        } else {
            output[IxDyn(&[0, anchor, channel])]
        }
    };

    let max_x = info.original_width as f32;
    let max_y = info.original_height as f32;
    let mut candidates = Vec::new();

    for anchor in 0..anchors {
        let (class_id, score) = (4..channels)
            .map(|c| (c - 4, value(c, anchor)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if score < params.confidence_threshold {
            continue;
        }

        let cx = value(0, anchor);
        let cy = value(1, anchor);
        let w = value(2, anchor);
        let h = value(3, anchor);

        let (x1, y1) = info.map_to_original(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = info.map_to_original(cx + w / 2.0, cy + h / 2.0);

        let x1 = x1.clamp(0.0, max_x);
        let y1 = y1.clamp(0.0, max_y);
        let x2 = x2.clamp(0.0, max_x);
        let y2 = y2.clamp(0.0, max_y);

        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        candidates.push(DetectionRegion {
            class_id,
            label: class_label(class_names, class_id),
            confidence: score,
            bounding_box: BoundingBox {
                x: x1,
                y: y1,
                width: x2 - x1,
                height: y2 - y1,
            },
        });
    }

    let mut regions = non_max_suppression(candidates, params.iou_threshold);
    regions.truncate(params.max_detections);
    Ok(regions)
}

fn is_channels_first(dim1: usize, dim2: usize, num_classes: usize) -> bool {
    if num_classes > 0 {
        if dim1 == num_classes + 4 {
            return true;
        }
        if dim2 == num_classes + 4 {
            return false;
        }
    }
    // Anchors outnumber channels for any realistic input size
    dim1 <= dim2
}

/// Human readable label for a class index
pub fn class_label(class_names: &[String], class_id: usize) -> String {
    class_names
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| format!("class_{}", class_id))
}

/// Class-aware greedy NMS; output is sorted by descending confidence
pub fn non_max_suppression(
    mut regions: Vec<DetectionRegion>,
    iou_threshold: f32,
) -> Vec<DetectionRegion> {
    regions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<DetectionRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        let suppressed = kept.iter().any(|k| {
            k.class_id == region.class_id
                && k.bounding_box.iou(&region.bounding_box) > iou_threshold
        });
        if !suppressed {
            kept.push(region);
        }
    }
    kept
}

/// Parse the `names` entry Ultralytics writes into ONNX metadata,
/// e.g. `{0: 'dent', 1: 'scratch'}`
pub fn parse_class_names(metadata: &str) -> Option<Vec<String>> {
    static NAME_ENTRY: OnceLock<Regex> = OnceLock::new();
    let re = NAME_ENTRY.get_or_init(|| {
        Regex::new(r#"(\d+)\s*:\s*(?:'([^']*)'|"([^"]*)")"#).expect("valid regex")
    });

    let mut entries: Vec<(usize, String)> = re
        .captures_iter(metadata)
        .filter_map(|cap| {
            let index = cap.get(1)?.as_str().parse().ok()?;
            let name = cap.get(2).or_else(|| cap.get(3))?.as_str().to_string();
            Some((index, name))
        })
        .collect();

    if entries.is_empty() {
        return None;
    }

    entries.sort_by_key(|(i, _)| *i);
    let len = entries.last().map(|(i, _)| i + 1).unwrap_or(0);
    let mut names: Vec<String> = (0..len).map(|i| format!("class_{}", i)).collect();
    for (i, name) in entries {
        names[i] = name;
    }
    Some(names)
}
