// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Result image annotation
//!
//! Draws a colored box per detected region plus a filled label tab above it.
//! Label text requires a TrueType font; without one the tab is drawn empty.

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use super::detector::DetectionRegion;

const BOX_THICKNESS: i32 = 2;
const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_TAB_HEIGHT: u32 = 20;
const LABEL_TAB_WIDTH: u32 = 40;
const LABEL_PADDING: i32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Per-class colors, cycled by class id
const PALETTE: [[u8; 3]; 10] = [
    [255, 56, 56],
    [255, 157, 151],
    [255, 112, 31],
    [255, 178, 29],
    [207, 210, 49],
    [72, 249, 10],
    [26, 147, 52],
    [0, 212, 187],
    [44, 153, 168],
    [0, 194, 255],
];

#[derive(Debug, Error)]
pub enum FontError {
    #[error("Failed to read font {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font file: {0}")]
    Invalid(String),
}

/// Color used for a class id
pub fn class_color(class_id: usize) -> Rgb<u8> {
    Rgb(PALETTE[class_id % PALETTE.len()])
}

/// Draws detection regions onto images
#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl Annotator {
    /// Annotator that draws boxes and empty label tabs
    pub fn new() -> Self {
        Self::default()
    }

    /// Annotator that renders label text with the given font
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self, FontError> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let font = FontVec::try_from_vec(data).map_err(|e| FontError::Invalid(e.to_string()))?;
        info!("Loaded label font from {}", path.display());
        Ok(Self { font: Some(font) })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Copy `image` and draw every region on it
    pub fn plot(&self, image: &DynamicImage, regions: &[DetectionRegion]) -> RgbImage {
        let mut canvas = image.to_rgb8();
        for region in regions {
            self.draw_region(&mut canvas, region);
        }
        canvas
    }

    fn draw_region(&self, canvas: &mut RgbImage, region: &DetectionRegion) {
        let (w, h) = (canvas.width() as i32, canvas.height() as i32);
        if w == 0 || h == 0 {
            return;
        }

        let b = &region.bounding_box;
        let x_min = (b.x.floor() as i32).clamp(0, w - 1);
        let y_min = (b.y.floor() as i32).clamp(0, h - 1);
        let x_max = ((b.x + b.width).ceil() as i32).clamp(0, w - 1);
        let y_max = ((b.y + b.height).ceil() as i32).clamp(0, h - 1);

        if x_min >= x_max || y_min >= y_max {
            return;
        }

        let color = class_color(region.class_id);

        for t in 0..BOX_THICKNESS {
            let width = x_max - x_min + 1 - 2 * t;
            let height = y_max - y_min + 1 - 2 * t;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at(x_min + t, y_min + t).of_size(width as u32, height as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }

        let label = format!("{} {:.2}", region.label, region.confidence);
        let scale = PxScale::from(LABEL_FONT_SIZE);

        let (tab_width, tab_height) = match &self.font {
            Some(font) => {
                let (tw, th) = text_size(scale, font, &label);
                (tw + 2 * LABEL_PADDING as u32, th.max(1) + 2 * LABEL_PADDING as u32)
            }
            None => (LABEL_TAB_WIDTH, LABEL_TAB_HEIGHT),
        };

        // Above the box when there is room, otherwise inside its top edge
        let tab_y = if y_min >= tab_height as i32 {
            y_min - tab_height as i32
        } else {
            y_min
        };
        let tab_width = tab_width.min((w - x_min) as u32);
        let tab_height = tab_height.min((h - tab_y) as u32);
        if tab_width == 0 || tab_height == 0 {
            return;
        }

        draw_filled_rect_mut(
            canvas,
            Rect::at(x_min, tab_y).of_size(tab_width, tab_height),
            color,
        );

        if let Some(font) = &self.font {
            draw_text_mut(
                canvas,
                TEXT_COLOR,
                x_min + LABEL_PADDING,
                tab_y + LABEL_PADDING,
                scale,
                font,
                &label,
            );
        }
    }
}
