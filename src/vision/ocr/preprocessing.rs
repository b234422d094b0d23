// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Tensor preprocessing for the PaddleOCR models

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Target size for PaddleOCR detection model
pub const OCR_INPUT_SIZE: u32 = 640;

/// Recognition model input height
pub const REC_INPUT_HEIGHT: u32 = 48;

/// Maximum width for recognition model input
pub const REC_MAX_WIDTH: u32 = 320;

/// Minimum width for recognition model input
pub const REC_MIN_WIDTH: u32 = 4;

/// Mean values for normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Gray used for letterbox padding
const PAD_GRAY: Rgb<u8> = Rgb([128, 128, 128]);

/// Letterbox an image to `OCR_INPUT_SIZE` and build the NCHW detection tensor
///
/// Returns the tensor together with the mapping needed to bring detected
/// boxes back to source coordinates.
pub fn preprocess_for_detection(image: &DynamicImage) -> (Array4<f32>, LetterboxInfo) {
    let info = LetterboxInfo::new(image, OCR_INPUT_SIZE);
    let padded = letterbox(image, &info);
    (normalize_nchw(&padded), info)
}

/// Resize a cropped text line to height 48 and build the NCHW tensor
///
/// Width follows the aspect ratio, clamped to
/// `[REC_MIN_WIDTH, REC_MAX_WIDTH]`.
pub fn preprocess_for_recognition(image: &DynamicImage) -> Array4<f32> {
    let (orig_w, orig_h) = image.dimensions();
    let scale = REC_INPUT_HEIGHT as f32 / orig_h.max(1) as f32;
    let new_width = ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH);

    let resized = image
        .resize_exact(new_width, REC_INPUT_HEIGHT, FilterType::Triangle)
        .to_rgb8();

    normalize_nchw(&resized)
}

/// Pixel values normalized with ImageNet statistics, laid out as [1, 3, H, W]
fn normalize_nchw(rgb: &RgbImage) -> Array4<f32> {
    let (width, height) = rgb.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}

/// Scale the image into a square canvas, centred on a gray background
fn letterbox(image: &DynamicImage, info: &LetterboxInfo) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(info.target_size, info.target_size, PAD_GRAY);

    if info.scaled_width == 0 || info.scaled_height == 0 {
        return canvas;
    }

    let resized = image
        .resize_exact(info.scaled_width, info.scaled_height, FilterType::Triangle)
        .to_rgb8();
    imageops::overlay(
        &mut canvas,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    canvas
}

/// Geometry of a letterbox transform
///
/// Used to map detection results back to original coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxInfo {
    /// Side of the square model input
    pub target_size: u32,
    /// Scale factor applied to the source image
    pub scale: f32,
    /// Scaled image size inside the canvas
    pub scaled_width: u32,
    pub scaled_height: u32,
    /// Padding offsets
    pub offset_x: u32,
    pub offset_y: u32,
    /// Source image size
    pub original_width: u32,
    pub original_height: u32,
}

impl LetterboxInfo {
    pub fn new(image: &DynamicImage, target_size: u32) -> Self {
        let (orig_w, orig_h) = image.dimensions();

        if orig_w == 0 || orig_h == 0 {
            return Self {
                target_size,
                scale: 1.0,
                scaled_width: 0,
                scaled_height: 0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let scaled_width = ((orig_w as f32 * scale).round() as u32).clamp(1, target_size);
        let scaled_height = ((orig_h as f32 * scale).round() as u32).clamp(1, target_size);

        Self {
            target_size,
            scale,
            scaled_width,
            scaled_height,
            offset_x: (target_size - scaled_width) / 2,
            offset_y: (target_size - scaled_height) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Map a point from model-input space back to source image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }

    /// Map a box from model-input space to a clamped source pixel rectangle
    ///
    /// Returns `(x, y, width, height)` or `None` if nothing is left after
    /// clamping.
    pub fn map_box_to_original(
        &self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Option<(u32, u32, u32, u32)> {
        let (x1, y1) = self.map_to_original(x, y);
        let (x2, y2) = self.map_to_original(x + width, y + height);

        let max_w = self.original_width as f32;
        let max_h = self.original_height as f32;
        let x1 = x1.floor().clamp(0.0, max_w);
        let y1 = y1.floor().clamp(0.0, max_h);
        let x2 = x2.ceil().clamp(0.0, max_w);
        let y2 = y2.ceil().clamp(0.0, max_h);

        if x2 - x1 < 1.0 || y2 - y1 < 1.0 {
            return None;
        }

        Some((x1 as u32, y1 as u32, (x2 - x1) as u32, (y2 - y1) as u32))
    }
}
