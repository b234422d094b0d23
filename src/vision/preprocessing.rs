// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document-level preprocessing shared by the scan pipeline
//!
//! Model-specific tensor layouts for OCR live in `vision::ocr::preprocessing`.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage};
use ndarray::Array4;

/// Side length of the card detector input (NHWC 224x224x3)
pub const CARD_DETECTOR_INPUT_SIZE: u32 = 224;

/// Shorter side below which documents are upscaled before OCR
pub const OCR_MIN_SHORT_SIDE: u32 = 640;

/// Upper bound on the OCR upscale factor
pub const OCR_MAX_UPSCALE: f32 = 2.0;

/// Build the card detector input tensor
///
/// Steps:
/// 1. Promote to RGB (grayscale inputs are replicated across channels)
/// 2. Resize to 224x224 without preserving aspect ratio (bilinear)
/// 3. Scale pixels to [0, 1]
/// 4. Lay out as NHWC [1, 224, 224, 3]
pub fn preprocess_for_card_detection(image: &DynamicImage) -> Array4<f32> {
    let size = CARD_DETECTOR_INPUT_SIZE;
    let resized = image.resize_exact(size, size, FilterType::Triangle);
    let rgb = resized.to_rgb8();

    let mut tensor = Array4::zeros((1, size as usize, size as usize, 3));
    for (x, y, pixel) in rgb.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }

    tensor
}

/// Prepare a (possibly cropped) document image for OCR
///
/// Small scans are upscaled so the shorter side approaches
/// `OCR_MIN_SHORT_SIDE`, then converted to grayscale and contrast-stretched.
/// The result is returned as RGB since the OCR models take three channels.
pub fn preprocess_for_ocr(image: &DynamicImage) -> DynamicImage {
    let (width, height) = image.dimensions();
    let short_side = width.min(height);

    let scaled = if short_side > 0 && short_side < OCR_MIN_SHORT_SIDE {
        let scale = (OCR_MIN_SHORT_SIDE as f32 / short_side as f32).min(OCR_MAX_UPSCALE);
        let new_w = ((width as f32 * scale).round() as u32).max(1);
        let new_h = ((height as f32 * scale).round() as u32).max(1);
        image.resize_exact(new_w, new_h, FilterType::CatmullRom)
    } else {
        image.clone()
    };

    let mut gray = scaled.to_luma8();
    stretch_contrast(&mut gray);

    DynamicImage::ImageRgb8(DynamicImage::ImageLuma8(gray).to_rgb8())
}

/// Linearly map the darkest pixel to 0 and the brightest to 255
fn stretch_contrast(gray: &mut GrayImage) {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));

    if max <= min {
        return;
    }

    let range = (max - min) as f32;
    for pixel in gray.pixels_mut() {
        let stretched = (pixel[0] - min) as f32 * 255.0 / range;
        pixel[0] = stretched.round().clamp(0.0, 255.0) as u8;
    }
}
