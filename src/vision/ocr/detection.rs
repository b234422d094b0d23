// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text detection model
//!
//! Finds text regions on a letterboxed document and returns axis-aligned
//! boxes in model-input coordinates.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayView2, ArrayViewD, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Default probability threshold for a pixel to count as text
pub const DEFAULT_TEXT_THRESHOLD: f32 = 0.3;

/// Regions with fewer pixels than this are treated as noise
pub const MIN_REGION_PIXELS: usize = 10;

/// Growth applied to each region, as a multiple of area / perimeter.
/// The probability map marks a shrunk text core, so boxes are expanded back.
const UNCLIP_RATIO: f32 = 1.5;

/// A detected text box in model-input coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Mean probability over the region's pixels
    pub confidence: f32,
}

impl TextBox {
    pub fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.confidence > 0.0
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn center_y(&self) -> f32 {
        self.y + self.height / 2.0
    }
}

/// PaddleOCR text detection model
///
/// CPU only. The session is shared behind a mutex so clones are cheap.
#[derive(Clone)]
pub struct OcrDetectionModel {
    session: Arc<Mutex<Session>>,
    input_name: String,
    text_threshold: f32,
}

impl std::fmt::Debug for OcrDetectionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrDetectionModel")
            .field("input_name", &self.input_name)
            .field("text_threshold", &self.text_threshold)
            .finish_non_exhaustive()
    }
}

impl OcrDetectionModel {
    /// Load the detection model (`det_model.onnx`)
    pub async fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR detection model not found: {}", model_path.display());
        }

        info!("Loading OCR detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .with_context(|| {
                format!(
                    "Failed to load OCR detection model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Detection model input: {}", input_name);
        info!("OCR detection model loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
        })
    }

    /// Run detection on a `[1, 3, H, W]` tensor from `preprocess_for_detection`
    pub fn detect(&self, input: &Array4<f32>) -> Result<Vec<TextBox>> {
        let shape = input.shape();
        if shape[0] != 1 || shape[1] != 3 {
            anyhow::bail!("Invalid input shape: {:?}, expected [1, 3, H, W]", shape);
        }
        let (input_height, input_width) = (shape[2], shape[3]);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR detection session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let prob_map = probability_map(output_tensor.view())?;
        let boxes = extract_text_boxes(prob_map, self.text_threshold, input_height, input_width);

        debug!("Detected {} text regions", boxes.len());
        Ok(boxes)
    }
}

/// Strip leading unit axes from a `[1, 1, H, W]` or `[1, H, W]` output
fn probability_map(output: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>> {
    let mut view = output;
    while view.ndim() > 2 && view.shape()[0] == 1 {
        view = view.index_axis_move(Axis(0), 0);
    }
    let shape = view.shape().to_vec();
    view.into_dimensionality()
        .map_err(|_| anyhow::anyhow!("Unexpected detection output shape: {:?}", shape))
}

/// Connected regions of the probability map above `threshold`, as boxes
/// scaled to the model input and sorted top to bottom, then left to right
pub fn extract_text_boxes(
    prob_map: ArrayView2<'_, f32>,
    threshold: f32,
    input_height: usize,
    input_width: usize,
) -> Vec<TextBox> {
    let (map_height, map_width) = prob_map.dim();
    if map_height == 0 || map_width == 0 {
        return Vec::new();
    }

    let scale_y = input_height as f32 / map_height as f32;
    let scale_x = input_width as f32 / map_width as f32;

    let mut visited = vec![false; map_height * map_width];
    let mut boxes = Vec::new();

    for y in 0..map_height {
        for x in 0..map_width {
            if visited[y * map_width + x] || prob_map[[y, x]] < threshold {
                continue;
            }

            let region = flood_fill(&prob_map, &mut visited, threshold, x, y);
            if region.count < MIN_REGION_PIXELS {
                continue;
            }

            let width = (region.max_x - region.min_x + 1) as f32;
            let height = (region.max_y - region.min_y + 1) as f32;
            let grow = UNCLIP_RATIO * (width * height) / (2.0 * (width + height));

            let x1 = (region.min_x as f32 - grow).max(0.0);
            let y1 = (region.min_y as f32 - grow).max(0.0);
            let x2 = (region.max_x as f32 + 1.0 + grow).min(map_width as f32);
            let y2 = (region.max_y as f32 + 1.0 + grow).min(map_height as f32);

            boxes.push(TextBox {
                x: x1 * scale_x,
                y: y1 * scale_y,
                width: (x2 - x1) * scale_x,
                height: (y2 - y1) * scale_y,
                confidence: region.sum / region.count as f32,
            });
        }
    }

    boxes.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    boxes
}

struct Region {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
    count: usize,
    sum: f32,
}

/// 4-connected flood fill from `(start_x, start_y)`
fn flood_fill(
    prob_map: &ArrayView2<'_, f32>,
    visited: &mut [bool],
    threshold: f32,
    start_x: usize,
    start_y: usize,
) -> Region {
    let (height, width) = prob_map.dim();
    let mut region = Region {
        min_x: start_x,
        max_x: start_x,
        min_y: start_y,
        max_y: start_y,
        count: 0,
        sum: 0.0,
    };
    let mut stack = vec![(start_x, start_y)];

    while let Some((x, y)) = stack.pop() {
        let idx = y * width + x;
        if visited[idx] {
            continue;
        }
        let prob = prob_map[[y, x]];
        if prob < threshold {
            continue;
        }

        visited[idx] = true;
        region.count += 1;
        region.sum += prob;
        region.min_x = region.min_x.min(x);
        region.max_x = region.max_x.max(x);
        region.min_y = region.min_y.min(y);
        region.max_y = region.max_y.max(y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    region
}
