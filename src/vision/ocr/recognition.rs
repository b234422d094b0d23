// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition model
//!
//! Reads the characters of one cropped text line with CTC greedy decoding.

use anyhow::{Context, Result};
use ndarray::{Array4, ArrayView2, ArrayViewD, Axis};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::{REC_INPUT_HEIGHT, REC_MIN_WIDTH};

/// CTC blank label index
const BLANK_INDEX: usize = 0;

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean probability of the emitted characters (0.0 when empty)
    pub confidence: f32,
}

impl RecognizedText {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// PaddleOCR text recognition model with its character dictionary
#[derive(Clone)]
pub struct OcrRecognitionModel {
    session: Arc<Mutex<Session>>,
    dictionary: Arc<Vec<char>>,
    input_name: String,
}

impl std::fmt::Debug for OcrRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrRecognitionModel")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl OcrRecognitionModel {
    /// Load `rec_model.onnx` and the `ppocr_keys_v1.txt` dictionary
    pub async fn new<P: AsRef<Path>>(model_path: P, dict_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let dict_path = dict_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("OCR recognition model not found: {}", model_path.display());
        }
        if !dict_path.exists() {
            anyhow::bail!(
                "OCR character dictionary not found: {}",
                dict_path.display()
            );
        }

        info!(
            "Loading OCR recognition model from {}",
            model_path.display()
        );

        let file = File::open(dict_path)
            .with_context(|| format!("Failed to open dictionary: {}", dict_path.display()))?;
        let dictionary = parse_dictionary(BufReader::new(file))?;
        info!(
            "Loaded character dictionary with {} entries",
            dictionary.len()
        );

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
                    "Failed to load OCR recognition model from {}",
                    model_path.display()
                )
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        debug!("Recognition model input: {}", input_name);
        info!("OCR recognition model loaded (CPU-only)");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    pub fn dictionary_size(&self) -> usize {
        self.dictionary.len()
    }

    /// Recognize a `[1, 3, 48, W]` tensor from `preprocess_for_recognition`
    pub fn recognize(&self, input: &Array4<f32>) -> Result<RecognizedText> {
        let shape = input.shape();
        if shape[0] != 1
            || shape[1] != 3
            || shape[2] != REC_INPUT_HEIGHT as usize
            || shape[3] < REC_MIN_WIDTH as usize
        {
            anyhow::bail!(
                "Invalid input shape: {:?}, expected [1, 3, {}, W>={}]",
                shape,
                REC_INPUT_HEIGHT,
                REC_MIN_WIDTH
            );
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR recognition session lock poisoned"))?;

        let input_value =
            Value::from_array(input.to_owned()).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let probs = sequence_probabilities(output_tensor.view())?;
        Ok(ctc_greedy_decode(probs, &self.dictionary))
    }
}

/// Build the CTC label table from a PaddleOCR key file
///
/// Index 0 is the blank label, followed by one character per line, then a
/// trailing space label.
pub fn parse_dictionary<R: BufRead>(reader: R) -> Result<Vec<char>> {
    let mut dictionary = vec!['\0'];

    for line in reader.lines() {
        let line = line.context("Failed to read dictionary line")?;
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(ch) = line.chars().next() {
            dictionary.push(ch);
        }
    }

    if dictionary.len() == 1 {
        anyhow::bail!("Character dictionary is empty");
    }

    dictionary.push(' ');
    Ok(dictionary)
}

/// Strip the batch axis from a `[1, T, C]` output
fn sequence_probabilities(output: ArrayViewD<'_, f32>) -> Result<ArrayView2<'_, f32>> {
    let shape = output.shape().to_vec();
    let view = if shape.len() == 3 && shape[0] == 1 {
        output.index_axis_move(Axis(0), 0)
    } else {
        output
    };
    view.into_dimensionality()
        .map_err(|_| anyhow::anyhow!("Unexpected recognition output shape: {:?}", shape))
}

/// Best-path decoding: argmax per timestep, collapse repeats, drop blanks
pub fn ctc_greedy_decode(probs: ArrayView2<'_, f32>, dictionary: &[char]) -> RecognizedText {
    let mut text = String::new();
    let mut total = 0.0f32;
    let mut emitted = 0usize;
    let mut prev = BLANK_INDEX;

    for step in probs.axis_iter(Axis(0)) {
        let (index, prob) = step
            .iter()
            .copied()
            .enumerate()
            .fold((BLANK_INDEX, f32::NEG_INFINITY), |best, (i, p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if index != BLANK_INDEX && index != prev {
            if let Some(&ch) = dictionary.get(index) {
                text.push(ch);
                total += prob;
                emitted += 1;
            }
        }
        prev = index;
    }

    let confidence = if emitted == 0 {
        0.0
    } else {
        (total / emitted as f32).clamp(0.0, 1.0)
    };

    RecognizedText {
        text: text.trim().to_string(),
        confidence,
    }
}
