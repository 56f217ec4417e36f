// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! PaddleOCR text recognition model
//!
//! Reads one text line (a plate crop or a detected line inside it) with
//! CTC greedy decoding over a character dictionary.

use anyhow::{Context, Result};
use image::RgbImage;
use ndarray::{ArrayView2, Axis, Ix3};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::preprocessing::preprocess_for_recognition;

/// Recognized text with confidence score
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedText {
    pub text: String,
    /// Mean per-character confidence (0.0-1.0)
    pub confidence: f32,
}

impl RecognizedText {
    /// Check if the text is empty or whitespace only
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// PaddleOCR text recognition model (CPU)
#[derive(Clone)]
pub struct TextRecognitionModel {
    /// ONNX Runtime session (thread-safe)
    session: Arc<Mutex<Session>>,
    /// Character dictionary for CTC decoding; index 0 is the blank
    dictionary: Arc<Vec<char>>,
    /// Model input name
    input_name: String,
}

impl std::fmt::Debug for TextRecognitionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRecognitionModel")
            .field("dictionary_size", &self.dictionary.len())
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl TextRecognitionModel {
    /// Load the recognition model and its character dictionary
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - Dictionary file not found
    /// - ONNX Runtime initialization fails
    pub async fn new<P: AsRef<Path>, D: AsRef<Path>>(model_path: P, dict_path: D) -> Result<Self> {
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

        let dictionary = load_dictionary(dict_path)?;
        info!(
            "Loaded character dictionary with {} characters",
            dictionary.len()
        );

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(2)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load OCR recognition model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "x".to_string());

        if let Some(input) = session.inputs.first() {
            debug!("Recognition model expected input: {:?}", input.input_type);
        }
        info!("OCR recognition model loaded");

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            dictionary: Arc::new(dictionary),
            input_name,
        })
    }

    /// Read the single text line contained in `line`
    pub fn recognize(&self, line: &RgbImage) -> Result<RecognizedText> {
        let input = preprocess_for_recognition(line);

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("OCR recognition session lock poisoned"))?;

        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Recognition inference failed")?;

        let output_tensor = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        // Expected [1, seq_len, num_classes]
        let output = output_tensor
            .view()
            .into_dimensionality::<Ix3>()
            .context("Unexpected recognition output rank")?;

        let recognized = ctc_greedy_decode(output.index_axis(Axis(0), 0), &self.dictionary);
        debug!(
            "Recognized '{}' (confidence {:.3})",
            recognized.text, recognized.confidence
        );
        Ok(recognized)
    }
}

/// Load a PaddleOCR character dictionary
///
/// One character per line. Index 0 is reserved for the CTC blank and a
/// trailing space class is appended, as PaddleOCR does with `use_space_char`.
pub fn load_dictionary<P: AsRef<Path>>(path: P) -> Result<Vec<char>> {
    let file = File::open(path.as_ref()).context(format!(
        "Failed to open dictionary: {}",
        path.as_ref().display()
    ))?;

    let reader = BufReader::new(file);
    let mut dictionary = vec!['\0'];

    for line in reader.lines() {
        let line = line.context("Failed to read dictionary line")?;
        if let Some(ch) = line.chars().next() {
            dictionary.push(ch);
        }
    }

    dictionary.push(' ');
    Ok(dictionary)
}

/// CTC greedy (best path) decoding
///
/// `probs` is `[seq_len, num_classes]`. Repeated classes collapse and the
/// blank (index 0) separates genuine repeats.
pub fn ctc_greedy_decode(probs: ArrayView2<f32>, dictionary: &[char]) -> RecognizedText {
    let mut text = String::new();
    let mut total_confidence = 0.0f32;
    let mut chars = 0usize;
    let mut prev_index = 0usize;

    for step in probs.outer_iter() {
        let (max_index, max_prob) = step
            .iter()
            .enumerate()
            .fold((0usize, f32::NEG_INFINITY), |best, (i, &p)| {
                if p > best.1 {
                    (i, p)
                } else {
                    best
                }
            });

        if max_index != 0 && max_index != prev_index {
            if let Some(&ch) = dictionary.get(max_index) {
                text.push(ch);
                total_confidence += max_prob;
                chars += 1;
            }
        }
        prev_index = max_index;
    }

    let confidence = if chars == 0 {
        0.0
    } else {
        (total_confidence / chars as f32).clamp(0.0, 1.0)
    };

    RecognizedText { text, confidence }
}
