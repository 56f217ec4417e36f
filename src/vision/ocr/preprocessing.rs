// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Plate crop preprocessing for the PaddleOCR models

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

use crate::vision::preprocessing::{resize_with_padding, to_nchw_tensor, PreprocessInfo};

/// Square input size for the text detection model
pub const DET_INPUT_SIZE: u32 = 640;

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

const DET_PAD_COLOR: Rgb<u8> = Rgb([128, 128, 128]);

/// Letterbox a plate crop for text detection
///
/// Normalized with ImageNet mean/std: `(pixel/255 - mean) / std`.
pub fn preprocess_for_detection(crop: &RgbImage) -> (Array4<f32>, PreprocessInfo) {
    let info = PreprocessInfo::new(crop, DET_INPUT_SIZE);
    let padded = resize_with_padding(crop, DET_INPUT_SIZE, DET_PAD_COLOR);
    let tensor = to_nchw_tensor(&padded, |c, v| (v as f32 / 255.0 - MEAN[c]) / STD[c]);
    (tensor, info)
}

/// Resize a text line to the recognition height, keeping its aspect ratio
///
/// Output shape is `[1, 3, 48, W]` with `W` in `REC_MIN_WIDTH..=REC_MAX_WIDTH`.
/// Recognition normalizes to `[-1, 1]`.
pub fn preprocess_for_recognition(line: &RgbImage) -> Array4<f32> {
    let (orig_w, orig_h) = line.dimensions();

    let new_width = if orig_h == 0 {
        REC_MIN_WIDTH
    } else {
        let scale = REC_INPUT_HEIGHT as f32 / orig_h as f32;
        ((orig_w as f32 * scale).round() as u32).clamp(REC_MIN_WIDTH, REC_MAX_WIDTH)
    };

    let resized = imageops::resize(line, new_width, REC_INPUT_HEIGHT, FilterType::Lanczos3);
    to_nchw_tensor(&resized, |_, v| v as f32 / 127.5 - 1.0)
}
