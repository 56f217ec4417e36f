// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Letterbox resizing and tensor conversion shared by the ONNX models

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::Array4;

/// Resize image with aspect ratio preservation and padding
///
/// The image is scaled to fit within target_size x target_size
/// while preserving aspect ratio, then centered on a `pad` background.
pub fn resize_with_padding(image: &RgbImage, target_size: u32, pad: Rgb<u8>) -> RgbImage {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return RgbImage::from_pixel(target_size, target_size, pad);
    }

    let info = PreprocessInfo::from_dimensions(orig_w, orig_h, target_size);
    let new_w = ((orig_w as f32 * info.scale).round() as u32).clamp(1, target_size);
    let new_h = ((orig_h as f32 * info.scale).round() as u32).clamp(1, target_size);

    let resized = imageops::resize(image, new_w, new_h, FilterType::Triangle);

    let mut output = RgbImage::from_pixel(target_size, target_size, pad);
    imageops::replace(
        &mut output,
        &resized,
        info.offset_x as i64,
        info.offset_y as i64,
    );

    output
}

/// Convert an RGB image to an NCHW tensor `[1, 3, H, W]`
///
/// `normalize` receives the channel index and the raw 0-255 value.
pub fn to_nchw_tensor<F>(image: &RgbImage, normalize: F) -> Array4<f32>
where
    F: Fn(usize, u8) -> f32,
{
    let (width, height) = image.dimensions();
    let mut tensor = Array4::zeros((1, 3, height as usize, width as usize));

    for (x, y, pixel) in image.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = normalize(c, pixel[c]);
        }
    }

    tensor
}

/// Scaling factor and offsets used during letterboxing
/// Useful for mapping detection results back to original coordinates
#[derive(Debug, Clone, Copy)]
pub struct PreprocessInfo {
    /// Scale factor applied
    pub scale: f32,
    /// X offset from padding
    pub offset_x: u32,
    /// Y offset from padding
    pub offset_y: u32,
    /// Original image width
    pub original_width: u32,
    /// Original image height
    pub original_height: u32,
}

impl PreprocessInfo {
    /// Calculate preprocessing info for an image
    pub fn new(image: &RgbImage, target_size: u32) -> Self {
        let (w, h) = image.dimensions();
        Self::from_dimensions(w, h, target_size)
    }

    pub fn from_dimensions(orig_w: u32, orig_h: u32, target_size: u32) -> Self {
        if orig_w == 0 || orig_h == 0 {
            return Self {
                scale: 1.0,
                offset_x: 0,
                offset_y: 0,
                original_width: orig_w,
                original_height: orig_h,
            };
        }

        let scale = (target_size as f32 / orig_w as f32).min(target_size as f32 / orig_h as f32);
        let new_w = ((orig_w as f32 * scale).round() as u32).min(target_size);
        let new_h = ((orig_h as f32 * scale).round() as u32).min(target_size);

        Self {
            scale,
            offset_x: (target_size - new_w) / 2,
            offset_y: (target_size - new_h) / 2,
            original_width: orig_w,
            original_height: orig_h,
        }
    }

    /// Map a coordinate from preprocessed space back to original image space
    pub fn map_to_original(&self, x: f32, y: f32) -> (f32, f32) {
        let orig_x = (x - self.offset_x as f32) / self.scale;
        let orig_y = (y - self.offset_y as f32) / self.scale;
        (orig_x, orig_y)
    }
}
