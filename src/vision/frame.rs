// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoded frames handed from a frame source to the pipeline

use image::imageops::{self, FilterType};
use image::RgbImage;

/// Width realtime frames are resized to before processing
pub const REALTIME_FRAME_WIDTH: u32 = 640;

/// Height realtime frames are resized to before processing
pub const REALTIME_FRAME_HEIGHT: u32 = 480;

/// A single decoded RGB frame
///
/// Owned by the processing loop for one iteration and dropped afterwards.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based position in the source sequence
    pub index: u64,
    /// Pixel data (RGB, 8 bits per channel)
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Resize to exactly `width` x `height`, keeping the index
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.image.dimensions() == (width, height) {
            return self;
        }
        let image = imageops::resize(&self.image, width, height, FilterType::Triangle);
        Self {
            index: self.index,
            image,
        }
    }
}
