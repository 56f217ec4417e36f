// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Frame sources: uploaded files and live cameras
//!
//! A `FrameSource` is a lazy, finite-or-endless sequence of frames. The
//! first failed or empty read ends it; there is no seeking and no retry.
//! Dropping the source releases the underlying file or device.

pub mod image_sequence;
#[cfg(feature = "opencv")]
pub mod capture;

use std::path::Path;
use thiserror::Error;

use crate::vision::Frame;

pub use image_sequence::ImageSequenceProvider;
#[cfg(feature = "opencv")]
pub use capture::OpenCvProvider;

/// Errors raised while opening or reading a frame source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Unable to access the camera (index {0})")]
    CameraUnavailable(u32),

    #[error("Unsupported media format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to open media: {0}")]
    OpenFailed(String),

    #[error("Failed to decode frame {index}: {reason}")]
    DecodeFailed { index: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lazy sequence of decoded frames
pub trait FrameSource {
    /// Next frame, `Ok(None)` once the sequence is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Opens frame sources; one provider is shared by every request
pub trait SourceProvider: Send + Sync {
    /// Decode a media file into frames
    fn open_file(&self, path: &Path) -> Result<Box<dyn FrameSource>, SourceError>;

    /// Open a capture device
    fn open_camera(&self, index: u32) -> Result<Box<dyn FrameSource>, SourceError>;

    /// Short backend name for logs and health output
    fn name(&self) -> &'static str;
}

/// Provider picked by the enabled features
pub fn default_provider() -> Box<dyn SourceProvider> {
    #[cfg(feature = "opencv")]
    {
        Box::new(OpenCvProvider::default())
    }
    #[cfg(not(feature = "opencv"))]
    {
        Box::new(ImageSequenceProvider::default())
    }
}

/// Source over frames already in memory
#[derive(Debug, Default)]
pub struct VecSource {
    frames: std::collections::VecDeque<Frame>,
}

impl VecSource {
    pub fn new(images: Vec<image::RgbImage>) -> Self {
        Self {
            frames: images
                .into_iter()
                .enumerate()
                .map(|(i, image)| Frame::new(i as u64, image))
                .collect(),
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frames.pop_front())
    }
}
