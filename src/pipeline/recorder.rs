// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Draws overlays onto realtime frames and records them with OpenCV

use anyhow::{Context, Result};
use opencv::{
    core::{Point, Scalar, Size},
    imgproc,
    prelude::*,
    videoio::VideoWriter,
};
use std::path::{Path, PathBuf};
use tracing::info;

use super::overlay::{FrameSink, Overlay};
use crate::source::capture::rgb_to_bgr_mat;
use crate::vision::Frame;

/// Writes annotated frames to an MJPG video file
///
/// The writer is opened lazily on the first frame so the output size
/// matches the stream.
pub struct VideoRecorderSink {
    path: PathBuf,
    fps: f64,
    writer: Option<VideoWriter>,
    frames_written: u64,
}

impl std::fmt::Debug for VideoRecorderSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoRecorderSink")
            .field("path", &self.path)
            .field("fps", &self.fps)
            .field("frames_written", &self.frames_written)
            .finish_non_exhaustive()
    }
}

impl VideoRecorderSink {
    pub fn new<P: AsRef<Path>>(path: P, fps: f64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fps,
            writer: None,
            frames_written: 0,
        }
    }

    fn writer_for(&mut self, frame: &Frame) -> Result<&mut VideoWriter> {
        if self.writer.is_none() {
            let path = self
                .path
                .to_str()
                .context("Recording path is not valid UTF-8")?;
            let writer = VideoWriter::new(
                path,
                VideoWriter::fourcc('M', 'J', 'P', 'G')?,
                self.fps,
                Size::new(frame.width() as i32, frame.height() as i32),
                true,
            )
            .context(format!("Failed to open video writer at {}", path))?;
            info!("Recording realtime stream to {}", path);
            self.writer = Some(writer);
        }
        self.writer
            .as_mut()
            .context("Video writer was not initialised")
    }
}

impl FrameSink for VideoRecorderSink {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        let mut mat = rgb_to_bgr_mat(&frame.image)?;

        for line in &overlay.lines {
            let [r, g, b] = line.color;
            imgproc::put_text(
                &mut mat,
                &line.text,
                Point::new(line.origin.0, line.origin.1),
                imgproc::FONT_HERSHEY_SIMPLEX,
                1.0,
                Scalar::new(b as f64, g as f64, r as f64, 0.0),
                2,
                imgproc::LINE_8,
                false,
            )?;
        }

        self.writer_for(frame)?.write(&mat)?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.release()?;
            info!(
                "Recorded {} frames to {}",
                self.frames_written,
                self.path.display()
            );
        }
        Ok(())
    }
}
