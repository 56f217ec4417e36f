// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenCV `VideoCapture` frame source for video files and cameras

use image::RgbImage;
use opencv::{
    core::{Mat, Scalar, CV_8UC3},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::Path;
use tracing::{debug, info, warn};

use super::{FrameSource, SourceError, SourceProvider};
use crate::vision::Frame;

/// Opens any container/codec the system OpenCV build can decode
#[derive(Debug, Default, Clone)]
pub struct OpenCvProvider;

impl SourceProvider for OpenCvProvider {
    fn open_file(&self, path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| SourceError::OpenFailed("path is not valid UTF-8".to_string()))?;

        let cap = VideoCapture::from_file(path_str, videoio::CAP_ANY)
            .map_err(|e| SourceError::OpenFailed(e.to_string()))?;
        if !cap.is_opened().unwrap_or(false) {
            return Err(SourceError::OpenFailed(format!(
                "OpenCV could not open {}",
                path.display()
            )));
        }

        debug!("Opened video file {}", path.display());
        Ok(Box::new(CaptureSource::new(cap)))
    }

    fn open_camera(&self, index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
        let cap = VideoCapture::new(index as i32, videoio::CAP_ANY)
            .map_err(|_| SourceError::CameraUnavailable(index))?;
        if !cap.is_opened().unwrap_or(false) {
            return Err(SourceError::CameraUnavailable(index));
        }

        info!("Opened camera {}", index);
        Ok(Box::new(CaptureSource::new(cap)))
    }

    fn name(&self) -> &'static str {
        "opencv"
    }
}

/// Frames from an open capture; the device is released on drop
struct CaptureSource {
    cap: VideoCapture,
    buffer: Mat,
    next_index: u64,
}

impl CaptureSource {
    fn new(cap: VideoCapture) -> Self {
        Self {
            cap,
            buffer: Mat::default(),
            next_index: 0,
        }
    }
}

impl FrameSource for CaptureSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let index = self.next_index;
        let decode_err = |e: opencv::Error| SourceError::DecodeFailed {
            index,
            reason: e.to_string(),
        };

        if !self.cap.read(&mut self.buffer).map_err(decode_err)? || self.buffer.empty() {
            return Ok(None);
        }

        let rgb = bgr_mat_to_rgb(&self.buffer).map_err(decode_err)?;
        self.next_index += 1;
        Ok(Some(Frame::new(index, rgb)))
    }
}

impl Drop for CaptureSource {
    fn drop(&mut self) {
        if let Err(e) = self.cap.release() {
            warn!("Failed to release capture: {}", e);
        }
    }
}

/// Convert an 8-bit BGR `Mat` into an `RgbImage`
pub fn bgr_mat_to_rgb(mat: &Mat) -> opencv::Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let bytes = rgb.data_bytes()?.to_vec();

    RgbImage::from_raw(width, height, bytes).ok_or_else(|| {
        opencv::Error::new(
            opencv::core::StsUnmatchedSizes,
            "frame buffer does not match its dimensions".to_string(),
        )
    })
}

/// Convert an `RgbImage` into an 8-bit BGR `Mat`
pub fn rgb_to_bgr_mat(image: &RgbImage) -> opencv::Result<Mat> {
    let (width, height) = image.dimensions();
    let mut rgb = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(image.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr)
}
