// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pure-Rust frame source for still images and animated GIFs

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, Frames, ImageFormat};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::debug;

use super::{FrameSource, SourceError, SourceProvider};
use crate::vision::image_utils::{decode_image_bytes, detect_format, MAX_IMAGE_SIZE};
use crate::vision::Frame;

/// Bytes needed to recognise any supported format
const SNIFF_LEN: usize = 16;

/// Decodes uploads with the `image` crate
///
/// Still images give one frame and animated GIFs give one frame per
/// animation frame. Cameras are not supported.
#[derive(Debug, Default, Clone)]
pub struct ImageSequenceProvider;

impl SourceProvider for ImageSequenceProvider {
    fn open_file(&self, path: &Path) -> Result<Box<dyn FrameSource>, SourceError> {
        let mut file = File::open(path)?;

        let size = file.metadata()?.len() as usize;
        if size > MAX_IMAGE_SIZE {
            return Err(SourceError::OpenFailed(format!(
                "file is too large: {} bytes (max: {} bytes)",
                size, MAX_IMAGE_SIZE
            )));
        }

        let mut header = Vec::with_capacity(SNIFF_LEN);
        file.by_ref().take(SNIFF_LEN as u64).read_to_end(&mut header)?;
        let format = detect_format(&header)
            .map_err(|_| {
                SourceError::UnsupportedFormat(format!(
                    "{} (video files such as mp4 or avi need a build with --features opencv)",
                    describe(path)
                ))
            })?;

        debug!("Opening {} as {:?}", path.display(), format);

        if format == ImageFormat::Gif {
            // Reopen so the decoder sees the file from the start
            let reader = BufReader::new(File::open(path)?);
            let decoder = GifDecoder::new(reader)
                .map_err(|e| SourceError::OpenFailed(e.to_string()))?;
            return Ok(Box::new(GifSource {
                frames: decoder.into_frames(),
                next_index: 0,
            }));
        }

        let bytes = std::fs::read(path)?;
        let (image, info) =
            decode_image_bytes(&bytes).map_err(|e| SourceError::OpenFailed(e.to_string()))?;
        debug!(
            "Decoded {}x{} {:?} image ({} bytes)",
            info.width, info.height, info.format, info.size_bytes
        );
        Ok(Box::new(StillSource {
            image: Some(image),
        }))
    }

    fn open_camera(&self, index: u32) -> Result<Box<dyn FrameSource>, SourceError> {
        Err(SourceError::CameraUnavailable(index))
    }

    fn name(&self) -> &'static str {
        "image"
    }
}

fn describe(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{} file", e))
        .unwrap_or_else(|| "file without extension".to_string())
}

/// Single decoded image
struct StillSource {
    image: Option<DynamicImage>,
}

impl FrameSource for StillSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.image.take().map(|img| Frame::new(0, img.to_rgb8())))
    }
}

/// Animated GIF decoded one frame at a time
struct GifSource {
    frames: Frames<'static>,
    next_index: u64,
}

impl FrameSource for GifSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some(next) = self.frames.next() else {
            return Ok(None);
        };

        let index = self.next_index;
        let frame = next.map_err(|e| SourceError::DecodeFailed {
            index,
            reason: e.to_string(),
        })?;
        self.next_index += 1;

        let rgb = DynamicImage::ImageRgba8(frame.into_buffer()).to_rgb8();
        Ok(Some(Frame::new(index, rgb)))
    }
}
