// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload-and-process endpoint
//!
//! Provides POST /upload (and POST /process_video) for running the
//! violation pipeline over an uploaded video or image.

pub mod handler;
pub mod response;

pub use handler::{upload_handler, FILE_FIELD};
pub use response::UploadResponse;
