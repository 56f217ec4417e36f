// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload endpoint handler

use axum::{body::Bytes, extract::State, Json};
use axum_extra::extract::{multipart::MultipartRejection, Multipart};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

use super::response::UploadResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::pipeline::RunLimits;

/// Multipart field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

const MAX_EXTENSION_LEN: usize = 8;

/// An uploaded file held in memory until it is persisted
#[derive(Debug)]
struct UploadedFile {
    file_name: String,
    data: Bytes,
}

/// POST /upload - Detect violations in an uploaded video or image
///
/// # Request
/// `multipart/form-data` with the media in the `file` field
///
/// # Response
/// - `results`: one `{plate_number, traffic_violation}` entry per plate
///   reading across all frames
///
/// # Errors
/// - 400 Bad Request: not multipart, no `file` part, or empty filename
/// - 413 Payload Too Large: file larger than `server.max_upload_bytes`
/// - 503 Service Unavailable: detector or plate reader not loaded
/// - 500 Internal Server Error: decoding or processing failed
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let multipart = multipart.map_err(|e| {
        warn!("Upload rejected: {}", e);
        ApiError::InvalidRequest(format!("Expected multipart/form-data: {}", e))
    })?;

    let upload = read_file_field(multipart, state.config.server.max_upload_bytes).await?;
    info!(
        "Upload received: {} ({} bytes)",
        upload.file_name,
        upload.data.len()
    );

    let pipeline = state.pipeline()?;
    let sources = state.sources.clone();

    // Cancelled when this request is dropped or the server shuts down
    let token = state.shutdown.child_token();
    let _guard = token.clone().drop_guard();

    let summary = tokio::task::spawn_blocking(move || {
        let temp = persist_upload(&upload)?;
        debug!("Upload persisted to {}", temp.path().display());

        let mut source = sources.open_file(temp.path())?;
        let summary = pipeline.run(source.as_mut(), &RunLimits::default(), &token, None)?;
        Ok::<_, ApiError>(summary)
    })
    .await??;

    info!(
        "Upload processed: {} frames, {} results",
        summary.frames_processed,
        summary.records.len()
    );

    Ok(Json(UploadResponse::new(summary.records)))
}

/// Find the `file` part and buffer at most `max_bytes` of its contents
async fn read_file_field(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<UploadedFile, ApiError> {
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        // A plain form value named `file` is not a file part
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(ApiError::InvalidRequest("No selected file".to_string()));
        }

        let mut data = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {}", e)))?
        {
            if data.len() + chunk.len() > max_bytes {
                return Err(ApiError::PayloadTooLarge(format!(
                    "File exceeds the {} byte upload limit",
                    max_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            file_name,
            data: Bytes::from(data),
        });
    }

    Err(ApiError::InvalidRequest("No file part".to_string()))
}

/// Write the upload to a temporary file removed when the handle drops
fn persist_upload(upload: &UploadedFile) -> Result<tempfile::NamedTempFile, ApiError> {
    let suffix = safe_extension(&upload.file_name)
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| ApiError::InternalError(format!("Failed to create temp file: {}", e)))?;

    temp.write_all(&upload.data)
        .and_then(|_| temp.flush())
        .map_err(|e| ApiError::InternalError(format!("Failed to save upload: {}", e)))?;

    Ok(temp)
}

/// Lowercase alphanumeric extension of a client filename
fn safe_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
