// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Realtime endpoint handler

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use tracing::{info, warn};

use super::request::RealtimeParams;
use super::response::RealtimeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::config::RealtimeConfig;
use crate::pipeline::{FrameSink, TracingSink};

/// GET /realtime - Detect violations on the live camera stream
///
/// Frames are read from the configured camera, resized to the realtime
/// frame size and processed one by one. Each frame's overlay goes to the
/// frame sink. The loop ends on read failure, on `max_frames`, after
/// `duration_secs`, when the client disconnects, or on server shutdown.
///
/// # Errors
/// - 400 Bad Request: invalid query parameters
/// - 500 Internal Server Error: camera unavailable or processing failed
/// - 503 Service Unavailable: detector or plate reader not loaded
pub async fn realtime_handler(
    State(state): State<AppState>,
    params: Result<Query<RealtimeParams>, QueryRejection>,
) -> Result<Json<RealtimeResponse>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    params.validate().map_err(ApiError::InvalidRequest)?;

    let limits = params.limits(&state.config.realtime);
    let camera_index = state.config.realtime.camera_index;
    info!(
        "Realtime session on camera {} (max_frames: {:?}, max_duration: {:?})",
        camera_index, limits.max_frames, limits.max_duration
    );

    let token = state.shutdown.child_token();
    let _guard = token.clone().drop_guard();

    let summary = tokio::task::spawn_blocking(move || {
        let mut source = state.sources.open_camera(camera_index).map_err(|e| {
            warn!("{}", e);
            ApiError::from(e)
        })?;

        let pipeline = state.pipeline()?;
        let mut sink = frame_sink(&state.config.realtime);
        let summary = pipeline.run(source.as_mut(), &limits, &token, Some(sink.as_mut()))?;
        Ok::<_, ApiError>(summary)
    })
    .await??;

    Ok(Json(RealtimeResponse::from(summary)))
}

/// Sink for annotated frames: a video recorder when configured, otherwise logs
fn frame_sink(config: &RealtimeConfig) -> Box<dyn FrameSink> {
    #[cfg(feature = "opencv")]
    {
        if let Some(path) = &config.record_path {
            info!("Recording annotated frames to {}", path.display());
            return Box::new(crate::pipeline::VideoRecorderSink::new(
                path,
                config.record_fps,
            ));
        }
    }

    #[cfg(not(feature = "opencv"))]
    {
        if let Some(path) = &config.record_path {
            warn!(
                "Recording to {} needs the opencv feature, logging overlays instead",
                path.display()
            );
        }
    }

    Box::new(TracingSink)
}
