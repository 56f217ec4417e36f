// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Realtime response types

use serde::Serialize;

use crate::pipeline::{RunSummary, StopReason, ViolationRecord};

/// Response from a finished realtime session
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeResponse {
    /// One record per plate reading, in frame order
    pub results: Vec<ViolationRecord>,
    pub frames_processed: u64,
    /// Why the capture loop ended
    pub stop_reason: StopReason,
}

impl From<RunSummary> for RealtimeResponse {
    fn from(summary: RunSummary) -> Self {
        Self {
            results: summary.records,
            frames_processed: summary.frames_processed,
            stop_reason: summary.stop_reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_serialized_snake_case() {
        let response = RealtimeResponse::from(RunSummary {
            records: vec![],
            frames_processed: 12,
            stop_reason: StopReason::FrameLimit,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["stop_reason"], "frame_limit");
        assert_eq!(json["frames_processed"], 12);
        assert_eq!(json["results"], serde_json::json!([]));
    }
}
