// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Realtime query parameters

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RealtimeConfig;
use crate::pipeline::RunLimits;

/// Query parameters for GET /realtime
///
/// Both caps fall back to the configured defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RealtimeParams {
    /// Stop after this many frames
    #[serde(default)]
    pub max_frames: Option<u64>,
    /// Stop after this many seconds
    #[serde(default)]
    pub duration_secs: Option<u64>,
}

impl RealtimeParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_frames == Some(0) {
            return Err("max_frames must be greater than 0".to_string());
        }
        if self.duration_secs == Some(0) {
            return Err("duration_secs must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Run limits for this request, frames resized to the realtime size
    pub fn limits(&self, defaults: &RealtimeConfig) -> RunLimits {
        RunLimits {
            max_frames: self.max_frames.or(defaults.max_frames),
            max_duration: self
                .duration_secs
                .map(Duration::from_secs)
                .or_else(|| defaults.duration()),
            resize: Some((defaults.frame_width, defaults.frame_height)),
        }
    }
}
