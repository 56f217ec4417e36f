// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod source;
pub mod vision;

pub use api::http_server::{create_app, AppState};
pub use config::ServiceConfig;
pub use pipeline::{Pipeline, RunLimits, RunSummary, StopReason, ViolationRecord};
pub use source::{FrameSource, SourceError, SourceProvider};
pub use vision::{Detector, Frame, PlateReader, VisionModelManager};
