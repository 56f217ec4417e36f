// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

use super::errors::ApiError;
use super::realtime::realtime_handler;
use super::upload::upload_handler;
use crate::config::ServiceConfig;
use crate::pipeline::{NoSignals, Pipeline, SignalSource, SimulatedSignals, ViolationPolicy};
use crate::source::{default_provider, SourceProvider};
use crate::vision::{VisionModelInfo, VisionModelManager};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub models: VisionModelManager,
    pub sources: Arc<dyn SourceProvider>,
    pub policy: Arc<dyn ViolationPolicy>,
    pub signals: Arc<dyn SignalSource>,
    pub config: Arc<ServiceConfig>,
    /// Cancelled on server shutdown; request tokens are children of it
    pub shutdown: CancellationToken,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("models", &self.models)
            .field("sources", &self.sources.name())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// State built from configuration with already loaded models
    pub fn new(config: ServiceConfig, models: VisionModelManager) -> Self {
        let signals: Arc<dyn SignalSource> = if config.policy.simulate_signals {
            Arc::new(SimulatedSignals::new(config.policy.seed))
        } else {
            Arc::new(NoSignals)
        };

        Self {
            models,
            sources: Arc::from(default_provider()),
            policy: Arc::new(config.policy.checklist()),
            signals,
            config: Arc::new(config),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_sources(mut self, sources: Arc<dyn SourceProvider>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = signals;
        self
    }

    /// Pipeline over the loaded models, or 503 when one is missing
    pub fn pipeline(&self) -> Result<Pipeline, ApiError> {
        let detector = self.models.detector().ok_or_else(|| {
            ApiError::ServiceUnavailable("Detection model not loaded".to_string())
        })?;
        let plate_reader = self.models.plate_reader().ok_or_else(|| {
            ApiError::ServiceUnavailable("Plate reader model not loaded".to_string())
        })?;

        Ok(Pipeline::new(detector, plate_reader)
            .with_policy(self.policy.clone())
            .with_signals(self.signals.clone())
            .with_classes(self.config.detector.class_map()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "ok" when every model is loaded, otherwise "degraded"
    pub status: String,
    pub detector: bool,
    pub plate_reader: bool,
    pub frame_source: String,
    pub models: Vec<VisionModelInfo>,
}

/// Room for multipart boundaries, part headers and small form values on
/// top of the file size limit
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let body_limit = state
        .config
        .server
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/upload", post(upload_handler))
        // Path used by the web front end
        .route("/process_video", post(upload_handler))
        .route("/realtime", get(realtime_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let detector = state.models.has_detector();
    let plate_reader = state.models.has_plate_reader();

    Json(HealthResponse {
        status: if detector && plate_reader { "ok" } else { "degraded" }.to_string(),
        detector,
        plate_reader,
        frame_source: state.sources.name().to_string(),
        models: state.models.list_models(),
    })
}

/// Serve until `state.shutdown` is cancelled
pub async fn start_server(state: AppState) -> anyhow::Result<()> {
    let addr = state.config.bind_address();
    let shutdown = state.shutdown.clone();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("API server stopped");
    Ok(())
}
