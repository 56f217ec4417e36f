// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Command-line interface for the traffic-sentinel server

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::config::ServiceConfig;

/// Traffic violation detection server
#[derive(Parser, Debug, Default)]
#[command(name = "traffic-sentinel")]
#[command(version)]
#[command(about = "HTTP service that flags traffic violations in uploaded videos and camera streams", long_about = None)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "SENTINEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Capture device used by /realtime
    #[arg(long)]
    pub camera_index: Option<u32>,

    /// Feed the violation checklist random speed and lane signals (demo only)
    #[arg(long)]
    pub simulate_signals: bool,

    /// Seed for simulated signals
    #[arg(long, requires = "simulate_signals")]
    pub seed: Option<u64>,
}

impl Cli {
    /// Resolve the effective configuration: file, then environment, then flags
    pub fn load_config(&self) -> Result<ServiceConfig> {
        let mut config = match &self.config {
            Some(path) => ServiceConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?,
            None => ServiceConfig::default(),
        };

        config.apply_env();
        self.apply_to(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Flags given on the command line win over every other layer
    pub fn apply_to(&self, config: &mut ServiceConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(index) = self.camera_index {
            config.realtime.camera_index = index;
        }
        if self.simulate_signals {
            config.policy.simulate_signals = true;
        }
        if self.seed.is_some() {
            config.policy.seed = self.seed;
        }
    }
}
