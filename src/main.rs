// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Parser;
use std::env;
use tokio::signal;
use tracing::{info, warn};
use traffic_sentinel::{api::start_server, cli::Cli, AppState, VisionModelManager};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = cli.load_config()?;

    println!("🚦 Starting traffic-sentinel v{}", env!("CARGO_PKG_VERSION"));
    println!("   Bind address: {}", config.bind_address());
    println!("   Camera index: {}", config.realtime.camera_index);
    if config.policy.simulate_signals {
        println!("   ⚠️  Simulated speed and lane signals enabled (demo mode)");
    }
    println!();

    let models = VisionModelManager::new(config.vision_model_config()).await;
    for model in models.list_models() {
        if model.available {
            info!("{} ({}) ready", model.name, model.model_type);
        } else {
            warn!(
                "{} ({}) not loaded, dependent endpoints will answer 503",
                model.name, model.model_type
            );
        }
    }

    let state = AppState::new(config, models);
    info!("Frame source backend: {}", state.sources.name());

    let shutdown = state.shutdown.clone();
    let mut server = tokio::spawn(start_server(state));

    // Wait for shutdown signal, or the server failing on its own
    tokio::select! {
        result = signal::ctrl_c() => {
            result?;
            println!("\n⏹️  Shutting down...");
            shutdown.cancel();
        }
        result = &mut server => return result?,
    }

    server.await??;

    println!("👋 Goodbye!");
    Ok(())
}
