// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Schneidwerk — PDF split and validation service.
//
// Entry point.  Initialises logging, the metrics registry, the engine, and
// the artifact sweeper, then serves the HTTP facade until shutdown.

mod metrics;
mod routes;
mod state;

use std::sync::Arc;

use tracing::{info, warn};

use schneidwerk_core::config::ServiceConfig;
use schneidwerk_core::metrics::MetricsSink;
use schneidwerk_service::Engine;
use schneidwerk_store::{Sweeper, sweep};

use metrics::PrometheusMetrics;
use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServiceConfig::from_env();
    info!(?config, "Schneidwerk starting");

    // Clear out anything left over from a previous run before the periodic
    // sweeper takes over.
    match sweep(&config.temp_dir, config.retention()) {
        Ok(evicted) if evicted > 0 => info!(evicted, "startup sweep evicted artifact groups"),
        Ok(_) => {}
        Err(err) => warn!(%err, "startup sweep failed"),
    }

    let mut sweeper = Sweeper::new(
        &config.temp_dir,
        config.retention(),
        config.sweep_interval(),
    );
    sweeper.start();

    let prometheus = Arc::new(PrometheusMetrics::new().expect("metrics registry init"));
    let engine = Arc::new(
        Engine::new(
            config.clone(),
            Arc::clone(&prometheus) as Arc<dyn MetricsSink>,
        )
        .expect("engine init"),
    );

    let app = routes::router(AppState {
        engine,
        metrics: prometheus,
    });

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .expect("bind listen address");
    info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server run");

    if let Err(err) = sweeper.stop().await {
        warn!(%err, "sweeper did not stop cleanly");
    }
    info!("Schneidwerk stopped");
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}
