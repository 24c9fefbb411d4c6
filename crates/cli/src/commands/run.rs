//! `run` command implementation.

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::load_config;
use crate::pipeline::{self, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let blueprint = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        sink = ?blueprint.transport.kind,
        streams = blueprint.streams.len(),
        file_id = args.file_id.as_deref().unwrap_or("<per line>"),
        "Configuration loaded"
    );
    if blueprint.streams.is_empty() {
        warn!("No streams configured, every line will be dropped");
    }

    if let Some(port) = args.metrics_port {
        observability::init_metrics_only(port)?;
    }

    let config = PipelineConfig {
        blueprint,
        file_id: args.file_id.clone(),
        buffer_size: args.buffer_size,
    };
    let input = BufReader::new(tokio::io::stdin());

    let stats = pipeline::run(config, input, shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        lines = stats.lines_dispatched,
        discarded = stats.discarded(),
        duration_secs = stats.duration.as_secs_f64(),
        "Pipeline stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal, stopping");
}
