//! # Log Streamer CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 从 stdin 读取日志行并路由到各个流
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_pipeline, run_routes, run_validate};

/// How long in-flight deliveries may keep running after the command returns
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    observability::init_tracing(cli.log_format.into(), cli.default_log_level())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Log Streamer CLI starting"
    );

    // Built by hand so a stdin read blocked at shutdown cannot hold the process
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let result = runtime.block_on(async {
        match &cli.command {
            Commands::Run(args) => run_pipeline(args).await,
            Commands::Validate(args) => run_validate(args),
            Commands::Routes(args) => run_routes(args),
        }
    });
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}
