//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SinkType, ShipperBlueprint};

use crate::cli::ValidateArgs;
use crate::error::load_config;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sink: String,
    stream_count: usize,
    pattern_count: usize,
    streams: Vec<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match load_config(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &ShipperBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        sink: format!("{:?}", blueprint.transport.kind),
        stream_count: blueprint.streams.len(),
        pattern_count: blueprint.streams.iter().map(|s| s.files.len()).sum(),
        streams: blueprint
            .streams
            .iter()
            .map(|s| s.stream_name.clone())
            .collect(),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &ShipperBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.streams.is_empty() {
        warnings.push("No streams configured - every line will be dropped".to_string());
    }

    for stream in &blueprint.streams {
        let name = &stream.stream_name;
        if let Some(key) = &stream.partition_key {
            warnings.push(format!(
                "Stream '{name}' uses static partition key '{key}' - all records go to one shard"
            ));
        }
        if stream.flush_interval().is_none() {
            warnings.push(format!(
                "Stream '{name}' has no flush interval - records wait for a full batch"
            ));
        }
        if stream.max_retries == 0 {
            warnings.push(format!(
                "Stream '{name}' has max_retries = 0 - failed records are dropped immediately"
            ));
        }
    }

    if blueprint.transport.kind == SinkType::File
        && !blueprint.transport.params.contains_key("base_path")
    {
        warnings.push("transport.params.base_path not set - using ./output".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Sink: {}", summary.sink);
            println!("  Streams: {}", summary.stream_count);
            println!("  Patterns: {}", summary.pattern_count);
            for name in &summary.streams {
                println!("    - {}", name);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
