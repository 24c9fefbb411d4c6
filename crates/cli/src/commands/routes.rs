//! `routes` command implementation.

use anyhow::{Context, Result};

use dispatcher::Router;

use crate::cli::RoutesArgs;
use crate::error::load_config;

/// Execute the `routes` command
pub fn run_routes(args: &RoutesArgs) -> Result<()> {
    let blueprint = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut router = Router::new();
    for stream in &blueprint.streams {
        router.add_patterns(stream.stream_name.as_str(), &stream.files)?;
    }

    for line in resolve(&mut router, &args.file_ids) {
        println!("{line}");
    }
    Ok(())
}

fn resolve(router: &mut Router, file_ids: &[String]) -> Vec<String> {
    file_ids
        .iter()
        .map(|file_id| {
            let streams = router.route(file_id);
            if streams.is_empty() {
                format!("{file_id} -> (no streams, dropped)")
            } else {
                let names: Vec<&str> = streams.iter().map(|s| s.as_str()).collect();
                format!("{file_id} -> {}", names.join(", "))
            }
        })
        .collect()
}
