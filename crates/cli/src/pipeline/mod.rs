//! Pipeline wiring: line source, sink selection and run statistics.

mod sink;
mod source;
mod stats;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tracing::{info, warn};

use contracts::ShipperBlueprint;
use dispatcher::Dispatcher;

use crate::error::Result;

pub use sink::ConfiguredSink;
pub use source::{parse_source_line, read_lines, SourceStats};
pub use stats::RunStats;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Validated configuration
    pub blueprint: ShipperBlueprint,

    /// Fixed file identifier for every input line
    pub file_id: Option<String>,

    /// Channel buffer size
    pub buffer_size: usize,
}

/// Feed `input` through the dispatcher until it ends or `shutdown` fires.
///
/// Records still buffered when the run ends are discarded.
pub async fn run<R, F>(config: PipelineConfig, input: R, shutdown: F) -> Result<RunStats>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    F: Future<Output = ()>,
{
    let start_time = Instant::now();
    let blueprint = config.blueprint;

    let sink = Arc::new(ConfiguredSink::from_transport(&blueprint.transport)?);
    let mut dispatcher = Dispatcher::new(&blueprint.streams, sink)?;

    let (tx, rx) = mpsc::channel(config.buffer_size.max(1));
    let reader = tokio::spawn(read_lines(input, tx, config.file_id));

    info!(streams = blueprint.streams.len(), "Pipeline running");
    let signalled = AtomicBool::new(false);
    dispatcher
        .run_until(rx, async {
            shutdown.await;
            signalled.store(true, Ordering::Relaxed);
        })
        .await;

    let source = if !signalled.load(Ordering::Relaxed) {
        // Channel closed, so the reader has returned or is about to
        match reader.await {
            Ok(Ok(stats)) => stats,
            Ok(Err(e)) => {
                warn!(error = %e, "Line source failed");
                SourceStats::default()
            }
            Err(e) => {
                warn!(error = %e, "Line source task failed");
                SourceStats::default()
            }
        }
    } else {
        // Still blocked on input after a shutdown signal
        reader.abort();
        SourceStats::default()
    };

    Ok(RunStats {
        source,
        lines_dispatched: dispatcher.lines(),
        duration: start_time.elapsed(),
        streams: dispatcher.metrics(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{SinkType, StreamDefinition, TransportConfig};
    use std::time::Duration;
    use tempfile::tempdir;

    fn blueprint(base_path: &std::path::Path) -> ShipperBlueprint {
        let mut transport = TransportConfig {
            kind: SinkType::File,
            ..TransportConfig::default()
        };
        transport.params.insert(
            "base_path".to_string(),
            base_path.display().to_string(),
        );

        let mut apps = StreamDefinition::new("apps", ["app-*.log"]);
        apps.max_records = 2;
        apps.flush_interval_ms = 0;

        ShipperBlueprint {
            transport,
            streams: vec![apps],
            ..ShipperBlueprint::default()
        }
    }

    #[tokio::test]
    async fn test_run_ships_tab_separated_input() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            blueprint: blueprint(dir.path()),
            file_id: None,
            buffer_size: 8,
        };
        let input: &'static [u8] =
            b"app-1.log\tfirst\napp-2.log\tsecond\nweb.log\tignored\nno tab here\napp-1.log\tthird\n";

        let stats = run(config, input, std::future::pending()).await.unwrap();

        assert_eq!(stats.source.read, 5);
        assert_eq!(stats.source.skipped, 1);
        assert_eq!(stats.lines_dispatched, 4);
        assert_eq!(stats.streams[0].1.accepted, 3);

        // The first two lines filled a batch; the third was discarded on stop
        let path = dir.path().join("apps.jsonl");
        let mut written = String::new();
        for _ in 0..50 {
            written = std::fs::read_to_string(&path).unwrap_or_default();
            if written.lines().count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains("\"first\""));
        assert!(written.contains("\"second\""));
    }

    #[tokio::test]
    async fn test_run_with_fixed_file_id() {
        let dir = tempdir().unwrap();
        let config = PipelineConfig {
            blueprint: blueprint(dir.path()),
            file_id: Some("app-9.log".to_string()),
            buffer_size: 8,
        };
        let input: &'static [u8] = b"one\ttab\ntwo\n";

        let stats = run(config, input, std::future::pending()).await.unwrap();

        assert_eq!(stats.source.skipped, 0);
        assert_eq!(stats.streams[0].1.accepted, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_source_stats_reported_after_eof() {
        let dir = tempdir().unwrap();
        for _ in 0..20 {
            let config = PipelineConfig {
                blueprint: blueprint(dir.path()),
                file_id: None,
                buffer_size: 8,
            };
            let input: &'static [u8] = b"app-1.log\tone\nbad\n";

            let stats = run(config, input, std::future::pending()).await.unwrap();

            assert_eq!(stats.source, SourceStats { read: 2, skipped: 1 });
        }
    }
}
