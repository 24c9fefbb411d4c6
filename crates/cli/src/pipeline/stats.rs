//! Run statistics printed at shutdown.

use std::time::Duration;

use contracts::StreamId;
use dispatcher::MetricsSnapshot;

use super::SourceStats;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Input line counters
    pub source: SourceStats,

    /// Lines handed to the dispatcher, routed or not
    pub lines_dispatched: u64,

    /// Total duration of the run
    pub duration: Duration,

    /// Per-stream counters, ordered by stream name
    pub streams: Vec<(StreamId, MetricsSnapshot)>,
}

impl RunStats {
    /// Dispatched lines per second
    pub fn lines_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.lines_dispatched as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Records still buffered when the run stopped
    pub fn discarded(&self) -> usize {
        self.streams.iter().map(|(_, m)| m.buffered).sum()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Shipping Statistics                     ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Lines read: {}", self.source.read);
        println!("   ├─ Lines skipped: {}", self.source.skipped);
        println!("   ├─ Lines dispatched: {}", self.lines_dispatched);
        println!("   ├─ Lines/s: {:.2}", self.lines_per_sec());
        println!("   └─ Discarded at stop: {}", self.discarded());

        for (name, m) in &self.streams {
            println!("\nStream {name}");
            println!("   ├─ Accepted: {}", m.accepted);
            println!("   ├─ Batches: {}", m.batches);
            println!("   ├─ Delivered: {}", m.delivered);
            println!("   ├─ Retries: {}", m.retries);
            println!("   ├─ Abandoned: {}", m.abandoned);
            println!("   ├─ Transport failures: {}", m.transport_failures);
            println!("   ├─ Oversized dropped: {}", m.oversized);
            println!("   ├─ Malformed dropped: {}", m.malformed);
            println!("   └─ Buffered at stop: {}", m.buffered);
        }

        println!();
    }
}
