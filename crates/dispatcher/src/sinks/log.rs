//! LogSink - logs batch summaries via tracing

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ContractError, PutBatchOutput, Record, RecordOutcome, StreamSink};
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SHARD_ID: &str = "shardId-000000000000";

/// Sink that logs batch summaries and acknowledges every record
pub struct LogSink {
    name: String,
    sequence: AtomicU64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: AtomicU64::new(0),
        }
    }

    fn log_batch_summary(&self, stream_name: &str, records: &[Record]) {
        let bytes: usize = records.iter().map(Record::size).sum();
        info!(
            sink = %self.name,
            stream = stream_name,
            records = records.len(),
            bytes,
            "Batch received"
        );
        for record in records {
            debug!(
                stream = stream_name,
                partition_key = %record.partition_key,
                data = %String::from_utf8_lossy(&record.data),
                "Record"
            );
        }
    }
}

impl StreamSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_put_batch",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    async fn put_batch(
        &self,
        stream_name: &str,
        records: &[Record],
    ) -> Result<PutBatchOutput, ContractError> {
        self.log_batch_summary(stream_name, records);

        let first = self
            .sequence
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        let outcomes = (first..first + records.len() as u64)
            .map(|seq| RecordOutcome::delivered(format!("{seq:020}"), SHARD_ID))
            .collect();

        Ok(PutBatchOutput::from_outcomes(outcomes).with_request_id(Uuid::new_v4().to_string()))
    }
}
