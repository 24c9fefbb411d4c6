//! FileSink - appends records to one JSON-lines file per stream

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ContractError, PutBatchOutput, Record, RecordOutcome, StreamSink};
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
}

impl FileSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./output"));

        Self { base_path }
    }
}

#[derive(Serialize)]
struct FileLine<'a> {
    stream: &'a str,
    partition_key: &'a str,
    data: Cow<'a, str>,
}

/// Sink that writes every record as a JSON line under `base_path`
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    /// Serializes appends so concurrent batches never interleave lines
    append_lock: Mutex<()>,
    sequence: AtomicU64,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            append_lock: Mutex::new(()),
            sequence: AtomicU64::new(0),
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params);
        Self::new(name, config)
    }

    /// Output file for `stream_name`
    pub fn stream_path(&self, stream_name: &str) -> PathBuf {
        let file_name: String = stream_name
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.config.base_path.join(format!("{file_name}.jsonl"))
    }

    fn encode_batch(stream_name: &str, records: &[Record]) -> std::io::Result<Vec<u8>> {
        let mut out = Vec::new();
        for record in records {
            let line = FileLine {
                stream: stream_name,
                partition_key: &record.partition_key,
                data: String::from_utf8_lossy(&record.data),
            };
            serde_json::to_writer(&mut out, &line)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            out.push(b'\n');
        }
        Ok(out)
    }

    async fn append(&self, stream_name: &str, records: &[Record]) -> std::io::Result<PathBuf> {
        let path = self.stream_path(stream_name);
        let contents = Self::encode_batch(stream_name, records)?;

        let _guard = self.append_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&contents).await?;
        file.flush().await?;
        Ok(path)
    }
}

impl StreamSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_put_batch",
        skip(self, records),
        fields(sink = %self.name, records = records.len())
    )]
    async fn put_batch(
        &self,
        stream_name: &str,
        records: &[Record],
    ) -> Result<PutBatchOutput, ContractError> {
        let path = self.append(stream_name, records).await.map_err(|e| {
            error!(sink = %self.name, stream = stream_name, error = %e, "Append failed");
            ContractError::sink_transport(&self.name, e.to_string())
        })?;
        debug!(sink = %self.name, path = %path.display(), records = records.len(), "Batch appended");

        let first = self
            .sequence
            .fetch_add(records.len() as u64, Ordering::Relaxed);
        let outcomes = (first..first + records.len() as u64)
            .map(|seq| RecordOutcome::delivered(seq.to_string(), "file"))
            .collect();
        Ok(PutBatchOutput::from_outcomes(outcomes))
    }
}
