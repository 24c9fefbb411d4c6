//! ShipperBlueprint - Config Loader output
//!
//! Describes the complete shipper configuration: transport settings and the
//! set of destination streams with their file patterns and batch limits.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

use crate::{MAX_BATCH_BYTES, MAX_BATCH_RECORDS};

/// Default time-based flush period
pub const DEFAULT_FLUSH_INTERVAL_MS: i64 = 60_000;

/// Default retry bound for partially failed batches
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete shipper configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ShipperBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Backend connection settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Destination stream definitions
    #[serde(default)]
    #[validate(nested)]
    pub streams: Vec<StreamDefinition>,
}

/// Backend connection settings
///
/// Region and credentials fall back to the environment when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Which sink implementation delivers batches
    #[serde(default)]
    pub kind: SinkType,

    #[serde(default)]
    pub region: Option<String>,

    /// Endpoint override (e.g. a local emulator)
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub access_key_id: Option<String>,

    #[serde(default)]
    pub secret_access_key: Option<String>,

    #[serde(default = "default_ssl_enabled")]
    pub ssl_enabled: bool,

    /// Sink-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: SinkType::default(),
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            ssl_enabled: default_ssl_enabled(),
            params: HashMap::new(),
        }
    }
}

fn default_ssl_enabled() -> bool {
    true
}

/// Sink type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log batch summaries, report every record delivered
    #[default]
    Log,
    /// Append records to per-stream JSON-lines files
    File,
}

/// One destination stream
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamDefinition {
    /// Destination stream name, also the stream's routing identifier
    #[validate(length(min = 1, message = "stream_name cannot be empty"))]
    pub stream_name: String,

    /// Source file patterns routed to this stream
    #[validate(length(min = 1, message = "at least one file pattern is required"))]
    pub files: Vec<String>,

    /// Static partition key used for every record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,

    /// Payload field whose value becomes the partition key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key_property: Option<String>,

    /// Records per batch
    #[serde(default = "default_max_records")]
    #[validate(range(min = 1, max = 500))]
    pub max_records: usize,

    /// Bytes per batch (payload + key)
    #[serde(default = "default_max_bytes")]
    #[validate(range(min = 1, max = 5_242_880))]
    pub max_bytes: usize,

    /// Time-based flush period in milliseconds, `<= 0` disables it
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: i64,

    /// Resubmissions of failed records per batch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_max_records() -> usize {
    MAX_BATCH_RECORDS
}

fn default_max_bytes() -> usize {
    MAX_BATCH_BYTES
}

fn default_flush_interval_ms() -> i64 {
    DEFAULT_FLUSH_INTERVAL_MS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl StreamDefinition {
    /// Definition with default limits and no partition key settings
    pub fn new<I, P>(stream_name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            stream_name: stream_name.into(),
            files: files.into_iter().map(Into::into).collect(),
            partition_key: None,
            partition_key_property: None,
            max_records: default_max_records(),
            max_bytes: default_max_bytes(),
            flush_interval_ms: default_flush_interval_ms(),
            max_retries: default_max_retries(),
        }
    }

    /// Flush period, `None` when time-based flushing is disabled
    pub fn flush_interval(&self) -> Option<Duration> {
        u64::try_from(self.flush_interval_ms)
            .ok()
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
