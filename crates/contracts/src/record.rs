//! Record and batch result types exchanged with a `StreamSink`.

use bytes::Bytes;

/// Ceiling on payload bytes plus partition key bytes for a single record.
pub const MAX_RECORD_BYTES: usize = 1_048_576;

/// Maximum number of records accepted by one batch call.
pub const MAX_BATCH_RECORDS: usize = 500;

/// Maximum combined record size accepted by one batch call.
pub const MAX_BATCH_BYTES: usize = 5_242_880;

/// One line ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Opaque payload, the raw line bytes
    pub data: Bytes,

    /// Shard selector within the destination stream
    pub partition_key: String,
}

impl Record {
    /// Create a record from payload and partition key
    pub fn new(data: impl Into<Bytes>, partition_key: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            partition_key: partition_key.into(),
        }
    }

    /// Size counted against batch limits: payload bytes + key bytes (UTF-8)
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len() + self.partition_key.len()
    }

    /// Whether the record fits under [`MAX_RECORD_BYTES`]
    #[inline]
    pub fn within_wire_limit(&self) -> bool {
        self.size() <= MAX_RECORD_BYTES
    }
}

/// Per-record result of a batch call.
///
/// A record failed when `error_code` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordOutcome {
    pub sequence_number: Option<String>,
    pub shard_id: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl RecordOutcome {
    /// Successful delivery
    pub fn delivered(sequence_number: impl Into<String>, shard_id: impl Into<String>) -> Self {
        Self {
            sequence_number: Some(sequence_number.into()),
            shard_id: Some(shard_id.into()),
            ..Default::default()
        }
    }

    /// Rejected record
    pub fn failed(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            ..Default::default()
        }
    }

    #[inline]
    pub fn is_failure(&self) -> bool {
        self.error_code.is_some()
    }
}

/// Result of a batch call that reached the backend.
///
/// `records[i]` describes the `i`-th submitted record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutBatchOutput {
    /// Number of records rejected in this call
    pub failed_record_count: usize,

    /// One outcome per submitted record, in submission order
    pub records: Vec<RecordOutcome>,

    /// Backend request identifier, if any
    pub request_id: Option<String>,
}

impl PutBatchOutput {
    /// Build an output from per-record outcomes, counting failures
    pub fn from_outcomes(records: Vec<RecordOutcome>) -> Self {
        let failed_record_count = records.iter().filter(|r| r.is_failure()).count();
        Self {
            failed_record_count,
            records,
            request_id: None,
        }
    }

    /// Attach a request identifier
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Indices of submitted records that were rejected
    pub fn failed_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(idx, _)| idx)
    }
}
