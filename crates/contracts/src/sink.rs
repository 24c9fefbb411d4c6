//! StreamSink trait - Dispatcher output interface
//!
//! Defines the abstract interface of the streaming backend.

use crate::{ContractError, PutBatchOutput, Record};

/// Batch delivery trait
///
/// All sink implementations must implement this trait. Takes `&self` because
/// several batches of the same stream may be in flight at once.
#[trait_variant::make(StreamSink: Send)]
pub trait LocalStreamSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Submit one batch to `stream_name`
    ///
    /// # Errors
    /// Returns an error only when the call as a whole failed. Per-record
    /// rejections are reported through [`PutBatchOutput`].
    async fn put_batch(
        &self,
        stream_name: &str,
        records: &[Record],
    ) -> Result<PutBatchOutput, ContractError>;
}
