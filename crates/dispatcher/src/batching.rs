//! BatchingStream - per-stream buffer with threshold and timer flushes
//!
//! `write` never waits on the sink. A flush detaches the current buffer
//! under the buffer lock and hands it to a spawned delivery task, so several
//! batches of one stream can be in flight at once. The buffer swap is the
//! only point where the timer and threshold paths meet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use bytes::Bytes;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use contracts::{
    Record, StreamDefinition, StreamId, StreamSink, MAX_BATCH_BYTES, MAX_BATCH_RECORDS,
    MAX_RECORD_BYTES,
};
use observability::{record_batch_flushed, record_record_buffered, record_record_dropped};

use crate::buffer::Buffer;
use crate::delivery::deliver_batch;
use crate::error::DispatcherError;
use crate::metrics::StreamMetrics;
use crate::partition::PartitionKeySource;

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Appending the next record would exceed a limit
    Threshold,
    /// The recurring flush interval elapsed
    Timer,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Timer => "timer",
        }
    }
}

/// Buffering front of one destination stream
pub struct BatchingStream<S> {
    shared: Arc<StreamShared<S>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

struct StreamShared<S> {
    name: StreamId,
    key_source: PartitionKeySource,
    max_records: usize,
    max_bytes: usize,
    max_retries: u32,
    buffer: Mutex<Buffer>,
    stopped: AtomicBool,
    sink: Arc<S>,
    metrics: Arc<StreamMetrics>,
    runtime: Handle,
}

impl<S> BatchingStream<S>
where
    S: StreamSink + Send + Sync + 'static,
{
    /// Create the stream and start its flush timer.
    ///
    /// Must be called from within a tokio runtime; delivery and timer tasks
    /// are spawned onto it.
    #[instrument(
        name = "batching_stream_new",
        skip(definition, sink),
        fields(stream = %definition.stream_name)
    )]
    pub fn new(definition: &StreamDefinition, sink: Arc<S>) -> Result<Self, DispatcherError> {
        let runtime = Handle::try_current()?;
        let shared = Arc::new(StreamShared {
            name: StreamId::new(&definition.stream_name),
            key_source: PartitionKeySource::from_definition(definition),
            max_records: definition.max_records.clamp(1, MAX_BATCH_RECORDS),
            max_bytes: definition.max_bytes.clamp(1, MAX_BATCH_BYTES),
            max_retries: definition.max_retries,
            buffer: Mutex::new(Buffer::new()),
            stopped: AtomicBool::new(false),
            sink,
            metrics: Arc::new(StreamMetrics::new()),
            runtime,
        });

        let timer = definition
            .flush_interval()
            .map(|period| spawn_timer(&shared, period));

        info!(
            stream = %shared.name,
            key_source = ?shared.key_source,
            max_records = shared.max_records,
            max_bytes = shared.max_bytes,
            max_retries = shared.max_retries,
            flush_interval_ms = definition.flush_interval_ms,
            "Batching stream started"
        );

        Ok(Self {
            shared,
            timer: Mutex::new(timer),
        })
    }

    /// Buffer one line, flushing the current buffer first if the record
    /// would not fit.
    ///
    /// Records larger than the wire limit are logged and dropped with `Ok`.
    ///
    /// # Errors
    /// [`DispatcherError::MalformedPayload`] if a partition key field is
    /// configured and the line is not JSON. Nothing is buffered in that case.
    pub fn write(&self, line: &str) -> Result<(), DispatcherError> {
        let shared = &self.shared;
        let name = shared.name.as_str();

        let partition_key = shared
            .key_source
            .derive(name, line)
            .inspect_err(|_| shared.metrics.inc_malformed())?;
        let record = Record::new(Bytes::copy_from_slice(line.as_bytes()), partition_key);
        let size = record.size();

        if !record.within_wire_limit() {
            warn!(
                stream = name,
                record_bytes = size,
                limit = MAX_RECORD_BYTES,
                "Record exceeds size limit, dropped"
            );
            shared.metrics.inc_oversized();
            record_record_dropped(name, "oversized");
            return Ok(());
        }

        let flushed = {
            let mut buffer = shared.lock_buffer();
            let flushed = buffer
                .would_overflow(size, shared.max_records, shared.max_bytes)
                .then(|| buffer.take());
            buffer.push(record);
            shared.metrics.set_buffered(buffer.len());
            flushed
        };

        shared.metrics.inc_accepted();
        record_record_buffered(name, size);

        if let Some(batch) = flushed.filter(|b| !b.is_empty()) {
            shared.dispatch(batch, FlushTrigger::Threshold);
        }
        Ok(())
    }
}

impl<S> BatchingStream<S> {
    pub fn name(&self) -> &StreamId {
        &self.shared.name
    }

    pub fn key_source(&self) -> &PartitionKeySource {
        &self.shared.key_source
    }

    /// Records waiting for the next flush
    pub fn buffered_len(&self) -> usize {
        self.shared.lock_buffer().len()
    }

    /// Bytes waiting for the next flush
    pub fn buffered_bytes(&self) -> usize {
        self.shared.lock_buffer().size()
    }

    pub fn metrics(&self) -> &Arc<StreamMetrics> {
        &self.shared.metrics
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::Acquire)
    }

    /// Cancel the flush timer.
    ///
    /// Buffered records are not flushed and in-flight deliveries keep
    /// running. Returns `false` if the stream was already stopped.
    pub fn stop(&self) -> bool {
        {
            // Taken under the buffer lock so no timer flush can begin afterwards
            let _buffer = self.shared.lock_buffer();
            if self.shared.stopped.swap(true, Ordering::AcqRel) {
                return false;
            }
        }

        if let Some(timer) = self.take_timer() {
            timer.abort();
        }
        debug!(
            stream = %self.shared.name,
            discarded = self.buffered_len(),
            "Batching stream stopped"
        );
        true
    }

    fn take_timer(&self) -> Option<JoinHandle<()>> {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl<S> Drop for BatchingStream<S> {
    fn drop(&mut self) {
        if let Some(timer) = self.take_timer() {
            timer.abort();
        }
    }
}

impl<S> StreamShared<S> {
    fn lock_buffer(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S> StreamShared<S>
where
    S: StreamSink + Send + Sync + 'static,
{
    /// Timer path: flush whatever is buffered, if anything
    fn scheduled_flush(self: &Arc<Self>) {
        let batch = {
            let mut buffer = self.lock_buffer();
            if self.stopped.load(Ordering::Acquire) || buffer.is_empty() {
                return;
            }
            let batch = buffer.take();
            self.metrics.set_buffered(0);
            batch
        };
        self.dispatch(batch, FlushTrigger::Timer);
    }

    /// Hand a detached buffer to a delivery task
    fn dispatch(self: &Arc<Self>, batch: Buffer, trigger: FlushTrigger) {
        let batch_id = Uuid::new_v4();
        info!(
            stream = %self.name,
            %batch_id,
            records = batch.len(),
            bytes = batch.size(),
            trigger = trigger.as_str(),
            "Flushing batch"
        );
        self.metrics.inc_batches();
        record_batch_flushed(self.name.as_str(), trigger.as_str(), batch.len(), batch.size());

        let shared = Arc::clone(self);
        self.runtime.spawn(async move {
            deliver_batch(
                shared.sink.as_ref(),
                shared.name.as_str(),
                batch_id,
                batch.into_records(),
                shared.max_retries,
                &shared.metrics,
            )
            .await;
        });
    }
}

fn spawn_timer<S>(shared: &Arc<StreamShared<S>>, period: Duration) -> JoinHandle<()>
where
    S: StreamSink + Send + Sync + 'static,
{
    let weak: Weak<StreamShared<S>> = Arc::downgrade(shared);
    shared.runtime.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(shared) = weak.upgrade() else {
                break;
            };
            shared.scheduled_flush();
        }
    })
}
