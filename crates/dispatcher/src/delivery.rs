//! Batch delivery with partial-failure retry
//!
//! One call to [`deliver_batch`] owns one flushed buffer. Records the sink
//! rejects are resubmitted by original index under the same batch id until
//! they succeed or the retry budget runs out. A failed call as a whole is
//! not retried here.

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use contracts::{PutBatchOutput, Record, StreamSink};
use observability::{
    record_batch_completed, record_record_failed, record_records_abandoned,
    record_records_delivered, record_retry, record_transport_failure,
};

use crate::metrics::StreamMetrics;

/// Outcome of one flushed batch across all its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub batch_id: Uuid,
    /// Records in the original batch
    pub records: usize,
    pub delivered: usize,
    /// Records permanently dropped
    pub abandoned: usize,
    /// Resubmissions performed
    pub retries: u32,
    /// The last call failed as a whole
    pub transport_failed: bool,
}

impl DeliveryReport {
    fn new(batch_id: Uuid, records: usize) -> Self {
        Self {
            batch_id,
            records,
            delivered: 0,
            abandoned: 0,
            retries: 0,
            transport_failed: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.abandoned == 0 && !self.transport_failed
    }
}

/// Submit `records` to `stream_name`, retrying rejected records up to
/// `max_retries` times.
#[instrument(
    name = "deliver_batch",
    skip(sink, records, metrics),
    fields(sink = sink.name(), stream = stream_name, batch_id = %batch_id)
)]
pub async fn deliver_batch<S: StreamSink>(
    sink: &S,
    stream_name: &str,
    batch_id: Uuid,
    records: Vec<Record>,
    max_retries: u32,
    metrics: &StreamMetrics,
) -> DeliveryReport {
    let mut report = DeliveryReport::new(batch_id, records.len());
    let mut pending = records;

    loop {
        let output = match sink.put_batch(stream_name, &pending).await {
            Ok(output) => output,
            Err(e) => {
                error!(
                    stream = stream_name,
                    %batch_id,
                    records = pending.len(),
                    error = %e,
                    "Batch call failed, abandoning batch"
                );
                metrics.inc_transport_failures();
                record_transport_failure(stream_name);
                abandon(&mut report, stream_name, pending.len(), metrics);
                report.transport_failed = true;
                break;
            }
        };

        if output.failed_record_count == 0 {
            deliver(&mut report, stream_name, pending.len(), metrics);
            break;
        }

        let failed = collect_failures(stream_name, batch_id, &output, pending.len());
        if failed.is_empty() {
            // Count without per-record detail; nothing can be selected for retry
            warn!(
                stream = stream_name,
                %batch_id,
                failed = output.failed_record_count,
                "Sink reported failures without per-record outcomes"
            );
            let lost = output.failed_record_count.min(pending.len());
            deliver(&mut report, stream_name, pending.len() - lost, metrics);
            abandon(&mut report, stream_name, lost, metrics);
            break;
        }

        deliver(&mut report, stream_name, pending.len() - failed.len(), metrics);

        if report.retries >= max_retries {
            error!(
                stream = stream_name,
                %batch_id,
                retries = report.retries,
                remaining = failed.len(),
                "Retries exhausted, dropping failed records"
            );
            abandon(&mut report, stream_name, failed.len(), metrics);
            break;
        }

        pending = failed.iter().map(|&idx| pending[idx].clone()).collect();
        report.retries += 1;
        metrics.inc_retries();
        record_retry(stream_name, pending.len());
        warn!(
            stream = stream_name,
            %batch_id,
            attempt = report.retries,
            records = pending.len(),
            "Resubmitting failed records"
        );
    }

    info!(
        stream = stream_name,
        %batch_id,
        records = report.records,
        delivered = report.delivered,
        retries = report.retries,
        failed = !report.is_complete(),
        "Batch finished"
    );
    record_batch_completed(stream_name, report.retries);

    report
}

/// Log every rejected record and return their indices in submission order
fn collect_failures(
    stream_name: &str,
    batch_id: Uuid,
    output: &PutBatchOutput,
    submitted: usize,
) -> Vec<usize> {
    let request_id = output.request_id.as_deref().unwrap_or("-");
    output
        .failed_indices()
        .filter(|&idx| idx < submitted)
        .inspect(|&idx| {
            let outcome = &output.records[idx];
            let error_code = outcome.error_code.as_deref().unwrap_or("unknown");
            error!(
                stream = stream_name,
                %batch_id,
                request_id,
                index = idx,
                error_code,
                error_message = outcome.error_message.as_deref().unwrap_or(""),
                "Record delivery failed"
            );
            record_record_failed(stream_name, error_code);
        })
        .collect()
}

fn deliver(report: &mut DeliveryReport, stream_name: &str, count: usize, metrics: &StreamMetrics) {
    report.delivered += count;
    metrics.add_delivered(count);
    record_records_delivered(stream_name, count);
}

fn abandon(report: &mut DeliveryReport, stream_name: &str, count: usize, metrics: &StreamMetrics) {
    report.abandoned += count;
    metrics.add_abandoned(count);
    record_records_abandoned(stream_name, count);
}
