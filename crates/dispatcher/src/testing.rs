//! Scripted sink shared by unit tests

use std::collections::VecDeque;
use std::sync::Mutex;

use contracts::{ContractError, PutBatchOutput, Record, RecordOutcome, StreamSink};
use tokio::sync::mpsc;

/// Sink that reports every call through a channel and replays queued responses.
///
/// Once the script runs out every record is reported as delivered.
pub struct ScriptedSink {
    calls: mpsc::UnboundedSender<(String, Vec<Record>)>,
    script: Mutex<VecDeque<Result<PutBatchOutput, ContractError>>>,
}

impl ScriptedSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(String, Vec<Record>)>) {
        let (calls, rx) = mpsc::unbounded_channel();
        let sink = Self {
            calls,
            script: Mutex::new(VecDeque::new()),
        };
        (sink, rx)
    }

    pub fn respond(&self, response: Result<PutBatchOutput, ContractError>) {
        self.script.lock().unwrap().push_back(response);
    }
}

impl StreamSink for ScriptedSink {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn put_batch(
        &self,
        stream_name: &str,
        records: &[Record],
    ) -> Result<PutBatchOutput, ContractError> {
        let _ = self.calls.send((stream_name.to_string(), records.to_vec()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(all_delivered(records.len())))
    }
}

pub fn all_delivered(len: usize) -> PutBatchOutput {
    failing_at(len, &[])
}

/// Output for a batch of `len` records where `failed` indices were rejected
pub fn failing_at(len: usize, failed: &[usize]) -> PutBatchOutput {
    let outcomes = (0..len)
        .map(|idx| {
            if failed.contains(&idx) {
                RecordOutcome::failed("ProvisionedThroughputExceededException", "slow down")
            } else {
                RecordOutcome::delivered(format!("seq-{idx}"), "shard-0")
            }
        })
        .collect();
    PutBatchOutput::from_outcomes(outcomes).with_request_id("req-test")
}

pub fn payloads(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .map(|r| String::from_utf8_lossy(&r.data).into_owned())
        .collect()
}
