//! Dispatcher - routes source lines to batching streams

use std::collections::BTreeMap;
use std::future::{self, Future};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use contracts::{StreamDefinition, StreamId, StreamSink};
use observability::{record_line_routed, record_record_dropped, record_route_cache_size};

use crate::batching::BatchingStream;
use crate::error::DispatcherError;
use crate::metrics::MetricsSnapshot;
use crate::router::Router;

/// One line read from a source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub file_id: String,
    pub line: String,
}

impl SourceLine {
    pub fn new(file_id: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            line: line.into(),
        }
    }
}

/// Fans lines out to every stream whose patterns match their source file
pub struct Dispatcher<S> {
    router: Router,
    streams: BTreeMap<StreamId, BatchingStream<S>>,
    lines: u64,
    stopped: bool,
}

impl<S> Dispatcher<S>
where
    S: StreamSink + Send + Sync + 'static,
{
    /// Build one batching stream per definition, all sharing `sink`.
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(
        name = "dispatcher_new",
        skip(definitions, sink),
        fields(sink = sink.name(), streams = definitions.len())
    )]
    pub fn new(definitions: &[StreamDefinition], sink: Arc<S>) -> Result<Self, DispatcherError> {
        let mut router = Router::new();
        let mut streams: BTreeMap<StreamId, BatchingStream<S>> = BTreeMap::new();

        for definition in definitions {
            let id = StreamId::new(&definition.stream_name);
            if streams.contains_key(&id) {
                return Err(DispatcherError::DuplicateStream {
                    stream: definition.stream_name.clone(),
                });
            }
            router.add_patterns(id.clone(), &definition.files)?;
            streams.insert(id, BatchingStream::new(definition, Arc::clone(&sink))?);
        }

        info!(streams = streams.len(), "Dispatcher ready");
        Ok(Self {
            router,
            streams,
            lines: 0,
            stopped: false,
        })
    }
}

impl<S> Dispatcher<S> {
    /// Write `line` to every stream `file_id` routes to.
    ///
    /// Returns how many streams buffered the line. A malformed payload for
    /// one stream is logged and does not affect the others.
    pub fn handle_line(&mut self, line: &str, file_id: &str) -> usize
    where
        S: StreamSink + Send + Sync + 'static,
    {
        self.lines += 1;
        let targets = self.router.route(file_id);
        let matched = targets.len();
        record_line_routed(matched);

        if matched == 0 {
            debug!(file_id, "No stream matches file, line dropped");
        }

        let mut accepted = 0;
        for id in targets {
            let Some(stream) = self.streams.get(id) else {
                continue;
            };
            match stream.write(line) {
                Ok(()) => accepted += 1,
                Err(DispatcherError::MalformedPayload { stream: name, message }) => {
                    warn!(stream = %name, file_id, error = %message, "Malformed payload, line dropped");
                    record_record_dropped(&name, "malformed");
                }
                Err(e) => {
                    error!(stream = %id, file_id, error = %e, "Write failed");
                }
            }
        }

        record_route_cache_size(self.router.cached_routes());
        accepted
    }

    /// Consume lines until the channel closes, then stop every stream
    pub async fn run(&mut self, rx: mpsc::Receiver<SourceLine>)
    where
        S: StreamSink + Send + Sync + 'static,
    {
        self.run_until(rx, future::pending()).await;
    }

    /// Consume lines until the channel closes or `shutdown` completes, then
    /// stop every stream.
    #[instrument(name = "dispatcher_run", skip_all)]
    pub async fn run_until<F>(&mut self, mut rx: mpsc::Receiver<SourceLine>, shutdown: F)
    where
        S: StreamSink + Send + Sync + 'static,
        F: Future<Output = ()>,
    {
        info!(streams = self.streams.len(), "Dispatcher started");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                next = rx.recv() => match next {
                    Some(SourceLine { file_id, line }) => {
                        self.handle_line(&line, &file_id);
                        if self.lines.is_multiple_of(1000) {
                            debug!(lines = self.lines, "Dispatcher progress");
                        }
                    }
                    None => {
                        info!(lines = self.lines, "Line source closed");
                        break;
                    }
                },
            }
        }

        self.stop(|| ());
    }

    /// Cancel every stream's flush timer, then invoke `callback`.
    ///
    /// Buffered records are discarded. Calling again only invokes the
    /// callback.
    pub fn stop<F: FnOnce()>(&mut self, callback: F) {
        if !self.stopped {
            self.stopped = true;
            for stream in self.streams.values() {
                stream.stop();
            }
            let discarded: usize = self.streams.values().map(BatchingStream::buffered_len).sum();
            info!(
                streams = self.streams.len(),
                lines = self.lines,
                discarded,
                "Dispatcher stopped"
            );
        }
        callback();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Lines handled so far, routed or not
    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn stream(&self, name: &str) -> Option<&BatchingStream<S>> {
        self.streams.get(name)
    }

    /// Per-stream counters, ordered by stream name
    pub fn metrics(&self) -> Vec<(StreamId, MetricsSnapshot)> {
        self.streams
            .iter()
            .map(|(id, stream)| (id.clone(), stream.metrics().snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{payloads, ScriptedSink};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stream(name: &str, pattern: &str) -> StreamDefinition {
        let mut def = StreamDefinition::new(name, [pattern]);
        def.flush_interval_ms = 0;
        def
    }

    #[tokio::test]
    async fn test_line_fans_out_to_matching_streams() {
        let (sink, _calls) = ScriptedSink::new();
        let defs = [stream("A", "*.log"), stream("B", "app-*.log")];
        let mut dispatcher = Dispatcher::new(&defs, Arc::new(sink)).unwrap();

        assert_eq!(dispatcher.handle_line("hello", "app-1.log"), 2);
        assert_eq!(dispatcher.stream("A").unwrap().buffered_len(), 1);
        assert_eq!(dispatcher.stream("B").unwrap().buffered_len(), 1);

        assert_eq!(dispatcher.handle_line("web", "web-1.log"), 1);
        assert_eq!(dispatcher.stream("A").unwrap().buffered_len(), 2);
        assert_eq!(dispatcher.stream("B").unwrap().buffered_len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_line_dropped() {
        let (sink, _calls) = ScriptedSink::new();
        let mut dispatcher = Dispatcher::new(&[stream("A", "*.log")], Arc::new(sink)).unwrap();

        assert_eq!(dispatcher.handle_line("x", "notes.txt"), 0);
        assert_eq!(dispatcher.stream("A").unwrap().buffered_len(), 0);
        assert_eq!(dispatcher.lines(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_isolated_to_stream() {
        let (sink, _calls) = ScriptedSink::new();
        let mut keyed = stream("keyed", "*.log");
        keyed.partition_key_property = Some("id".into());
        let defs = [keyed, stream("plain", "*.log")];
        let mut dispatcher = Dispatcher::new(&defs, Arc::new(sink)).unwrap();

        assert_eq!(dispatcher.handle_line("plain text", "a.log"), 1);
        assert_eq!(dispatcher.stream("keyed").unwrap().buffered_len(), 0);
        assert_eq!(dispatcher.stream("plain").unwrap().buffered_len(), 1);

        let metrics = dispatcher.metrics();
        assert_eq!(metrics[0].0, "keyed");
        assert_eq!(metrics[0].1.malformed, 1);
    }

    #[tokio::test]
    async fn test_duplicate_stream_rejected() {
        let (sink, _calls) = ScriptedSink::new();
        let defs = [stream("A", "*.log"), stream("A", "*.txt")];
        let result = Dispatcher::new(&defs, Arc::new(sink));
        assert!(matches!(result, Err(DispatcherError::DuplicateStream { .. })));
    }

    #[tokio::test]
    async fn test_invalid_pattern_rejected() {
        let (sink, _calls) = ScriptedSink::new();
        let result = Dispatcher::new(&[stream("A", "regex:(")], Arc::new(sink));
        assert!(matches!(result, Err(DispatcherError::Contract(_))));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_always_calls_back() {
        let (sink, _calls) = ScriptedSink::new();
        let mut dispatcher = Dispatcher::new(&[stream("A", "*.log")], Arc::new(sink)).unwrap();
        let calls = AtomicUsize::new(0);

        dispatcher.stop(|| {
            calls.fetch_add(1, Ordering::SeqCst);
        });
        assert!(dispatcher.stream("A").unwrap().is_stopped());
        dispatcher.stop(|| {
            calls.fetch_add(1, Ordering::SeqCst);
        });

        assert!(dispatcher.is_stopped());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_run_consumes_until_channel_closes() {
        let (sink, mut calls) = ScriptedSink::new();
        let mut def = stream("A", "*.log");
        def.max_records = 2;
        let mut dispatcher = Dispatcher::new(&[def], Arc::new(sink)).unwrap();

        let (tx, rx) = mpsc::channel(8);
        for i in 0..3 {
            tx.send(SourceLine::new("a.log", format!("line-{i}"))).await.unwrap();
        }
        drop(tx);

        dispatcher.run(rx).await;

        assert!(dispatcher.is_stopped());
        assert_eq!(dispatcher.lines(), 3);
        let (name, batch) = calls.recv().await.unwrap();
        assert_eq!(name, "A");
        assert_eq!(payloads(&batch), vec!["line-0", "line-1"]);
        // The last line stays buffered and is discarded on stop
        assert_eq!(dispatcher.stream("A").unwrap().buffered_len(), 1);
    }

    #[tokio::test]
    async fn test_run_until_shutdown_signal() {
        let (sink, _calls) = ScriptedSink::new();
        let mut dispatcher = Dispatcher::new(&[stream("A", "*.log")], Arc::new(sink)).unwrap();

        // Sender stays open; only the shutdown future ends the loop
        let (_tx, rx) = mpsc::channel::<SourceLine>(8);
        dispatcher.run_until(rx, async {}).await;

        assert!(dispatcher.is_stopped());
    }
}
