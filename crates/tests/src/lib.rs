//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置加载 -> Dispatcher -> Sink 的完整链路
//! - 扇出路由、阈值/定时刷新、部分失败重试

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_contract_limits() {
        assert_eq!(contracts::MAX_RECORD_BYTES, 1024 * 1024);
        assert_eq!(contracts::MAX_BATCH_RECORDS, 500);
        assert_eq!(contracts::MAX_BATCH_BYTES, 5 * 1024 * 1024);
        let _ = contracts::ConfigVersion::V1;
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader, ShipperBlueprint};
    use contracts::{ContractError, PutBatchOutput, Record, RecordOutcome, StreamSink};
    use dispatcher::{Dispatcher, FileSink, FileSinkConfig, SourceLine};
    use tokio::sync::mpsc;

    type Call = (String, Vec<Record>);

    /// Sink that records every batch and replays scripted failures
    struct RecordingSink {
        calls: mpsc::UnboundedSender<Call>,
        failures: Mutex<VecDeque<Vec<usize>>>,
    }

    impl RecordingSink {
        fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Call>) {
            let (calls, rx) = mpsc::unbounded_channel();
            let sink = Self {
                calls,
                failures: Mutex::new(VecDeque::new()),
            };
            (Arc::new(sink), rx)
        }

        /// Reject these indices on the next call
        fn fail_next(&self, indices: Vec<usize>) {
            self.failures.lock().unwrap().push_back(indices);
        }
    }

    impl StreamSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn put_batch(
            &self,
            stream_name: &str,
            records: &[Record],
        ) -> Result<PutBatchOutput, ContractError> {
            let _ = self.calls.send((stream_name.to_string(), records.to_vec()));
            let failed = self.failures.lock().unwrap().pop_front().unwrap_or_default();
            let outcomes = (0..records.len())
                .map(|idx| {
                    if failed.contains(&idx) {
                        RecordOutcome::failed("InternalFailure", "try again")
                    } else {
                        RecordOutcome::delivered(idx.to_string(), "shard-0")
                    }
                })
                .collect();
            Ok(PutBatchOutput::from_outcomes(outcomes))
        }
    }

    fn load(toml: &str) -> ShipperBlueprint {
        ConfigLoader::load_from_str_with_env(toml, ConfigFormat::Toml, |_| None).unwrap()
    }

    fn data(records: &[Record]) -> Vec<String> {
        records
            .iter()
            .map(|r| String::from_utf8_lossy(&r.data).into_owned())
            .collect()
    }

    const FAN_OUT: &str = r#"
[[streams]]
stream_name = "A"
files = ["*.log"]
flush_interval_ms = 0

[[streams]]
stream_name = "B"
files = ["app-*.log"]
flush_interval_ms = 0
"#;

    /// 一行日志按文件名扇出到两个流
    #[tokio::test]
    async fn test_e2e_line_fans_out_to_both_streams() {
        let blueprint = load(FAN_OUT);
        let (sink, _calls) = RecordingSink::new();
        let mut dispatcher = Dispatcher::new(&blueprint.streams, sink).unwrap();

        let routed: Vec<&str> = dispatcher
            .router()
            .streams()
            .map(|s| s.as_str())
            .collect();
        assert_eq!(routed, vec!["A", "B"]);

        assert_eq!(dispatcher.handle_line("hello", "app-1.log"), 2);
        assert_eq!(dispatcher.stream("A").unwrap().buffered_len(), 1);
        assert_eq!(dispatcher.stream("B").unwrap().buffered_len(), 1);
    }

    /// 阈值刷新 + 部分失败只重发失败记录
    #[tokio::test]
    async fn test_e2e_partial_failure_retries_failed_subset() {
        let blueprint = load(
            r#"
[[streams]]
stream_name = "events"
files = ["*.log"]
partition_key = "fixed"
max_records = 5
flush_interval_ms = 0
max_retries = 2
"#,
        );
        let (sink, mut calls) = RecordingSink::new();
        sink.fail_next(vec![1, 3]);
        let mut dispatcher = Dispatcher::new(&blueprint.streams, sink).unwrap();

        // Sixth line pushes the first five out as one batch
        for i in 0..6 {
            dispatcher.handle_line(&format!("line-{i}"), "svc.log");
        }

        let (stream, first) = calls.recv().await.unwrap();
        assert_eq!(stream, "events");
        assert_eq!(data(&first), vec!["line-0", "line-1", "line-2", "line-3", "line-4"]);
        let (_, retry) = calls.recv().await.unwrap();
        assert_eq!(data(&retry), vec!["line-1", "line-3"]);
        assert!(retry.iter().all(|r| r.partition_key == "fixed"));

        // Let the delivery task record its counters
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        let metrics = dispatcher.stream("events").unwrap().metrics().snapshot();
        assert_eq!(metrics.batches, 1);
        assert_eq!(metrics.retries, 1);
        assert_eq!(metrics.delivered, 5);
        assert_eq!(metrics.buffered, 1);
    }

    /// 定时刷新：每个流独立成批
    #[tokio::test(start_paused = true)]
    async fn test_e2e_timer_flushes_each_stream() {
        let blueprint = load(
            r#"
[[streams]]
stream_name = "A"
files = ["*.log"]
flush_interval_ms = 500

[[streams]]
stream_name = "B"
files = ["app-*.log"]
flush_interval_ms = 500
"#,
        );
        let (sink, mut calls) = RecordingSink::new();
        let mut dispatcher = Dispatcher::new(&blueprint.streams, sink).unwrap();

        dispatcher.handle_line("one", "app-1.log");
        dispatcher.handle_line("two", "web.log");
        tokio::time::sleep(Duration::from_millis(600)).await;

        let mut batches = vec![calls.recv().await.unwrap(), calls.recv().await.unwrap()];
        batches.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(batches[0].0, "A");
        assert_eq!(data(&batches[0].1), vec!["one", "two"]);
        assert_eq!(batches[1].0, "B");
        assert_eq!(data(&batches[1].1), vec!["one"]);

        // Random keys differ per record
        assert_ne!(batches[0].1[0].partition_key, batches[0].1[1].partition_key);

        // Nothing fires after stop
        dispatcher.handle_line("three", "web.log");
        dispatcher.stop(|| ());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(calls.try_recv().is_err());
    }

    /// 字段分区键：数值转字符串，缺失时回退为 "undefined"
    #[tokio::test]
    async fn test_e2e_partition_key_from_field() {
        let blueprint = load(
            r#"
[[streams]]
stream_name = "keyed"
files = ["regex:\\.json$"]
partition_key_property = "id"
max_records = 2
flush_interval_ms = 0
"#,
        );
        let (sink, mut calls) = RecordingSink::new();
        let mut dispatcher = Dispatcher::new(&blueprint.streams, sink).unwrap();

        assert_eq!(dispatcher.handle_line(r#"{"id": 42}"#, "/var/log/a.json"), 1);
        assert_eq!(dispatcher.handle_line(r#"{"other": 1}"#, "/var/log/a.json"), 1);
        assert_eq!(dispatcher.handle_line("not json", "/var/log/a.json"), 0);
        assert_eq!(dispatcher.handle_line(r#"{"id": "x"}"#, "/var/log/a.json"), 1);

        let (_, batch) = calls.recv().await.unwrap();
        let keys: Vec<&str> = batch.iter().map(|r| r.partition_key.as_str()).collect();
        assert_eq!(keys, vec!["42", "undefined"]);
        assert_eq!(
            dispatcher.stream("keyed").unwrap().metrics().snapshot().malformed,
            1
        );
    }

    /// 通过 channel 驱动，并写入 FileSink
    #[tokio::test]
    async fn test_e2e_channel_to_file_sink() {
        let dir = tempfile::tempdir().unwrap();
        let blueprint = load(
            r#"
[[streams]]
stream_name = "apps"
files = ["app-*.log"]
partition_key = "p"
max_records = 2
flush_interval_ms = 0
"#,
        );
        let sink = FileSink::new(
            "file",
            FileSinkConfig {
                base_path: dir.path().to_path_buf(),
            },
        )
        .unwrap();
        let mut dispatcher = Dispatcher::new(&blueprint.streams, Arc::new(sink)).unwrap();

        let (tx, rx) = mpsc::channel(16);
        for line in ["a", "b", "c"] {
            tx.send(SourceLine::new("app-1.log", line)).await.unwrap();
        }
        drop(tx);
        dispatcher.run(rx).await;

        let path = dir.path().join("apps.jsonl");
        let mut written = String::new();
        for _ in 0..50 {
            written = std::fs::read_to_string(&path).unwrap_or_default();
            if written.lines().count() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let lines: Vec<serde_json::Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["data"], "a");
        assert_eq!(lines[1]["data"], "b");
        assert_eq!(lines[1]["partition_key"], "p");
        assert!(dispatcher.is_stopped());
    }

    /// 传输配置从环境变量补全，但不覆盖显式值
    #[test]
    fn test_e2e_transport_env_fallback() {
        let blueprint = ConfigLoader::load_from_str_with_env(
            r#"
[transport]
region = "eu-west-1"
"#,
            ConfigFormat::Toml,
            |key| match key {
                "AWS_REGION" => Some("us-east-1".to_string()),
                "AWS_ACCESS_KEY_ID" => Some("AKIDEXAMPLE".to_string()),
                _ => None,
            },
        )
        .unwrap();

        assert_eq!(blueprint.transport.region.as_deref(), Some("eu-west-1"));
        assert_eq!(
            blueprint.transport.access_key_id.as_deref(),
            Some("AKIDEXAMPLE")
        );
        assert_eq!(blueprint.transport.secret_access_key, None);
    }
}
