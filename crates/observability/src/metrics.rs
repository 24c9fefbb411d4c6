//! 路由与批量投递指标
//!
//! 由 dispatcher 在路由、缓冲、刷新与重试各环节调用。

use metrics::{counter, gauge, histogram};

/// 记录一行日志的路由结果
pub fn record_line_routed(matched_streams: usize) {
    let routed = if matched_streams > 0 { "true" } else { "false" };
    counter!("log_streamer_lines_total", "routed" => routed).increment(1);
    if matched_streams > 0 {
        counter!("log_streamer_line_fanout_total").increment(matched_streams as u64);
    }
}

/// 路由缓存条目数 (只增不减)
pub fn record_route_cache_size(entries: usize) {
    gauge!("log_streamer_route_cache_entries").set(entries as f64);
}

/// 记录进入缓冲区的记录
pub fn record_record_buffered(stream: &str, bytes: usize) {
    counter!("log_streamer_records_buffered_total", "stream" => stream.to_string()).increment(1);
    histogram!("log_streamer_record_bytes", "stream" => stream.to_string()).record(bytes as f64);
}

/// 记录被丢弃的记录
///
/// `reason`: `oversized` | `malformed_payload`
pub fn record_record_dropped(stream: &str, reason: &'static str) {
    counter!(
        "log_streamer_records_dropped_total",
        "stream" => stream.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 分区键回退 (`missing` | `not_string`)
pub fn record_partition_key_fallback(stream: &str, kind: &'static str) {
    counter!(
        "log_streamer_partition_key_fallback_total",
        "stream" => stream.to_string(),
        "kind" => kind
    )
    .increment(1);
}

/// 记录一次批次刷新
///
/// `trigger`: `threshold` | `timer`
pub fn record_batch_flushed(stream: &str, trigger: &'static str, records: usize, bytes: usize) {
    counter!(
        "log_streamer_batches_flushed_total",
        "stream" => stream.to_string(),
        "trigger" => trigger
    )
    .increment(1);
    histogram!("log_streamer_batch_records", "stream" => stream.to_string())
        .record(records as f64);
    histogram!("log_streamer_batch_bytes", "stream" => stream.to_string()).record(bytes as f64);
}

/// 投递成功的记录数
pub fn record_records_delivered(stream: &str, count: usize) {
    if count > 0 {
        counter!("log_streamer_records_delivered_total", "stream" => stream.to_string())
            .increment(count as u64);
    }
}

/// 单条记录投递失败
pub fn record_record_failed(stream: &str, error_code: &str) {
    counter!(
        "log_streamer_record_failures_total",
        "stream" => stream.to_string(),
        "error_code" => error_code.to_string()
    )
    .increment(1);
}

/// 失败子集重新提交
pub fn record_retry(stream: &str, records: usize) {
    counter!("log_streamer_retries_total", "stream" => stream.to_string()).increment(1);
    counter!("log_streamer_records_resubmitted_total", "stream" => stream.to_string())
        .increment(records as u64);
}

/// 重试耗尽后永久丢弃的记录
pub fn record_records_abandoned(stream: &str, count: usize) {
    counter!("log_streamer_records_abandoned_total", "stream" => stream.to_string())
        .increment(count as u64);
}

/// 整个批次调用失败
pub fn record_transport_failure(stream: &str) {
    counter!("log_streamer_transport_failures_total", "stream" => stream.to_string())
        .increment(1);
}

/// 单批次最终使用的重试次数
pub fn record_batch_completed(stream: &str, retries: u32) {
    histogram!("log_streamer_batch_retries", "stream" => stream.to_string())
        .record(f64::from(retries));
}
