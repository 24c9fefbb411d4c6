//! # Dispatcher
//!
//! 日志行路由与批量投递模块。
//!
//! 负责：
//! - 按源文件标识匹配目标流（带缓存）
//! - 每个流独立缓冲，按条数/字节数/定时刷新
//! - 异步投递批次，部分失败按索引重试

pub mod batching;
pub mod buffer;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod partition;
pub mod router;
pub mod sinks;

#[cfg(test)]
mod testing;

pub use batching::{BatchingStream, FlushTrigger};
pub use contracts::{StreamDefinition, StreamSink};
pub use delivery::{deliver_batch, DeliveryReport};
pub use dispatcher::{Dispatcher, SourceLine};
pub use error::DispatcherError;
pub use metrics::{MetricsSnapshot, StreamMetrics};
pub use partition::{PartitionKeySource, MISSING_KEY_FALLBACK};
pub use router::Router;
pub use sinks::{FileSink, FileSinkConfig, LogSink};
