//! Sink selection from transport configuration

use contracts::{ContractError, PutBatchOutput, Record, SinkType, StreamSink, TransportConfig};
use dispatcher::{DispatcherError, FileSink, LogSink};
use tracing::info;

/// The sink named by `transport.kind`
pub enum ConfiguredSink {
    Log(LogSink),
    File(FileSink),
}

impl ConfiguredSink {
    /// Build the sink for `transport`. Credentials are never logged.
    pub fn from_transport(transport: &TransportConfig) -> Result<Self, DispatcherError> {
        info!(
            kind = ?transport.kind,
            region = transport.region.as_deref().unwrap_or("-"),
            endpoint = transport.endpoint.as_deref().unwrap_or("-"),
            ssl_enabled = transport.ssl_enabled,
            credentials = transport.access_key_id.is_some(),
            "Configuring sink"
        );

        match transport.kind {
            SinkType::Log => Ok(Self::Log(LogSink::new("log"))),
            SinkType::File => FileSink::from_params("file", &transport.params)
                .map(Self::File)
                .map_err(|e| DispatcherError::sink_creation("file", e.to_string())),
        }
    }
}

impl StreamSink for ConfiguredSink {
    fn name(&self) -> &str {
        match self {
            Self::Log(sink) => sink.name(),
            Self::File(sink) => sink.name(),
        }
    }

    async fn put_batch(
        &self,
        stream_name: &str,
        records: &[Record],
    ) -> Result<PutBatchOutput, ContractError> {
        match self {
            Self::Log(sink) => sink.put_batch(stream_name, records).await,
            Self::File(sink) => sink.put_batch(stream_name, records).await,
        }
    }
}
