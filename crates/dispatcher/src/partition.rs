//! Partition key derivation

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use contracts::StreamDefinition;
use observability::record_partition_key_fallback;

use crate::error::DispatcherError;

/// Key used when the configured field is absent from the payload.
pub const MISSING_KEY_FALLBACK: &str = "undefined";

/// How a stream assigns partition keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartitionKeySource {
    /// Read a top-level field of the JSON payload
    Field(String),
    /// Same key for every record
    Static(String),
    /// Fresh v4 UUID per record
    Random,
}

impl PartitionKeySource {
    /// Resolve the key source for a definition.
    ///
    /// Priority: key field, then static key, then random.
    pub fn from_definition(definition: &StreamDefinition) -> Self {
        if let Some(field) = &definition.partition_key_property {
            Self::Field(field.clone())
        } else if let Some(key) = &definition.partition_key {
            Self::Static(key.clone())
        } else {
            Self::Random
        }
    }

    /// Derive the key for one line
    ///
    /// # Errors
    /// [`DispatcherError::MalformedPayload`] when a key field is configured and
    /// the line is not valid JSON.
    pub fn derive(&self, stream: &str, line: &str) -> Result<String, DispatcherError> {
        match self {
            Self::Field(field) => key_from_field(stream, field, line),
            Self::Static(key) => Ok(key.clone()),
            Self::Random => Ok(Uuid::new_v4().to_string()),
        }
    }
}

fn key_from_field(stream: &str, field: &str, line: &str) -> Result<String, DispatcherError> {
    let payload: Value = serde_json::from_str(line)
        .map_err(|e| DispatcherError::malformed_payload(stream, e.to_string()))?;

    match payload.get(field) {
        Some(Value::String(key)) => Ok(key.clone()),
        Some(other) => {
            warn!(
                stream,
                partition_key_property = field,
                partition_key = %other,
                "Partition key value was not a string, using its JSON form"
            );
            record_partition_key_fallback(stream, "not_string");
            Ok(other.to_string())
        }
        None => {
            warn!(
                stream,
                partition_key_property = field,
                "Partition key property missing from payload"
            );
            record_partition_key_fallback(stream, "missing");
            Ok(MISSING_KEY_FALLBACK.to_string())
        }
    }
}
