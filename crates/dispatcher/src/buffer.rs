//! Buffer - ordered records for one stream plus a byte accumulator

use std::mem;

use contracts::Record;

/// Growing batch for a single stream
#[derive(Debug, Default)]
pub struct Buffer {
    records: Vec<Record>,
    size: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether appending a record of `size` bytes must first flush this buffer.
    ///
    /// The byte limit only applies to a non-empty buffer, so a lone record
    /// larger than `max_bytes` still gets a batch of its own.
    pub fn would_overflow(&self, size: usize, max_records: usize, max_bytes: usize) -> bool {
        self.records.len() + 1 > max_records
            || (self.size + size > max_bytes && !self.records.is_empty())
    }

    pub fn push(&mut self, record: Record) {
        self.size += record.size();
        self.records.push(record);
    }

    /// Detach the current contents, leaving an empty buffer behind
    pub fn take(&mut self) -> Buffer {
        mem::take(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Accumulated payload plus key bytes
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
