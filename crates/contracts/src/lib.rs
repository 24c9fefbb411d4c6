//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Size Model
//! - A record's size is payload bytes plus partition key bytes
//! - Records above [`MAX_RECORD_BYTES`] never enter a batch

mod blueprint;
mod error;
mod pattern;
mod record;
mod sink;
mod stream_id;

pub use blueprint::*;
pub use error::*;
pub use pattern::{FilePattern, REGEX_PREFIX};
pub use record::*;
pub use sink::*;
pub use stream_id::StreamId;
