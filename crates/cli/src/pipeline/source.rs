//! Line source reading `(file_id, line)` pairs from an async reader

use std::borrow::Cow;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use dispatcher::SourceLine;

/// Counters for one input stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceStats {
    /// Non-empty lines read
    pub read: u64,
    /// Lines without a file identifier
    pub skipped: u64,
}

/// Split one input line.
///
/// With `fixed_file_id` the whole line is the payload; otherwise the line
/// must be `<file_id>\t<payload>` with a non-empty identifier.
pub fn parse_source_line(raw: &str, fixed_file_id: Option<&str>) -> Option<SourceLine> {
    if let Some(file_id) = fixed_file_id {
        return Some(SourceLine::new(file_id, raw));
    }
    match raw.split_once('\t') {
        Some((file_id, payload)) if !file_id.is_empty() => Some(SourceLine::new(file_id, payload)),
        _ => None,
    }
}

/// Decode one raw line, replacing invalid UTF-8 and trimming the line ending
fn decode_line(buf: &[u8]) -> Cow<'_, str> {
    let trimmed = buf.strip_suffix(b"\n").unwrap_or(buf);
    let trimmed = trimmed.strip_suffix(b"\r").unwrap_or(trimmed);
    String::from_utf8_lossy(trimmed)
}

/// Forward every line of `input` to `tx` until EOF or the receiver closes.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD rather than
/// ending the read.
pub async fn read_lines<R>(
    mut input: R,
    tx: mpsc::Sender<SourceLine>,
    fixed_file_id: Option<String>,
) -> std::io::Result<SourceStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut stats = SourceStats::default();

    loop {
        buf.clear();
        if input.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let raw = decode_line(&buf);
        if raw.is_empty() {
            continue;
        }
        stats.read += 1;

        let Some(line) = parse_source_line(&raw, fixed_file_id.as_deref()) else {
            stats.skipped += 1;
            warn!(line_number = stats.read, "Expected <file_id>\\t<payload>, line skipped");
            continue;
        };
        if tx.send(line).await.is_err() {
            debug!("Dispatcher closed, reader exiting");
            break;
        }
    }

    debug!(read = stats.read, skipped = stats.skipped, "Line source finished");
    Ok(stats)
}
