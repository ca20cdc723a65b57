//! In-memory logfile window with byte-range retrieval.
//!
//! The application's log stream is appended line by line into a bounded
//! buffer. Positions handed out to callers are global: they count every byte
//! ever appended, so a console can keep tailing with `Range: bytes=<n>-`
//! across evictions. Evicted data is simply gone; asking for it clamps to
//! the oldest retained byte instead of failing.

use std::collections::VecDeque;
use std::io;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::ActuatorError;

/// Default capacity of the logfile window (10 MiB).
pub const DEFAULT_LOGFILE_MAX_SIZE: usize = 10 * 1024 * 1024;

struct RingState {
    buffer: VecDeque<u8>,
    /// Bytes evicted from the front since creation.
    offset: u64,
    /// Bytes ever appended. Always `offset + buffer.len()`.
    appended: u64,
}

/// Bounded, globally-addressed text buffer.
pub struct LogRingBuffer {
    max_size: usize,
    state: Mutex<RingState>,
}

impl LogRingBuffer {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            state: Mutex::new(RingState {
                buffer: VecDeque::with_capacity(max_size.min(64 * 1024)),
                offset: 0,
                appended: 0,
            }),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Append one record followed by a newline, evicting the oldest bytes if
    /// the window overflows.
    pub fn append(&self, text: &str) {
        let mut state = self.state.lock();
        state.buffer.extend(text.as_bytes());
        state.buffer.push_back(b'\n');
        state.appended += text.len() as u64 + 1;

        let len = state.buffer.len();
        if len > self.max_size {
            let excess = len - self.max_size;
            state.buffer.drain(..excess);
            state.offset += excess as u64;
        }

        debug_assert_eq!(state.offset + state.buffer.len() as u64, state.appended);
        debug_assert!(state.buffer.len() <= self.max_size);
    }

    /// Global position of the oldest retained byte.
    pub fn offset(&self) -> u64 {
        self.state.lock().offset
    }

    /// Number of bytes currently retained.
    pub fn len(&self) -> usize {
        self.state.lock().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text between two global positions (end exclusive).
    pub fn range(&self, start: Option<u64>, end: Option<u64>) -> String {
        self.slice(start, end).text
    }

    /// Text between two global positions plus the global bounds actually
    /// returned, read under a single lock.
    pub fn slice(&self, start: Option<u64>, end: Option<u64>) -> LogfileSlice {
        let state = self.state.lock();
        let len = state.buffer.len();
        let local_start = start.map_or(0, |g| to_local(g, state.offset, len));
        let local_end = end
            .map_or(len, |g| to_local(g, state.offset, len))
            .max(local_start);
        extract(&state, local_start, local_end)
    }

    /// The last `count` bytes of the window.
    pub fn suffix(&self, count: u64) -> LogfileSlice {
        let state = self.state.lock();
        let len = state.buffer.len();
        let take = usize::try_from(count).unwrap_or(usize::MAX).min(len);
        extract(&state, len - take, len)
    }

    /// Serve a `Range: bytes=<start>-<end>` request.
    pub fn range_request(&self, header: &str) -> Result<LogfileSlice, ActuatorError> {
        let range: ByteRange = header.parse()?;
        tracing::debug!(range = header, "logfile range request");

        let slice = match (range.start, range.end) {
            (None, Some(count)) => self.suffix(count),
            (start, end) => self.slice(start, end),
        };

        tracing::debug!(
            start = slice.start,
            end = slice.end,
            "logfile range response"
        );
        Ok(slice)
    }
}

fn to_local(global: u64, offset: u64, len: usize) -> usize {
    let local = global.saturating_sub(offset);
    usize::try_from(local).unwrap_or(usize::MAX).min(len)
}

fn extract(state: &RingState, local_start: usize, local_end: usize) -> LogfileSlice {
    let bytes: Vec<u8> = state
        .buffer
        .range(local_start..local_end)
        .copied()
        .collect();
    LogfileSlice {
        text: String::from_utf8_lossy(&bytes).into_owned(),
        start: state.offset + local_start as u64,
        end: state.offset + local_end as u64,
    }
}

/// A window of the logfile and its global byte bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogfileSlice {
    pub text: String,
    pub start: u64,
    pub end: u64,
}

impl LogfileSlice {
    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.end)
    }
}

/// Result of a logfile read: the whole window, or a requested range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogfileResponse {
    pub slice: LogfileSlice,
    pub partial: bool,
}

impl LogfileResponse {
    /// 206 for range requests, 200 otherwise.
    pub fn http_status(&self) -> u16 {
        if self.partial {
            206
        } else {
            200
        }
    }

    pub fn content_range(&self) -> Option<String> {
        self.partial.then(|| self.slice.content_range())
    }

    /// Value for the `Accept-Ranges` header on partial responses.
    pub fn accept_ranges(&self) -> Option<&'static str> {
        self.partial.then_some("bytes")
    }
}

/// Parsed `bytes=<start>-<end>` request. Either side may be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^bytes=(\d*)-(\d*)$").expect("range pattern is valid"))
}

impl FromStr for ByteRange {
    type Err = ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = range_pattern()
            .captures(s.trim())
            .ok_or_else(|| ActuatorError::InvalidRange(s.to_string()))?;

        let bound = |idx: usize| -> Result<Option<u64>, ActuatorError> {
            match caps.get(idx).map(|m| m.as_str()) {
                None | Some("") => Ok(None),
                Some(digits) => digits
                    .parse::<u64>()
                    .map(Some)
                    .map_err(|_| ActuatorError::InvalidRange(s.to_string())),
            }
        };

        Ok(Self {
            start: bound(1)?,
            end: bound(2)?,
        })
    }
}

/// `MakeWriter` that feeds formatted log lines into a [`LogRingBuffer`].
#[derive(Clone)]
pub struct LogfileMakeWriter {
    buffer: Arc<LogRingBuffer>,
}

impl LogfileMakeWriter {
    pub fn new(buffer: Arc<LogRingBuffer>) -> Self {
        Self { buffer }
    }
}

impl<'a> MakeWriter<'a> for LogfileMakeWriter {
    type Writer = LogfileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogfileWriter {
            buffer: self.buffer.clone(),
            pending: Vec::new(),
        }
    }
}

/// Per-event writer. Complete lines are appended when the writer is flushed
/// or dropped; a trailing partial line is kept as its own record.
pub struct LogfileWriter {
    buffer: Arc<LogRingBuffer>,
    pending: Vec<u8>,
}

impl LogfileWriter {
    fn drain_lines(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        for line in text.strip_suffix('\n').unwrap_or(&text).split('\n') {
            self.buffer.append(line);
        }
        self.pending.clear();
    }
}

impl io::Write for LogfileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_lines();
        Ok(())
    }
}

impl Drop for LogfileWriter {
    fn drop(&mut self) {
        self.drain_lines();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_both_bounds() {
        let r: ByteRange = "bytes=10-20".parse().unwrap();
        assert_eq!(r, ByteRange { start: Some(10), end: Some(20) });
    }

    #[test]
    fn test_parse_open_bounds() {
        let r: ByteRange = "bytes=-".parse().unwrap();
        assert_eq!(r, ByteRange { start: None, end: None });
        let r: ByteRange = "bytes=5-".parse().unwrap();
        assert_eq!(r, ByteRange { start: Some(5), end: None });
        let r: ByteRange = "bytes=-7".parse().unwrap();
        assert_eq!(r, ByteRange { start: None, end: Some(7) });
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "bytes", "bytes=a-b", "items=0-1", "bytes=1-2-3", "bytes=99999999999999999999999-"] {
            let err = bad.parse::<ByteRange>().unwrap_err();
            assert!(matches!(err, ActuatorError::InvalidRange(_)), "{bad}");
        }
    }

    #[test]
    fn test_writer_splits_lines() {
        let buffer = Arc::new(LogRingBuffer::new(1024));
        let make = LogfileMakeWriter::new(buffer.clone());
        {
            let mut w = make.make_writer();
            w.write_all(b"first\nsecond\n").unwrap();
        }
        assert_eq!(buffer.range(None, None), "first\nsecond\n");
    }

    #[test]
    fn test_writer_keeps_partial_line() {
        let buffer = Arc::new(LogRingBuffer::new(1024));
        let make = LogfileMakeWriter::new(buffer.clone());
        let mut w = make.make_writer();
        w.write_all(b"no newline").unwrap();
        w.flush().unwrap();
        assert_eq!(buffer.range(None, None), "no newline\n");
    }
}
