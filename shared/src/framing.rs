//! Newline framing with a length cap.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::FormatError;

/// Longest command line a session accepts.
pub const MAX_LINE_LEN: usize = 1 << 20;

/// Longest line a client accepts from the server. Snapshots carry the whole
/// sketch on one line, so this is well above [`MAX_LINE_LEN`].
pub const MAX_SNAPSHOT_LEN: usize = 64 << 20;

/// Splits a byte stream into lines, never buffering more than `max` bytes.
///
/// An oversized line is skipped up to its newline and reported as
/// [`FormatError::TooLong`]; reading continues with the next line. Invalid
/// UTF-8 is replaced rather than rejected.
pub struct LineReader<R> {
    inner: R,
    buf: Vec<u8>,
    max: usize,
    // Length so far of a line being skipped.
    skipped: Option<usize>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_max_length(inner, MAX_LINE_LEN)
    }

    pub fn with_max_length(inner: R, max: usize) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            max,
            skipped: None,
        }
    }

    /// Next line without its `\n`, or `None` at end of stream. A final line
    /// with no newline is still returned.
    pub async fn next_line(&mut self) -> io::Result<Option<Result<String, FormatError>>> {
        loop {
            let (consumed, complete) = {
                let available = self.inner.fill_buf().await?;
                if available.is_empty() {
                    if self.skipped.is_none() && self.buf.is_empty() {
                        return Ok(None);
                    }
                    return Ok(Some(self.take_line()));
                }
                let newline = available.iter().position(|&byte| byte == b'\n');
                let chunk = match newline {
                    Some(end) => &available[..end],
                    None => available,
                };
                if let Some(length) = self.skipped.as_mut() {
                    *length += chunk.len();
                } else if self.buf.len() + chunk.len() > self.max {
                    self.skipped = Some(self.buf.len() + chunk.len());
                    self.buf = Vec::new();
                } else {
                    self.buf.extend_from_slice(chunk);
                }
                match newline {
                    Some(end) => (end + 1, true),
                    None => (available.len(), false),
                }
            };
            self.inner.consume(consumed);
            if complete {
                return Ok(Some(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> Result<String, FormatError> {
        if let Some(length) = self.skipped.take() {
            return Err(FormatError::TooLong {
                length,
                max: self.max,
            });
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        Ok(line)
    }
}
