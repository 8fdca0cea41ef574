//! Prompt buffer with tail-limited prompt detection.
//!
//! Only the tail of the buffer is searched for the last non-empty line, so
//! prompt checks stay cheap while a large configuration streams in.
//!
//! Bytes are kept exactly as read. Terminal escapes are stripped when the
//! buffer is inspected or taken, never per read, since one escape sequence
//! can arrive split across two reads.

use bytes::BytesMut;
use regex::bytes::Regex;

use super::patterns::last_non_empty_line;

/// Buffer for accumulating shell output and detecting the device prompt.
#[derive(Debug)]
pub struct PromptBuffer {
    /// The accumulated output buffer.
    buffer: BytesMut,

    /// How many bytes from the end to consider when looking for the prompt.
    search_depth: usize,
}

impl PromptBuffer {
    /// Create a new prompt buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            search_depth,
        }
    }

    /// Append raw bytes read from the shell.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Check whether the last non-empty line matches the prompt pattern.
    pub fn prompt_matched(&self, pattern: &Regex) -> bool {
        self.last_line().is_some_and(|line| pattern.is_match(&line))
    }

    /// The last non-empty line within the search depth, escapes removed.
    pub fn last_line(&self) -> Option<Vec<u8>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        let tail = clean(&self.buffer[start..]);
        last_non_empty_line(&tail).map(<[u8]>::to_vec)
    }

    /// Take the cleaned buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        clean(&self.buffer.split())
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Strip ANSI escape sequences and NUL bytes in one pass.
fn clean(raw: &[u8]) -> Vec<u8> {
    let mut cleaned = strip_ansi_escapes::strip(raw);
    cleaned.retain(|&byte| byte != 0);
    cleaned
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
