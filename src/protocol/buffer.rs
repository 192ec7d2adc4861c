//! # Command Buffer
//!
//! The accumulator behind both dialect builders: an ordered byte sequence
//! (the wire payload) plus a parallel list of text fragments (a readable
//! transcript of every command, independent of byte encoding).
//!
//! Appends are atomic. A line that fails GB18030 encoding leaves both the
//! bytes and the transcript exactly as they were, so a print job never
//! carries a half-written command.
//!
//! Raw raster bytes go into the wire payload only; the transcript keeps the
//! human-readable header that preceded them.

use crate::protocol::gb18030::{self, EncodingError};

/// Line terminator for dialect command lines.
const LINE_END: &[u8] = b"\r\n";

/// Wire bytes and their parallel transcript.
///
/// Owned exclusively by one builder; `reset` starts a new job. The output
/// accessors borrow, so the buffer cannot change while a caller holds the
/// finished data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBuffer {
    bytes: Vec<u8>,
    transcript: Vec<String>,
}

impl CommandBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard all bytes and transcript fragments.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.transcript.clear();
    }

    /// Append one ASCII command line, terminated with `\r\n`.
    ///
    /// The caller guarantees `line` is ASCII (every dialect keyword and
    /// numeric parameter is); lines carrying label text go through
    /// [`CommandBuffer::push_line_encoded`] instead.
    pub fn push_line(&mut self, line: &str) {
        debug_assert!(line.is_ascii(), "non-ASCII line routed past the encoder");
        self.bytes.extend_from_slice(line.as_bytes());
        self.bytes.extend_from_slice(LINE_END);
        self.transcript.push(line.to_string());
    }

    /// Append one command line through the GB18030 encoder.
    ///
    /// On encoding failure nothing is appended.
    pub fn push_line_encoded(&mut self, line: &str) -> Result<(), EncodingError> {
        let encoded = gb18030::encode(line)?;
        self.push_preencoded_line(line, encoded);
        Ok(())
    }

    /// Append a line whose GB18030 bytes were already produced.
    ///
    /// Used by multi-line commands that must land as a unit: encode the
    /// fallible parts first, then commit every line.
    pub(crate) fn push_preencoded_line(&mut self, line: &str, encoded: Vec<u8>) {
        self.bytes.extend_from_slice(&encoded);
        self.bytes.extend_from_slice(LINE_END);
        self.transcript.push(line.to_string());
    }

    /// Append an ASCII fragment without a line terminator.
    ///
    /// Bitmap commands use this for the header that raw raster bytes follow
    /// directly.
    pub fn push_fragment(&mut self, fragment: &str) {
        debug_assert!(fragment.is_ascii(), "non-ASCII fragment routed past the encoder");
        self.bytes.extend_from_slice(fragment.as_bytes());
        self.transcript.push(fragment.to_string());
    }

    /// Append raw bytes to the wire payload only.
    ///
    /// The transcript is not touched; packed raster data has no readable
    /// form.
    pub fn push_raw(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// The finished wire bytes.
    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    /// The transcript, one fragment per append.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Number of wire bytes accumulated so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether nothing has been appended since the last reset.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
