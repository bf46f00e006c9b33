//! Line-based codec for board communication.
//!
//! Requests are framed as `$KE,<command>\r\n`; responses arrive as single
//! `\r\n`-terminated lines. The codec accumulates incoming bytes and yields
//! complete lines with the terminator stripped.

use bytes::BytesMut;

use crate::error::{ProtocolError, ProtocolResult};

/// Maximum request/response line length.
pub const MAX_LINE_LENGTH: usize = 160;

/// Request framing prefix.
pub const REQUEST_PREFIX: &str = "$KE";

/// A codec for reading and writing protocol lines.
///
/// Reads on the serial line may return partial data; the codec buffers
/// whatever arrived until a complete line is available.
#[derive(Debug, Default)]
pub struct LineCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl LineCodec {
    /// Create a new line codec.
    pub fn new() -> Self {
        LineCodec {
            buffer: BytesMut::with_capacity(MAX_LINE_LENGTH * 2),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode a complete line from the buffer.
    ///
    /// Returns `Ok(Some(line))` with the `\r\n` terminator stripped once a
    /// full line is available, `Ok(None)` if more data is needed, or an
    /// error if the buffer grew past [`MAX_LINE_LENGTH`] without a
    /// terminator.
    pub fn decode_line(&mut self) -> ProtocolResult<Option<String>> {
        let mut line_end = None;
        for i in 0..self.buffer.len().saturating_sub(1) {
            if self.buffer[i] == b'\r' && self.buffer[i + 1] == b'\n' {
                line_end = Some(i);
                break;
            }
        }

        let Some(end) = line_end else {
            if self.buffer.len() > MAX_LINE_LENGTH {
                return Err(ProtocolError::LineTooLong {
                    max: MAX_LINE_LENGTH,
                });
            }
            return Ok(None);
        };

        let line_data = self.buffer.split_to(end);
        let line = String::from_utf8_lossy(&line_data).to_string();
        // Drop the \r\n terminator.
        let _ = self.buffer.split_to(2);

        Ok(Some(line))
    }

    /// Encode a command for transmission.
    ///
    /// Prepends the `$KE,` framing and appends the `\r\n` terminator.
    pub fn encode_command(cmd: &str) -> Vec<u8> {
        let mut buf = Vec::with_capacity(REQUEST_PREFIX.len() + cmd.len() + 3);
        buf.extend_from_slice(REQUEST_PREFIX.as_bytes());
        buf.push(b',');
        buf.extend_from_slice(cmd.as_bytes());
        buf.extend_from_slice(b"\r\n");
        buf
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
