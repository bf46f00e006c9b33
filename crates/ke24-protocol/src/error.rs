//! Error types for the Ke-USB24R protocol.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when working with the board protocol.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// I/O failure on the serial line.
    #[error("serial I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure opening or configuring the serial port.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// The configured path does not point at a character device.
    #[error("{0} is not a character device")]
    NotACharDevice(PathBuf),

    /// No complete response line arrived within the read timeout.
    #[error("timeout waiting for response to `{sent}`")]
    Timeout {
        /// The command line that was sent (without framing).
        sent: String,
    },

    /// The response acknowledgement does not match the sent command.
    #[error("response `{received}` does not acknowledge `{sent}`")]
    Mismatch {
        /// The command line that was sent.
        sent: String,
        /// The full response line received.
        received: String,
    },

    /// The response was structurally invalid for the sent command.
    #[error("malformed response `{received}` to `{sent}`: {reason}")]
    Malformed {
        /// The command line that was sent.
        sent: String,
        /// The full response line received.
        received: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A line grew past the protocol's maximum length without terminating.
    #[error("response line exceeds {max} bytes")]
    LineTooLong {
        /// Maximum allowed line length.
        max: usize,
    },
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
