//! Raw serial transport.
//!
//! The transport owns one open serial connection and moves raw bytes; all
//! framing and validation lives in the client above it. Reads block for at
//! most the fixed timeout and may return fewer bytes than requested; a
//! return of zero means the timeout elapsed with nothing received. No
//! retries happen at this layer.

use std::io::{Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::Path;
use std::time::Duration;

use crate::error::{ProtocolError, ProtocolResult};

/// Fixed read timeout for board responses.
pub const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Raw byte transport to a board.
///
/// Implemented by [`SerialTransport`] for real hardware and by test
/// doubles in the crates above.
pub trait Transport: Send {
    /// Write all bytes to the device.
    fn write_all(&mut self, data: &[u8]) -> ProtocolResult<()>;

    /// Read whatever arrives before the timeout, up to `buf.len()` bytes.
    ///
    /// Returns the number of bytes read; `0` means the timeout elapsed.
    fn read_some(&mut self, buf: &mut [u8]) -> ProtocolResult<usize>;
}

/// A [`Transport`] over a physical serial port (8N1, fixed timeout).
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open the character device at `path` with the given baud rate.
    ///
    /// Fails if the path is not a character device or the open fails.
    pub fn open(path: &Path, baud: u32) -> ProtocolResult<SerialTransport> {
        let metadata = std::fs::metadata(path)?;
        if !metadata.file_type().is_char_device() {
            return Err(ProtocolError::NotACharDevice(path.to_path_buf()));
        }

        let port = serialport::new(path.to_string_lossy(), baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()?;

        Ok(SerialTransport { port })
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, data: &[u8]) -> ProtocolResult<()> {
        self.port.write_all(data)?;
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> ProtocolResult<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            // A timed-out read is a valid empty read; the caller decides
            // whether the conversation is over.
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}
