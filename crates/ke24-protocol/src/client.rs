//! Protocol client: typed operations over a [`Transport`].
//!
//! Each operation is one request/response exchange. The client frames the
//! command, sends it, accumulates reads until a full line or timeout, and
//! validates the acknowledgement before interpreting the payload.

use tracing::{debug, trace};

use crate::codec::LineCodec;
use crate::commands::{Command, Direction};
use crate::error::{ProtocolError, ProtocolResult};
use crate::responses::{FirmwareVersion, Frame};
use crate::transport::Transport;

/// Read chunk size for accumulating a response line.
const READ_CHUNK: usize = 64;

/// A client for one Ke-USB24R board.
pub struct KeClient {
    transport: Box<dyn Transport>,
    codec: LineCodec,
}

impl KeClient {
    /// Create a client over an open transport.
    pub fn new(transport: Box<dyn Transport>) -> Self {
        KeClient {
            transport,
            codec: LineCodec::new(),
        }
    }

    /// Send a command and return the validated response frame.
    fn transact(&mut self, cmd: &Command) -> ProtocolResult<Frame> {
        let sent = cmd.to_command_string();
        debug!(command = %sent, "sending");

        // Stale bytes from a previous failed exchange must not be taken
        // for this command's response.
        self.codec.clear();
        self.transport.write_all(&cmd.encode())?;

        let mut chunk = [0u8; READ_CHUNK];
        let line = loop {
            if let Some(line) = self.codec.decode_line()? {
                break line;
            }
            let n = self.transport.read_some(&mut chunk)?;
            if n == 0 {
                return Err(ProtocolError::Timeout { sent });
            }
            trace!(bytes = n, "received");
            self.codec.push(&chunk[..n]);
        };

        debug!(response = %line, "received line");
        Frame::parse(&sent, &line)
    }

    /// Query the firmware version (`FW`).
    pub fn version(&mut self) -> ProtocolResult<FirmwareVersion> {
        let frame = self.transact(&Command::FirmwareVersion)?;
        frame.field_version(0)
    }

    /// Query the board serial number (`SER`).
    pub fn serial_number(&mut self) -> ProtocolResult<String> {
        let frame = self.transact(&Command::SerialNumber)?;
        Ok(frame.field(0)?.to_string())
    }

    /// Read the state of relay `index` (`RDR`).
    ///
    /// The echoed index must match the requested one; a different index
    /// means the answer belongs to some other exchange and is rejected.
    pub fn get_relay(&mut self, index: u8) -> ProtocolResult<bool> {
        let frame = self.transact(&Command::GetRelay { index })?;
        let echoed = frame.field_u8(0)?;
        if echoed != index {
            return Err(frame.malformed(format!(
                "echoed relay index {} does not match requested {}",
                echoed, index
            )));
        }
        frame.field_bool(1)
    }

    /// Switch relay `index` to `value` (`REL`).
    pub fn set_relay(&mut self, index: u8, value: bool) -> ProtocolResult<()> {
        let frame = self.transact(&Command::SetRelay { index, value })?;
        if frame.fields() != ["OK"] {
            return Err(frame.malformed("expected OK"));
        }
        Ok(())
    }

    /// Set the direction of GPIO line `index` (`IO,SET`).
    ///
    /// With `save` the direction is persisted in the board's NVRAM.
    pub fn set_direction(
        &mut self,
        index: u8,
        direction: Direction,
        save: bool,
    ) -> ProtocolResult<()> {
        let frame = self.transact(&Command::SetDirection {
            index,
            direction,
            save,
        })?;
        if frame.fields() != ["SET", "OK"] {
            return Err(frame.malformed("expected SET,OK"));
        }
        Ok(())
    }

    /// Read GPIO line `index` (`RD`).
    ///
    /// The board echoes the index zero-padded to two digits; anything else
    /// is rejected as a mismatched answer.
    pub fn read_gpio(&mut self, index: u8) -> ProtocolResult<bool> {
        let frame = self.transact(&Command::ReadGpio { index })?;
        let echoed = frame.field(0)?;
        if echoed != format!("{:02}", index) {
            return Err(frame.malformed(format!(
                "echoed GPIO index `{}` does not match requested {:02}",
                echoed, index
            )));
        }
        frame.field_bool(1)
    }
}

impl std::fmt::Debug for KeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeClient").finish_non_exhaustive()
    }
}
