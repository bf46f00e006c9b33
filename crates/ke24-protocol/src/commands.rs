//! Commands that can be sent to the board.
//!
//! Every command is a comma-joined text line wrapped in `$KE,...\r\n`
//! framing by the codec. The board acknowledges with `#<prefix>` where
//! `<prefix>` is the text before the first comma of the command.

use crate::codec::LineCodec;

/// Direction of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input (wire value `1`).
    In,
    /// Output (wire value `0`).
    Out,
}

impl Direction {
    /// Wire encoding used in the `IO,SET` command.
    pub fn wire_value(&self) -> u8 {
        match self {
            Direction::In => 1,
            Direction::Out => 0,
        }
    }
}

/// Commands understood by the Ke-USB24R firmware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Query the firmware version (`FW`).
    FirmwareVersion,

    /// Query the board serial number (`SER`).
    SerialNumber,

    /// Read the state of a relay (`RDR,<idx>`).
    GetRelay {
        /// Relay index (1-based).
        index: u8,
    },

    /// Switch a relay (`REL,<idx>,<val>`).
    SetRelay {
        /// Relay index (1-based).
        index: u8,
        /// Target state.
        value: bool,
    },

    /// Set the direction of a GPIO line (`IO,SET,<idx>,<dir>[,S]`).
    SetDirection {
        /// GPIO index (1-based).
        index: u8,
        /// Target direction.
        direction: Direction,
        /// Persist the direction in the board's NVRAM.
        save: bool,
    },

    /// Read a GPIO line (`RD,<idx>`).
    ReadGpio {
        /// GPIO index (1-based).
        index: u8,
    },
}

impl Command {
    /// Get the command string without framing or terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::FirmwareVersion => "FW".to_string(),
            Command::SerialNumber => "SER".to_string(),
            Command::GetRelay { index } => format!("RDR,{}", index),
            Command::SetRelay { index, value } => {
                format!("REL,{},{}", index, u8::from(*value))
            }
            Command::SetDirection {
                index,
                direction,
                save,
            } => {
                if *save {
                    format!("IO,SET,{},{},S", index, direction.wire_value())
                } else {
                    format!("IO,SET,{},{}", index, direction.wire_value())
                }
            }
            Command::ReadGpio { index } => format!("RD,{}", index),
        }
    }

    /// The acknowledgement prefix: the text before the first comma of the
    /// command string. The board echoes this as `#<prefix>` in its
    /// response.
    pub fn prefix(&self) -> &'static str {
        match self {
            Command::FirmwareVersion => "FW",
            Command::SerialNumber => "SER",
            Command::GetRelay { .. } => "RDR",
            Command::SetRelay { .. } => "REL",
            Command::SetDirection { .. } => "IO",
            Command::ReadGpio { .. } => "RD",
        }
    }

    /// Encode the command as a framed line ready to send.
    pub fn encode(&self) -> Vec<u8> {
        LineCodec::encode_command(&self.to_command_string())
    }
}
