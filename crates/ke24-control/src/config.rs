//! Typed configuration records.
//!
//! The YAML document has three top-level keys:
//!
//! ```yaml
//! Mode: Verbose            # or Quiet
//! Ports:
//!   - /dev/ttyUSB0: 115200
//!   - /dev/ttyUSB1:        # empty value = 115200
//! Devices:
//!   - name: board1
//!     serial: ABC123
//!     relays:
//!       - index: 1
//!         name: pump
//!         states: { on: 1, off: 0 }
//!     gpio:
//!       - index: 3
//!         name: door
//! ```
//!
//! Parsing is two-phase: serde deserializes the raw shape, then
//! [`Config::from_str`] validates the parts serde cannot express (port
//! entries must be single-key mappings) into explicit records. Unit
//! indices and states are validated later, at registry build.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{ControlError, ControlResult};

/// Baud rate used when a port entry leaves it unset.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Output verbosity, overridable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Mode {
    /// Warnings and errors only.
    Quiet,
    /// Informational output as well.
    #[default]
    Verbose,
}

/// One serial port to probe: a character-device path and a baud rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Character device path.
    pub path: PathBuf,
    /// Baud rate (8N1 framing).
    pub baud: u32,
}

/// One relay or GPIO entry under a device.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitConfig {
    /// Numeric index on the board. Required; validated at registry build
    /// so the error can name the device.
    pub index: Option<i64>,
    /// Optional symbolic name, unique per device and kind.
    pub name: Option<String>,
    /// Optional named states (e.g. `on: 1, off: 0`).
    #[serde(default)]
    pub states: BTreeMap<String, i64>,
    /// Informational default state. Never applied automatically.
    pub default: Option<u8>,
}

/// One configured board.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    /// Unique device name.
    pub name: String,
    /// Expected serial number; a board is bound only if it matches.
    pub serial: String,
    /// Relay entries.
    #[serde(default)]
    pub relays: Vec<UnitConfig>,
    /// GPIO entries.
    #[serde(default)]
    pub gpio: Vec<UnitConfig>,
}

/// Raw document shape as serde sees it.
#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(rename = "Mode", default)]
    mode: Mode,
    #[serde(rename = "Ports", default)]
    ports: Vec<BTreeMap<String, Option<u32>>>,
    #[serde(rename = "Devices", default)]
    devices: Vec<DeviceConfig>,
}

/// Validated configuration.
#[derive(Debug)]
pub struct Config {
    /// Output verbosity.
    pub mode: Mode,
    /// Ports to probe, in document order.
    pub ports: Vec<PortEntry>,
    /// Devices expected somewhere on those ports, in document order.
    pub devices: Vec<DeviceConfig>,
}

impl Config {
    /// Parse and validate a YAML document.
    pub fn from_str(text: &str) -> ControlResult<Config> {
        let raw: RawConfig = serde_yaml::from_str(text)?;

        let mut ports = Vec::with_capacity(raw.ports.len());
        for (i, entry) in raw.ports.iter().enumerate() {
            if entry.len() != 1 {
                return Err(ControlError::InvalidPortEntry(i));
            }
            let (path, baud) = entry.iter().next().expect("len checked");
            ports.push(PortEntry {
                path: PathBuf::from(path),
                baud: baud.unwrap_or(DEFAULT_BAUD),
            });
        }

        Ok(Config {
            mode: raw.mode,
            ports,
            devices: raw.devices,
        })
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> ControlResult<Config> {
        let text = std::fs::read_to_string(path)?;
        Self::from_str(&text)
    }
}
