//! Error type for configuration, registry and action handling.

use ke24_protocol::{FirmwareVersion, ProtocolError};
use thiserror::Error;

use crate::registry::UnitKind;

/// Errors that can occur between loading the configuration and finishing
/// the last action.
#[derive(Debug, Error)]
pub enum ControlError {
    /// I/O failure reading the configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration document failed to parse.
    #[error("configuration error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A wire protocol failure on a bound board.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A port entry was not a single `path: baud` mapping.
    #[error("port entry {0} must be a single `path: baud` mapping")]
    InvalidPortEntry(usize),

    /// Two devices share a name in the configuration.
    #[error("device '{0}' is defined more than once")]
    DuplicateDevice(String),

    /// A bound board reports a firmware version other than 2.0.
    #[error("device '{device}' reports firmware {version}, only 2.0 is supported")]
    UnsupportedFirmware {
        /// Configured device name.
        device: String,
        /// Version the board reported.
        version: FirmwareVersion,
    },

    /// A relay/GPIO entry has no `index` field.
    #[error("a {kind} entry of device '{device}' has no index")]
    MissingIndex {
        /// Configured device name.
        device: String,
        /// Unit kind of the entry.
        kind: UnitKind,
    },

    /// A numeric index is outside the valid range for its kind.
    #[error("{kind} index {index} is out of range ({min}..={max})")]
    IndexOutOfRange {
        /// Unit kind the index was used for.
        kind: UnitKind,
        /// The offending index.
        index: i64,
        /// Lowest valid index.
        min: u8,
        /// Highest valid index.
        max: u8,
    },

    /// Two units of one kind share an index on one device.
    #[error("device '{device}' defines {kind} index {index} more than once")]
    DuplicateIndex {
        /// Configured device name.
        device: String,
        /// Unit kind of the entry.
        kind: UnitKind,
        /// The repeated index.
        index: u8,
    },

    /// Two units of one kind share a name on one device.
    #[error("device '{device}' defines {kind} name '{name}' more than once")]
    DuplicateName {
        /// Configured device name.
        device: String,
        /// Unit kind of the entry.
        kind: UnitKind,
        /// The repeated name.
        name: String,
    },

    /// A named state maps to something other than 0 or 1.
    #[error("state '{state}' of {kind} {index} on device '{device}' must map to 0 or 1, not {value}")]
    InvalidStateValue {
        /// Configured device name.
        device: String,
        /// Unit kind of the entry.
        kind: UnitKind,
        /// Unit index.
        index: u8,
        /// State name.
        state: String,
        /// The offending mapped value.
        value: i64,
    },

    /// An action names a device absent from the configuration.
    #[error("device '{0}' is not defined in the configuration")]
    UnknownDevice(String),

    /// An action names a configured device that answered on no port.
    #[error("device '{0}' was not detected on any configured port")]
    DeviceNotDetected(String),

    /// A symbolic unit name appears nowhere in the configuration.
    #[error("{kind} '{name}' is not defined anywhere in the configuration")]
    UnknownUnit {
        /// Unit kind searched.
        kind: UnitKind,
        /// The name that was looked up.
        name: String,
    },

    /// A symbolic unit name exists on several devices and no device was
    /// given to pick one.
    #[error("{kind} '{name}' is defined for multiple devices, qualify it with a device name")]
    AmbiguousName {
        /// Unit kind searched.
        kind: UnitKind,
        /// The ambiguous name.
        name: String,
    },

    /// A device qualifier selected none of the units carrying a name.
    #[error("{kind} '{name}' is not defined for device '{device}'")]
    NotOnDevice {
        /// Unit kind searched.
        kind: UnitKind,
        /// The name that was looked up.
        name: String,
        /// The qualifying device name.
        device: String,
    },

    /// A numeric address was used with several devices bound and no
    /// qualifier to pick one.
    #[error("{kind} index {index} requires a device name when more than one device is configured")]
    AmbiguousIndex {
        /// Unit kind addressed.
        kind: UnitKind,
        /// The numeric index.
        index: u8,
    },

    /// No board answered on any configured port.
    #[error("no devices were detected on any configured port")]
    NoDevices,

    /// A set value is an integer other than 0 or 1.
    #[error("set value must be 0 or 1, not {0}")]
    InvalidValue(i64),

    /// A symbolic set value is absent from the unit's named states.
    #[error("value '{value}' is not defined for {kind} '{unit}'")]
    UnknownValue {
        /// Unit kind addressed.
        kind: UnitKind,
        /// Display name of the unit.
        unit: String,
        /// The value name that was looked up.
        value: String,
    },

    /// The requested operation is not supported by this system.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
}

/// Result type alias for control operations.
pub type ControlResult<T> = Result<T, ControlError>;
