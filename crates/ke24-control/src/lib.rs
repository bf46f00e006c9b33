//! Device registry and action handling for Ke-USB24R boards.
//!
//! This crate turns a parsed YAML configuration into a [`Registry`] of
//! verified boards and resolves user-requested actions against it:
//!
//! 1. [`config`] — typed configuration records (ports, devices, units).
//! 2. [`registry`] — probes each port for an expected serial number,
//!    verifies firmware, and indexes every relay/GPIO line by number and
//!    by optional symbolic name.
//! 3. [`resolve`] — maps a target (name or index, optionally qualified by
//!    a device name) to exactly one unit on exactly one board, refusing
//!    ambiguous references.
//! 4. [`execute`] — runs resolved actions in request order against the
//!    bound boards.
//!
//! Everything is strictly sequential; a board's connection is used by one
//! exchange at a time.

pub mod config;
pub mod error;
pub mod execute;
pub mod registry;
pub mod resolve;

pub use config::{Config, DeviceConfig, Mode, PortEntry, UnitConfig, DEFAULT_BAUD};
pub use error::{ControlError, ControlResult};
pub use execute::{execute, Outcome};
pub use registry::{Device, DeviceId, Registry, Unit, UnitKind, UnitRef};
pub use resolve::{resolve, ActionRequest, Operation, RequestedOp, ResolvedAction};
