//! Ke-USB24R serial protocol.
//!
//! This crate provides types and utilities for talking to a Ke-USB24R
//! relay/GPIO board over its serial line. The board speaks a simple
//! line-based text protocol:
//!
//! - **Requests** (host → board): `$KE,<command>\r\n`
//! - **Responses** (board → host): `#<command-prefix>,<field>,...\r\n`
//!   where `<command-prefix>` is the text before the first comma of the
//!   sent command.
//!
//! # Commands
//!
//! - `FW` — firmware version (`<major>.<minor>`, only 2.0 is supported)
//! - `SER` — board serial number
//! - `RDR,<idx>` — read relay state
//! - `REL,<idx>,<val>` — set relay state
//! - `IO,SET,<idx>,<dir>[,S]` — set GPIO direction (1 = IN), optional
//!   NVRAM save
//! - `RD,<idx>` — read GPIO line (index echoed zero-padded to two digits)
//!
//! # Example
//!
//! ```rust,ignore
//! use ke24_protocol::{KeClient, SerialTransport};
//!
//! let transport = SerialTransport::open("/dev/ttyUSB0", 115200)?;
//! let mut client = KeClient::new(Box::new(transport));
//! let version = client.version()?;
//! let state = client.get_relay(1)?;
//! ```

mod client;
mod codec;
mod commands;
mod error;
mod responses;
mod transport;

pub use client::*;
pub use codec::*;
pub use commands::*;
pub use error::*;
pub use responses::*;
pub use transport::*;
