//! Action resolution.
//!
//! Maps a user request (device name optional, unit kind, index-or-name,
//! operation, value-or-name) to exactly one unit on exactly one bound
//! device, or fails with a specific error. Ambiguity is never resolved by
//! guessing: a name present on several devices needs a device qualifier,
//! and numeric addressing without a qualifier only works when a single
//! device is bound.

use crate::error::{ControlError, ControlResult};
use crate::registry::{DeviceId, Registry, UnitKind, UnitRef};

/// Operation as requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedOp {
    /// Read the unit's state.
    Get,
    /// Set the unit's state to a `0`/`1` literal or a named state.
    Set(String),
}

/// One user-requested action, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    /// Qualifying device name, if one was given.
    pub device: Option<String>,
    /// Kind of unit addressed.
    pub kind: UnitKind,
    /// Numeric index or symbolic unit name.
    pub target: String,
    /// Requested operation.
    pub op: RequestedOp,
}

/// Operation with the set value resolved to a wire state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Read the unit's state.
    Get,
    /// Write the given state.
    Set(bool),
}

/// An action resolved to one concrete unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAction {
    /// The unit to act on.
    pub unit: UnitRef,
    /// Display name: the symbolic name when one is known, else the index.
    pub label: String,
    /// The operation to perform.
    pub op: Operation,
}

/// Resolve a request against the registry.
pub fn resolve(registry: &Registry, request: &ActionRequest) -> ControlResult<ResolvedAction> {
    let device = match &request.device {
        Some(name) => Some(lookup_device(registry, name)?),
        None => None,
    };

    // GPIO output is not implemented; refuse before any lookup can
    // reach hardware.
    if request.kind == UnitKind::Gpio && matches!(request.op, RequestedOp::Set(_)) {
        return Err(ControlError::UnsupportedOperation(format!(
            "GPIO '{}' cannot be set, GPIO output mode is not supported",
            request.target
        )));
    }

    let unit = match request.target.parse::<i64>() {
        // An integer target is always treated as an index; the range
        // check takes priority over any name lookup.
        Ok(index) => resolve_index(registry, request.kind, index, device)?,
        Err(_) => resolve_name(registry, request.kind, &request.target, device, &request.device)?,
    };

    let label = registry
        .unit(unit)
        .and_then(|u| u.name.clone())
        .unwrap_or_else(|| unit.index.to_string());

    let op = match &request.op {
        RequestedOp::Get => Operation::Get,
        RequestedOp::Set(value) => Operation::Set(resolve_value(registry, unit, &label, value)?),
    };

    Ok(ResolvedAction { unit, label, op })
}

fn lookup_device(registry: &Registry, name: &str) -> ControlResult<DeviceId> {
    if let Some(id) = registry.device_by_name(name) {
        return Ok(id);
    }
    if registry.is_configured(name) {
        // Configured but no board with its serial answered.
        Err(ControlError::DeviceNotDetected(name.to_string()))
    } else {
        Err(ControlError::UnknownDevice(name.to_string()))
    }
}

fn resolve_index(
    registry: &Registry,
    kind: UnitKind,
    index: i64,
    device: Option<DeviceId>,
) -> ControlResult<UnitRef> {
    if !kind.contains(index) {
        return Err(ControlError::IndexOutOfRange {
            kind,
            index,
            min: kind.min_index(),
            max: kind.max_index(),
        });
    }
    let index = index as u8;

    // Numeric addressing works even for units absent from the
    // configuration, but needs a device to address into unless exactly
    // one is bound.
    let device = match device {
        Some(id) => id,
        None => match registry.device_count() {
            0 => return Err(ControlError::NoDevices),
            1 => registry.sole_device().expect("count is one"),
            _ => return Err(ControlError::AmbiguousIndex { kind, index }),
        },
    };

    Ok(UnitRef {
        device,
        kind,
        index,
    })
}

fn resolve_name(
    registry: &Registry,
    kind: UnitKind,
    name: &str,
    device: Option<DeviceId>,
    device_name: &Option<String>,
) -> ControlResult<UnitRef> {
    let matches = registry.units_by_name(kind, name);
    if matches.is_empty() {
        return Err(ControlError::UnknownUnit {
            kind,
            name: name.to_string(),
        });
    }

    match device {
        Some(id) => matches
            .iter()
            .find(|m| m.device == id)
            .copied()
            .ok_or_else(|| ControlError::NotOnDevice {
                kind,
                name: name.to_string(),
                device: device_name.clone().unwrap_or_default(),
            }),
        None if matches.len() == 1 => Ok(matches[0]),
        None => Err(ControlError::AmbiguousName {
            kind,
            name: name.to_string(),
        }),
    }
}

fn resolve_value(
    registry: &Registry,
    unit: UnitRef,
    label: &str,
    value: &str,
) -> ControlResult<bool> {
    if let Ok(number) = value.parse::<i64>() {
        return match number {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ControlError::InvalidValue(other)),
        };
    }

    registry
        .unit(unit)
        .and_then(|u| u.states.get(value))
        .copied()
        .ok_or_else(|| ControlError::UnknownValue {
            kind: unit.kind,
            unit: label.to_string(),
            value: value.to_string(),
        })
}
