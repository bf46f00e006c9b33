//! Action execution.
//!
//! Runs resolved actions against the bound boards, strictly in request
//! order. Relay side effects are observable; the order the user gave is
//! the order the hardware sees. A GPIO read always forces the line's
//! direction to input first.

use ke24_protocol::Direction;
use tracing::debug;

use crate::error::{ControlError, ControlResult};
use crate::registry::{Registry, UnitKind};
use crate::resolve::{Operation, ResolvedAction};

/// Result of one executed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Kind of the unit that was acted on.
    pub kind: UnitKind,
    /// Display name of the unit.
    pub label: String,
    /// Raw state after the action.
    pub value: bool,
    /// The configured state name the value maps back to, if any.
    pub state_name: Option<String>,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}' = {}", self.kind, self.label, u8::from(self.value))?;
        if let Some(name) = &self.state_name {
            write!(f, " ({})", name)?;
        }
        Ok(())
    }
}

/// Execute one resolved action.
pub fn execute(registry: &mut Registry, action: &ResolvedAction) -> ControlResult<Outcome> {
    let unit = action.unit;
    debug!(
        device = %registry.device(unit.device).name(),
        kind = %unit.kind,
        index = unit.index,
        op = ?action.op,
        "executing"
    );

    let value = {
        let client = registry.device_mut(unit.device).client_mut();
        match (unit.kind, action.op) {
            (UnitKind::Relay, Operation::Get) => client.get_relay(unit.index)?,
            (UnitKind::Relay, Operation::Set(value)) => {
                client.set_relay(unit.index, value)?;
                value
            }
            (UnitKind::Gpio, Operation::Get) => {
                client.set_direction(unit.index, Direction::In, false)?;
                client.read_gpio(unit.index)?
            }
            (UnitKind::Gpio, Operation::Set(_)) => {
                // The resolver refuses these; keep the executor honest for
                // callers that skip it.
                return Err(ControlError::UnsupportedOperation(
                    "GPIO output mode is not supported".to_string(),
                ));
            }
        }
    };

    let state_name = registry.unit(unit).and_then(|u| {
        u.states
            .iter()
            .find(|(_, v)| **v == value)
            .map(|(name, _)| name.clone())
    });

    Ok(Outcome {
        kind: unit.kind,
        label: action.label.clone(),
        value,
        state_name,
    })
}
