//! Integration tests: registry build, resolution and execution against a
//! scripted board.
//!
//! The fake board implements the raw [`Transport`] contract and emulates
//! the Ke-USB24R wire protocol, so these tests cover the whole path from
//! configuration to protocol frames without hardware.

use std::sync::{Arc, Mutex};

use ke24_control::{
    execute, resolve, ActionRequest, Config, ControlError, PortEntry, Registry, RequestedOp,
    UnitKind,
};
use ke24_protocol::{KeClient, ProtocolError, ProtocolResult, Transport};

// ============================================================================
// Fake board
// ============================================================================

/// Shared observable state of a fake board.
#[derive(Debug, Default)]
struct BoardState {
    relays: [bool; 4],
    gpio: [bool; 18],
    /// Every command line received, without framing.
    log: Vec<String>,
}

type SharedState = Arc<Mutex<BoardState>>;

/// A [`Transport`] double emulating one board.
struct FakeBoard {
    serial: String,
    firmware: String,
    state: SharedState,
    /// Answer `RDR` with a wrong echoed index.
    crosstalk: bool,
    pending: Vec<u8>,
}

impl FakeBoard {
    fn new(serial: &str, state: SharedState) -> Self {
        FakeBoard {
            serial: serial.to_string(),
            firmware: "2.0".to_string(),
            state,
            crosstalk: false,
            pending: Vec::new(),
        }
    }

    fn with_firmware(mut self, firmware: &str) -> Self {
        self.firmware = firmware.to_string();
        self
    }

    fn with_crosstalk(mut self) -> Self {
        self.crosstalk = true;
        self
    }

    fn respond(&mut self, command: &str) -> String {
        let fields: Vec<&str> = command.split(',').collect();
        let mut state = self.state.lock().unwrap();
        match fields[0] {
            "SER" => format!("#SER,{}", self.serial),
            "FW" => format!("#FW,{}", self.firmware),
            "RDR" => {
                let index: usize = fields[1].parse().unwrap();
                let echoed = if self.crosstalk { index + 1 } else { index };
                format!("#RDR,{},{}", echoed, u8::from(state.relays[index - 1]))
            }
            "REL" => {
                let index: usize = fields[1].parse().unwrap();
                state.relays[index - 1] = fields[2] == "1";
                "#REL,OK".to_string()
            }
            "IO" => "#IO,SET,OK".to_string(),
            "RD" => {
                let index: usize = fields[1].parse().unwrap();
                format!("#RD,{:02},{}", index, u8::from(state.gpio[index - 1]))
            }
            other => panic!("fake board got unknown command {}", other),
        }
    }
}

impl Transport for FakeBoard {
    fn write_all(&mut self, data: &[u8]) -> ProtocolResult<()> {
        let line = std::str::from_utf8(data).unwrap();
        let command = line
            .strip_prefix("$KE,")
            .and_then(|l| l.strip_suffix("\r\n"))
            .unwrap_or_else(|| panic!("unframed request: {:?}", line));
        self.state.lock().unwrap().log.push(command.to_string());
        let response = self.respond(command);
        self.pending = format!("{}\r\n", response).into_bytes();
        Ok(())
    }

    fn read_some(&mut self, buf: &mut [u8]) -> ProtocolResult<usize> {
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

// ============================================================================
// Helpers
// ============================================================================

const ONE_BOARD: &str = "
Ports:
  - /dev/ttyUSB0: 115200
Devices:
  - name: board1
    serial: ABC123
    relays:
      - index: 1
        name: pump
        states: { on: 1, off: 0 }
    gpio:
      - index: 3
        name: door
";

const TWO_BOARDS: &str = "
Ports:
  - /dev/ttyUSB0:
  - /dev/ttyUSB1:
Devices:
  - name: board1
    serial: ABC123
    relays:
      - index: 1
        name: pump
  - name: board2
    serial: DEF456
    relays:
      - index: 2
        name: pump
";

/// Build a registry where each listed port is answered by a fake board
/// with the given serial. Returns the registry and the shared board
/// states, in port order.
fn build(
    config_text: &str,
    serials: &[&str],
) -> (Result<Registry, ControlError>, Vec<SharedState>) {
    let config = Config::from_str(config_text).unwrap();
    let states: Vec<SharedState> = serials.iter().map(|_| SharedState::default()).collect();
    let boards: Vec<FakeBoard> = serials
        .iter()
        .zip(&states)
        .map(|(serial, state)| FakeBoard::new(serial, state.clone()))
        .collect();

    let mut boards = boards.into_iter();
    let mut opener = move |_port: &PortEntry| -> ProtocolResult<KeClient> {
        Ok(KeClient::new(Box::new(boards.next().expect("enough boards"))))
    };
    let registry = Registry::build(&config, &mut opener);
    (registry, states)
}

fn get(kind: UnitKind, target: &str) -> ActionRequest {
    ActionRequest {
        device: None,
        kind,
        target: target.to_string(),
        op: RequestedOp::Get,
    }
}

fn set(kind: UnitKind, target: &str, value: &str) -> ActionRequest {
    ActionRequest {
        device: None,
        kind,
        target: target.to_string(),
        op: RequestedOp::Set(value.to_string()),
    }
}

fn on_device(device: &str, request: ActionRequest) -> ActionRequest {
    ActionRequest {
        device: Some(device.to_string()),
        ..request
    }
}

/// Commands of one kind the board has seen.
fn writes_of(state: &SharedState, prefix: &str) -> Vec<String> {
    state
        .lock()
        .unwrap()
        .log
        .iter()
        .filter(|c| c.starts_with(prefix))
        .cloned()
        .collect()
}

// ============================================================================
// Registry build
// ============================================================================

#[test]
fn test_binds_device_by_serial() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();
    assert_eq!(registry.device_count(), 1);

    let id = registry.device_by_name("board1").unwrap();
    let device = registry.device(id);
    assert_eq!(device.serial(), "ABC123");
    assert_eq!(device.firmware().to_string(), "2.0");
    assert_eq!(device.port().to_str(), Some("/dev/ttyUSB0"));
}

#[test]
fn test_serial_mismatch_leaves_device_unbound() {
    let (registry, _) = build(ONE_BOARD, &["OTHER"]);
    let registry = registry.unwrap();
    assert_eq!(registry.device_count(), 0);

    // Targeting the configured-but-absent device is a named failure,
    // never a stale bind.
    let request = on_device("board1", get(UnitKind::Relay, "pump"));
    let err = resolve(&registry, &request).unwrap_err();
    assert!(matches!(err, ControlError::DeviceNotDetected(name) if name == "board1"));
}

#[test]
fn test_unreachable_port_is_skipped() {
    let config = Config::from_str(ONE_BOARD).unwrap();
    let mut opener = |_port: &PortEntry| -> ProtocolResult<KeClient> {
        Err(ProtocolError::NotACharDevice("/dev/ttyUSB0".into()))
    };
    let registry = Registry::build(&config, &mut opener).unwrap();
    assert_eq!(registry.device_count(), 0);
}

#[test]
fn test_unsupported_firmware_fails_build() {
    let config = Config::from_str(ONE_BOARD).unwrap();
    let state = SharedState::default();
    let mut board = Some(FakeBoard::new("ABC123", state).with_firmware("2.1"));
    let mut opener = |_port: &PortEntry| -> ProtocolResult<KeClient> {
        Ok(KeClient::new(Box::new(board.take().unwrap())))
    };

    let err = Registry::build(&config, &mut opener).unwrap_err();
    assert!(matches!(
        err,
        ControlError::UnsupportedFirmware { device, version }
            if device == "board1" && version.to_string() == "2.1"
    ));
}

#[test]
fn test_missing_index_is_fatal() {
    let text = "
Ports:
  - /dev/ttyUSB0:
Devices:
  - name: board1
    serial: ABC123
    relays:
      - name: pump
";
    let (registry, _) = build(text, &["ABC123"]);
    assert!(matches!(
        registry.unwrap_err(),
        ControlError::MissingIndex { device, kind }
            if device == "board1" && kind == UnitKind::Relay
    ));
}

#[test]
fn test_configured_index_out_of_range_is_fatal() {
    let text = "
Ports:
  - /dev/ttyUSB0:
Devices:
  - name: board1
    serial: ABC123
    relays:
      - index: 5
";
    let (registry, _) = build(text, &["ABC123"]);
    assert!(matches!(
        registry.unwrap_err(),
        ControlError::IndexOutOfRange { index: 5, .. }
    ));
}

#[test]
fn test_bad_state_value_is_fatal() {
    let text = "
Ports:
  - /dev/ttyUSB0:
Devices:
  - name: board1
    serial: ABC123
    relays:
      - index: 1
        states: { blast: 2 }
";
    let (registry, _) = build(text, &["ABC123"]);
    assert!(matches!(
        registry.unwrap_err(),
        ControlError::InvalidStateValue { value: 2, .. }
    ));
}

#[test]
fn test_first_match_wins() {
    // Two ports whose boards both advertise ABC123; the device binds to
    // the first and is not reconsidered.
    let (registry, _) = build(TWO_BOARDS, &["ABC123", "ABC123"]);
    let registry = registry.unwrap();
    assert_eq!(registry.device_count(), 1);

    let id = registry.device_by_name("board1").unwrap();
    assert_eq!(registry.device(id).port().to_str(), Some("/dev/ttyUSB0"));
}

#[test]
fn test_two_boards_bind_by_serial_not_port_order() {
    let (registry, _) = build(TWO_BOARDS, &["DEF456", "ABC123"]);
    let registry = registry.unwrap();
    assert_eq!(registry.device_count(), 2);

    let board2 = registry.device_by_name("board2").unwrap();
    assert_eq!(registry.device(board2).port().to_str(), Some("/dev/ttyUSB0"));
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_numeric_index_resolves_on_single_device() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();

    for index in 1u8..=4 {
        let action = resolve(&registry, &get(UnitKind::Relay, &index.to_string())).unwrap();
        assert_eq!(action.unit.index, index);
    }
    for index in 1u8..=18 {
        let action = resolve(&registry, &get(UnitKind::Gpio, &index.to_string())).unwrap();
        assert_eq!(action.unit.index, index);
    }
}

#[test]
fn test_out_of_range_index_is_rejected() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();

    for target in ["0", "5", "-1"] {
        let err = resolve(&registry, &get(UnitKind::Relay, target)).unwrap_err();
        assert!(matches!(
            err,
            ControlError::IndexOutOfRange { min: 1, max: 4, .. }
        ));
    }
    let err = resolve(&registry, &get(UnitKind::Gpio, "19")).unwrap_err();
    assert!(matches!(
        err,
        ControlError::IndexOutOfRange { min: 1, max: 18, .. }
    ));
}

#[test]
fn test_numeric_index_without_device_needs_single_registry() {
    let (registry, _) = build(TWO_BOARDS, &["ABC123", "DEF456"]);
    let registry = registry.unwrap();

    let err = resolve(&registry, &get(UnitKind::Relay, "1")).unwrap_err();
    assert!(matches!(err, ControlError::AmbiguousIndex { .. }));

    // With a qualifier it works, even for an index with no configured
    // unit entry.
    let action = resolve(&registry, &on_device("board2", get(UnitKind::Relay, "3"))).unwrap();
    assert_eq!(action.unit.index, 3);
    assert_eq!(action.label, "3");
}

#[test]
fn test_unique_name_resolves_without_qualifier() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();

    let action = resolve(&registry, &get(UnitKind::Relay, "pump")).unwrap();
    assert_eq!(action.unit.index, 1);
    assert_eq!(action.label, "pump");
}

#[test]
fn test_duplicated_name_without_qualifier_is_ambiguous() {
    let (registry, states) = build(TWO_BOARDS, &["ABC123", "DEF456"]);
    let registry = registry.unwrap();

    let err = resolve(&registry, &set(UnitKind::Relay, "pump", "1")).unwrap_err();
    assert!(matches!(
        err,
        ControlError::AmbiguousName { name, .. } if name == "pump"
    ));

    // The failed resolution must not have touched any relay.
    for state in &states {
        assert!(writes_of(state, "REL").is_empty());
    }
}

#[test]
fn test_duplicated_name_with_qualifier_selects_that_device() {
    let (registry, _) = build(TWO_BOARDS, &["ABC123", "DEF456"]);
    let registry = registry.unwrap();

    let action = resolve(&registry, &on_device("board2", get(UnitKind::Relay, "pump"))).unwrap();
    assert_eq!(action.unit.device, registry.device_by_name("board2").unwrap());
    assert_eq!(action.unit.index, 2);
}

#[test]
fn test_name_absent_from_qualified_device() {
    let text = "
Ports:
  - /dev/ttyUSB0:
  - /dev/ttyUSB1:
Devices:
  - name: board1
    serial: ABC123
    relays:
      - index: 1
        name: pump
  - name: board2
    serial: DEF456
";
    let (registry, _) = build(text, &["ABC123", "DEF456"]);
    let registry = registry.unwrap();

    let err = resolve(&registry, &on_device("board2", get(UnitKind::Relay, "pump"))).unwrap_err();
    assert!(matches!(
        err,
        ControlError::NotOnDevice { device, .. } if device == "board2"
    ));
}

#[test]
fn test_unknown_name_and_unknown_device() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();

    let err = resolve(&registry, &get(UnitKind::Relay, "heater")).unwrap_err();
    assert!(matches!(err, ControlError::UnknownUnit { .. }));

    let err = resolve(&registry, &on_device("boardX", get(UnitKind::Relay, "pump"))).unwrap_err();
    assert!(matches!(err, ControlError::UnknownDevice(name) if name == "boardX"));
}

#[test]
fn test_set_value_resolution() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();

    use ke24_control::Operation;
    let action = resolve(&registry, &set(UnitKind::Relay, "pump", "on")).unwrap();
    assert_eq!(action.op, Operation::Set(true));

    let action = resolve(&registry, &set(UnitKind::Relay, "pump", "0")).unwrap();
    assert_eq!(action.op, Operation::Set(false));

    let err = resolve(&registry, &set(UnitKind::Relay, "pump", "2")).unwrap_err();
    assert!(matches!(err, ControlError::InvalidValue(2)));

    let err = resolve(&registry, &set(UnitKind::Relay, "pump", "blast")).unwrap_err();
    assert!(matches!(
        err,
        ControlError::UnknownValue { value, .. } if value == "blast"
    ));
}

#[test]
fn test_gpio_set_is_unsupported() {
    let (registry, states) = build(ONE_BOARD, &["ABC123"]);
    let registry = registry.unwrap();

    let err = resolve(&registry, &set(UnitKind::Gpio, "door", "1")).unwrap_err();
    assert!(matches!(err, ControlError::UnsupportedOperation(_)));
    assert!(writes_of(&states[0], "IO").is_empty());
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_set_relay_by_state_name() {
    let (registry, states) = build(ONE_BOARD, &["ABC123"]);
    let mut registry = registry.unwrap();

    let action = resolve(&registry, &set(UnitKind::Relay, "pump", "on")).unwrap();
    let outcome = execute(&mut registry, &action).unwrap();

    assert_eq!(outcome.to_string(), "Relay 'pump' = 1 (on)");
    assert!(states[0].lock().unwrap().relays[0]);
    assert_eq!(writes_of(&states[0], "REL"), ["REL,1,1"]);
}

#[test]
fn test_set_then_get_round_trip() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let mut registry = registry.unwrap();

    let set_action = resolve(&registry, &set(UnitKind::Relay, "pump", "off")).unwrap();
    execute(&mut registry, &set_action).unwrap();

    let get_action = resolve(&registry, &get(UnitKind::Relay, "pump")).unwrap();
    let outcome = execute(&mut registry, &get_action).unwrap();
    assert!(!outcome.value);
    assert_eq!(outcome.state_name.as_deref(), Some("off"));
}

#[test]
fn test_gpio_get_forces_input_direction_first() {
    let (registry, states) = build(ONE_BOARD, &["ABC123"]);
    let mut registry = registry.unwrap();
    states[0].lock().unwrap().gpio[2] = true;

    let action = resolve(&registry, &get(UnitKind::Gpio, "door")).unwrap();
    let outcome = execute(&mut registry, &action).unwrap();
    assert!(outcome.value);

    let log = states[0].lock().unwrap().log.clone();
    let dir = log.iter().position(|c| c == "IO,SET,3,1").unwrap();
    let read = log.iter().position(|c| c == "RD,3").unwrap();
    assert!(dir < read);
}

#[test]
fn test_unnamed_numeric_unit_reports_raw_value() {
    let (registry, _) = build(ONE_BOARD, &["ABC123"]);
    let mut registry = registry.unwrap();

    let action = resolve(&registry, &get(UnitKind::Relay, "2")).unwrap();
    let outcome = execute(&mut registry, &action).unwrap();
    assert_eq!(outcome.to_string(), "Relay '2' = 0");
}

#[test]
fn test_crosstalk_response_is_a_protocol_error() {
    let config = Config::from_str(ONE_BOARD).unwrap();
    let state = SharedState::default();
    let mut board = Some(FakeBoard::new("ABC123", state).with_crosstalk());
    let mut opener = |_port: &PortEntry| -> ProtocolResult<KeClient> {
        Ok(KeClient::new(Box::new(board.take().unwrap())))
    };
    let mut registry = Registry::build(&config, &mut opener).unwrap();

    let action = resolve(&registry, &get(UnitKind::Relay, "pump")).unwrap();
    let err = execute(&mut registry, &action).unwrap_err();
    assert!(matches!(
        err,
        ControlError::Protocol(ProtocolError::Malformed { .. })
    ));
}
