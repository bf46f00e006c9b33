//! Device registry: probe, bind, index.
//!
//! Built once per run. Each configured port is opened and probed for its
//! board serial number; the first configured device whose expected serial
//! matches is bound to that port and is never reconsidered elsewhere. A
//! bound device must report firmware 2.0 or the whole build fails. Ports
//! that cannot be opened or do not answer are skipped with a warning;
//! devices left unbound surface later, when an action targets them.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;

use ke24_protocol::{FirmwareVersion, KeClient, ProtocolResult, SUPPORTED_FIRMWARE};
use tracing::{debug, info, warn};

use crate::config::{Config, DeviceConfig, PortEntry, UnitConfig};
use crate::error::{ControlError, ControlResult};

/// Kind of an addressable line on a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UnitKind {
    /// Relay output (indices 1..=4).
    Relay,
    /// GPIO line (indices 1..=18).
    Gpio,
}

impl UnitKind {
    /// Lowest valid index for this kind.
    pub fn min_index(&self) -> u8 {
        1
    }

    /// Highest valid index for this kind.
    pub fn max_index(&self) -> u8 {
        match self {
            UnitKind::Relay => 4,
            UnitKind::Gpio => 18,
        }
    }

    /// Whether `index` addresses a line of this kind.
    pub fn contains(&self, index: i64) -> bool {
        index >= i64::from(self.min_index()) && index <= i64::from(self.max_index())
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitKind::Relay => write!(f, "Relay"),
            UnitKind::Gpio => write!(f, "GPIO"),
        }
    }
}

/// Handle into the registry's device table.
///
/// Units refer back to their owning device through this handle; the device
/// table owns the devices themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(usize);

/// A single relay or GPIO line registered on a device.
#[derive(Debug, Clone)]
pub struct Unit {
    /// Numeric index on the board (1-based).
    pub index: u8,
    /// Symbolic name, if configured.
    pub name: Option<String>,
    /// Named states (name to the boolean value it stands for).
    pub states: BTreeMap<String, bool>,
    /// Informational default state from the configuration.
    pub default: Option<u8>,
}

/// Reference to one unit on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRef {
    /// Owning device.
    pub device: DeviceId,
    /// Unit kind.
    pub kind: UnitKind,
    /// Unit index (1-based).
    pub index: u8,
}

/// A board bound to a port after serial-number and firmware verification.
pub struct Device {
    name: String,
    serial: String,
    firmware: FirmwareVersion,
    port: PathBuf,
    client: KeClient,
    units: BTreeMap<(UnitKind, u8), Unit>,
    unit_names: BTreeMap<(UnitKind, String), u8>,
}

impl Device {
    /// Configured device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Verified board serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Firmware version read at bind time.
    pub fn firmware(&self) -> FirmwareVersion {
        self.firmware
    }

    /// Path of the port this device is bound to.
    pub fn port(&self) -> &PathBuf {
        &self.port
    }

    /// The device's protocol client.
    pub fn client_mut(&mut self) -> &mut KeClient {
        &mut self.client
    }

    /// Look up a configured unit by kind and index.
    pub fn unit(&self, kind: UnitKind, index: u8) -> Option<&Unit> {
        self.units.get(&(kind, index))
    }

    fn register(&mut self, kind: UnitKind, entry: &UnitConfig) -> ControlResult<Unit> {
        let index = entry.index.ok_or_else(|| ControlError::MissingIndex {
            device: self.name.clone(),
            kind,
        })?;
        if !kind.contains(index) {
            return Err(ControlError::IndexOutOfRange {
                kind,
                index,
                min: kind.min_index(),
                max: kind.max_index(),
            });
        }
        let index = index as u8;

        let mut states = BTreeMap::new();
        for (state, value) in &entry.states {
            let value = match value {
                0 => false,
                1 => true,
                other => {
                    return Err(ControlError::InvalidStateValue {
                        device: self.name.clone(),
                        kind,
                        index,
                        state: state.clone(),
                        value: *other,
                    })
                }
            };
            states.insert(state.clone(), value);
        }

        let unit = Unit {
            index,
            name: entry.name.clone(),
            states,
            default: entry.default,
        };

        if self.units.insert((kind, index), unit.clone()).is_some() {
            return Err(ControlError::DuplicateIndex {
                device: self.name.clone(),
                kind,
                index,
            });
        }
        if let Some(name) = &unit.name {
            if self
                .unit_names
                .insert((kind, name.clone()), index)
                .is_some()
            {
                return Err(ControlError::DuplicateName {
                    device: self.name.clone(),
                    kind,
                    name: name.clone(),
                });
            }
        }

        Ok(unit)
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("serial", &self.serial)
            .field("firmware", &self.firmware)
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}

/// Callback that opens a protocol client on a configured port.
///
/// Production passes a [`ke24_protocol::SerialTransport`] opener; tests
/// pass scripted boards.
pub type PortOpener<'a> = dyn FnMut(&PortEntry) -> ProtocolResult<KeClient> + 'a;

/// All bound devices of one run, with the name maps used for resolution.
#[derive(Debug)]
pub struct Registry {
    devices: Vec<Device>,
    device_names: HashMap<String, DeviceId>,
    configured: BTreeSet<String>,
    // Global name multimap, in configuration encounter order. Its entry
    // length is exactly what disambiguation inspects.
    unit_names: BTreeMap<(UnitKind, String), Vec<UnitRef>>,
}

impl Registry {
    /// Probe all configured ports and bind matching devices.
    pub fn build(config: &Config, opener: &mut PortOpener<'_>) -> ControlResult<Registry> {
        let mut registry = Registry {
            devices: Vec::new(),
            device_names: HashMap::new(),
            configured: BTreeSet::new(),
            unit_names: BTreeMap::new(),
        };

        for device in &config.devices {
            if !registry.configured.insert(device.name.clone()) {
                return Err(ControlError::DuplicateDevice(device.name.clone()));
            }
        }

        let mut bound = vec![false; config.devices.len()];
        for port in &config.ports {
            let mut client = match opener(port) {
                Ok(client) => client,
                Err(e) => {
                    warn!(port = %port.path.display(), error = %e, "skipping port");
                    continue;
                }
            };

            let serial = match client.serial_number() {
                Ok(serial) => serial,
                Err(e) => {
                    warn!(port = %port.path.display(), error = %e, "no serial number answer");
                    continue;
                }
            };
            debug!(port = %port.path.display(), serial = %serial, "probed");

            let Some(slot) = config
                .devices
                .iter()
                .enumerate()
                .find(|(i, d)| !bound[*i] && d.serial == serial)
                .map(|(i, _)| i)
            else {
                debug!(port = %port.path.display(), serial = %serial, "no configured device matches");
                continue;
            };
            // First match wins; the device is never reconsidered for
            // another port, and the port is consumed.
            bound[slot] = true;
            registry.bind(&config.devices[slot], port, client)?;
        }

        if registry.devices.is_empty() {
            info!("no devices detected");
        }
        Ok(registry)
    }

    fn bind(
        &mut self,
        config: &DeviceConfig,
        port: &PortEntry,
        mut client: KeClient,
    ) -> ControlResult<()> {
        let firmware = client.version()?;
        if firmware != SUPPORTED_FIRMWARE {
            return Err(ControlError::UnsupportedFirmware {
                device: config.name.clone(),
                version: firmware,
            });
        }

        let id = DeviceId(self.devices.len());
        let mut device = Device {
            name: config.name.clone(),
            serial: config.serial.clone(),
            firmware,
            port: port.path.clone(),
            client,
            units: BTreeMap::new(),
            unit_names: BTreeMap::new(),
        };

        for entry in &config.relays {
            let unit = device.register(UnitKind::Relay, entry)?;
            self.index_name(id, UnitKind::Relay, &unit);
        }
        for entry in &config.gpio {
            let unit = device.register(UnitKind::Gpio, entry)?;
            self.index_name(id, UnitKind::Gpio, &unit);
        }

        info!(
            device = %device.name,
            port = %port.path.display(),
            firmware = %firmware,
            "bound"
        );
        self.device_names.insert(device.name.clone(), id);
        self.devices.push(device);
        Ok(())
    }

    fn index_name(&mut self, device: DeviceId, kind: UnitKind, unit: &Unit) {
        if let Some(name) = &unit.name {
            self.unit_names
                .entry((kind, name.clone()))
                .or_default()
                .push(UnitRef {
                    device,
                    kind,
                    index: unit.index,
                });
        }
    }

    /// Number of bound devices.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// The only bound device, if exactly one exists.
    pub fn sole_device(&self) -> Option<DeviceId> {
        if self.devices.len() == 1 {
            Some(DeviceId(0))
        } else {
            None
        }
    }

    /// Look up a bound device by name.
    pub fn device_by_name(&self, name: &str) -> Option<DeviceId> {
        self.device_names.get(name).copied()
    }

    /// Whether a device name appears in the configuration (bound or not).
    pub fn is_configured(&self, name: &str) -> bool {
        self.configured.contains(name)
    }

    /// Get a bound device.
    pub fn device(&self, id: DeviceId) -> &Device {
        &self.devices[id.0]
    }

    /// Get a bound device mutably (for its client).
    pub fn device_mut(&mut self, id: DeviceId) -> &mut Device {
        &mut self.devices[id.0]
    }

    /// All units carrying a symbolic name, in configuration order.
    pub fn units_by_name(&self, kind: UnitKind, name: &str) -> &[UnitRef] {
        self.unit_names
            .get(&(kind, name.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The configured unit behind a reference, if any.
    ///
    /// Numeric addressing may reference units absent from the
    /// configuration; those have no entry here.
    pub fn unit(&self, unit: UnitRef) -> Option<&Unit> {
        self.device(unit.device).unit(unit.kind, unit.index)
    }
}
