mod config;

pub use config::{
    ConfigError, DeviceConfig, NameSequence, DEFAULT_ADDRESS, DEFAULT_COMMUNITY, DEFAULT_VERSION,
};

use tracing::{info, warn};

use crate::snmp::{SnmpError, SnmpResult, SnmpSession, SnmpValue, UdpSession};

// MIB-II interface table. Fixed wire contract with the agent.
const IF_NUMBER: &str = "1.3.6.1.2.1.2.1.0";
const IF_INDEX: &str = "1.3.6.1.2.1.2.2.1.1";
const IF_TYPE: &str = "1.3.6.1.2.1.2.2.1.3";
const IF_SPEED: &str = "1.3.6.1.2.1.2.2.1.5";
const IF_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10";
const IF_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16";

/// ifSpeed reports bits/s; speeds are exposed in Mb/s. Raw values not above
/// this unit read back as 0, so sub-1 Mb/s links report no speed.
const SPEED_UNIT: u64 = 1_000_000;

/// One switch or router reached over SNMP.
///
/// Holds the validated config, at most one live session, and the interface
/// table discovered at connect time. The counter accessors follow a
/// safe-zero policy: an unknown port, a transport failure, or an
/// unparseable value logs a warning and reads as 0, so a sampling loop can
/// keep running across blips.
pub struct Device {
    config: DeviceConfig,
    session: Option<Box<dyn SnmpSession>>,
    interface_count: u32,
    interface_numbers: Vec<u32>,
}

impl Device {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            session: None,
            interface_count: 0,
            interface_numbers: Vec::new(),
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    pub fn interface_count(&self) -> u32 {
        self.interface_count
    }

    pub fn interface_numbers(&self) -> &[u32] {
        &self.interface_numbers
    }

    /// Open a session from the config and discover the interface table.
    ///
    /// Returns `false` when the session cannot be created (socket error,
    /// SNMPv3 without credentials); nothing is retained in that case.
    /// Discovery failures against a live session leave the device connected
    /// with zero interfaces; UDP has no handshake, so an unreachable agent
    /// looks exactly like that. Calling again re-fetches everything.
    pub fn connect(&mut self) -> bool {
        let session = UdpSession::open(
            self.config.address(),
            self.config.port(),
            self.config.community().as_bytes(),
            self.config.version(),
            self.config.timeout(),
        );

        match session {
            Ok(session) => self.connect_with(Box::new(session)),
            Err(err) => {
                warn!(
                    "{}: could not open SNMP session to {}: {}",
                    self.config.name(),
                    self.config.address(),
                    err
                );
                self.disconnect();
                false
            }
        }
    }

    /// Run discovery over a caller-supplied session and adopt it.
    ///
    /// This is the seam for alternate transports; `connect()` is the
    /// UDP-backed convenience on top of it.
    pub fn connect_with(&mut self, mut session: Box<dyn SnmpSession>) -> bool {
        self.interface_count = fetch_interface_count(session.as_mut(), self.config.name());
        self.interface_numbers = fetch_interface_numbers(session.as_mut(), self.config.name());
        self.session = Some(session);

        info!(
            "{}: connected, {} interfaces {:?}",
            self.config.name(),
            self.interface_count,
            self.interface_numbers
        );
        true
    }

    /// Drop the session and the discovered interface table.
    pub fn disconnect(&mut self) {
        self.session = None;
        self.interface_count = 0;
        self.interface_numbers.clear();
    }

    /// IANA ifType of `port` (6 = ethernetCsmacd).
    pub fn interface_type(&mut self, port: u32) -> u64 {
        self.read_column(IF_TYPE, port, "interface type")
    }

    /// Negotiated speed of `port` in Mb/s. Sub-1 Mb/s links report 0.
    pub fn interface_speed(&mut self, port: u32) -> u64 {
        let raw = self.read_column(IF_SPEED, port, "interface speed");
        if raw > SPEED_UNIT {
            raw / SPEED_UNIT
        } else {
            0
        }
    }

    /// Cumulative received octets on `port`, straight off the agent.
    /// Converting to a rate is the caller's job.
    pub fn in_octets(&mut self, port: u32) -> u64 {
        self.read_column(IF_IN_OCTETS, port, "input octets")
    }

    /// Cumulative transmitted octets on `port`, straight off the agent.
    pub fn out_octets(&mut self, port: u32) -> u64 {
        self.read_column(IF_OUT_OCTETS, port, "output octets")
    }

    /// Shared guard-and-fetch behind all four accessors.
    fn read_column(&mut self, base_oid: &str, port: u32, what: &str) -> u64 {
        if self.interface_count == 0 || !self.interface_numbers.contains(&port) {
            warn!(
                "{}: no interface {}, reporting zero {}",
                self.config.name(),
                port,
                what
            );
            return 0;
        }

        match self.fetch_value(base_oid, port) {
            Ok(value) => match value.as_u64() {
                Some(v) => v,
                None => {
                    warn!(
                        "{}: non-numeric {} for interface {}: {:?}",
                        self.config.name(),
                        what,
                        port,
                        value
                    );
                    0
                }
            },
            Err(err) => {
                warn!(
                    "{}: could not read {} for interface {}: {}",
                    self.config.name(),
                    what,
                    port,
                    err
                );
                0
            }
        }
    }

    fn fetch_value(&mut self, base_oid: &str, port: u32) -> SnmpResult<SnmpValue> {
        let session = self.session.as_mut().ok_or(SnmpError::NotConnected)?;
        session.get(&format!("{base_oid}.{port}"))
    }
}

/// GET ifNumber. Zero on transport or parse failure, logged.
fn fetch_interface_count(session: &mut dyn SnmpSession, device: &str) -> u32 {
    let value = match session.get(IF_NUMBER) {
        Ok(value) => value,
        Err(err) => {
            warn!("{}: could not read the interface count: {}", device, err);
            return 0;
        }
    };

    match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
        Some(count) => count,
        None => {
            warn!("{}: non-numeric interface count: {:?}", device, value);
            0
        }
    }
}

/// WALK ifIndex. Empty on transport failure or an empty subtree, logged.
fn fetch_interface_numbers(session: &mut dyn SnmpSession, device: &str) -> Vec<u32> {
    let rows = match session.walk(IF_INDEX) {
        Ok(rows) => rows,
        Err(err) => {
            warn!("{}: could not walk the interface indices: {}", device, err);
            return Vec::new();
        }
    };

    if rows.is_empty() {
        warn!("{}: interface index walk returned nothing", device);
        return Vec::new();
    }

    let mut numbers = Vec::with_capacity(rows.len());
    for (oid, value) in rows {
        match value.as_u64().and_then(|v| u32::try_from(v).ok()) {
            Some(index) => numbers.push(index),
            None => warn!("{}: non-numeric interface index at {}: {:?}", device, oid, value),
        }
    }
    numbers
}
