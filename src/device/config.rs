use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::snmp::{Community, SnmpVersion, SNMP_PORT};

pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const DEFAULT_COMMUNITY: &str = "public";
pub const DEFAULT_VERSION: SnmpVersion = SnmpVersion::V2c;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A rejected config assignment. The stored value is always left as it was.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("device name must not be blank")]
    BlankName,
    #[error("community must not be blank")]
    BlankCommunity,
    #[error("{0:?} is not an IPv4 or IPv6 address")]
    BadAddress(String),
    #[error("{0:?} is not an SNMP version (expected 1, 2c, or 3)")]
    BadVersion(String),
}

/// Generator for fallback device names: `device1`, `device2`, ...
///
/// Owned and passed in by the caller, so numbering is explicit rather than
/// hidden process-wide state. Every config construction consumes one number.
#[derive(Debug, Default)]
pub struct NameSequence(AtomicU64);

impl NameSequence {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn next_name(&self) -> String {
        let n = self.0.fetch_add(1, Ordering::Relaxed) + 1;
        format!("device{n}")
    }
}

/// Validated SNMP connection parameters for one device.
///
/// Construction is lenient: blank or malformed inputs fall back to the
/// defaults with a warning, so a config always holds usable values. The
/// setters are strict: a rejected assignment returns [`ConfigError`] and
/// leaves the stored value untouched, never blank or corrupt.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    name: String,
    address: IpAddr,
    port: u16,
    community: Community,
    version: SnmpVersion,
    timeout: Duration,
}

impl DeviceConfig {
    pub fn new(address: &str, community: &str, version: &str, names: &NameSequence) -> Self {
        let address = match parse_address(address) {
            Some(ip) => ip,
            None => {
                warn!(
                    "{:?} is not a usable device address, using {}",
                    address, DEFAULT_ADDRESS
                );
                DEFAULT_ADDRESS
            }
        };

        let community = match non_blank(community) {
            Some(value) => Community::new(value),
            None => {
                warn!("blank community, using the default");
                Community::new(DEFAULT_COMMUNITY)
            }
        };

        let version = match version.parse::<SnmpVersion>() {
            Ok(v) => v,
            Err(_) => {
                warn!(
                    "{:?} is not an SNMP version, using v{}",
                    version, DEFAULT_VERSION
                );
                DEFAULT_VERSION
            }
        };

        Self {
            name: names.next_name(),
            address,
            port: SNMP_PORT,
            community,
            version,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Replace the generated name; a blank name keeps the generated one.
    pub fn with_name(mut self, name: &str) -> Self {
        if let Err(err) = self.set_name(name) {
            warn!("{}, keeping {:?}", err, self.name);
        }
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> IpAddr {
        self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn community(&self) -> &Community {
        &self.community
    }

    pub fn version(&self) -> SnmpVersion {
        self.version
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_name(&mut self, value: &str) -> Result<(), ConfigError> {
        match non_blank(value) {
            Some(value) => {
                self.name = value.to_string();
                Ok(())
            }
            None => Err(ConfigError::BlankName),
        }
    }

    pub fn set_address(&mut self, value: &str) -> Result<(), ConfigError> {
        match parse_address(value) {
            Some(ip) => {
                self.address = ip;
                Ok(())
            }
            None => Err(ConfigError::BadAddress(value.to_string())),
        }
    }

    pub fn set_community(&mut self, value: &str) -> Result<(), ConfigError> {
        match non_blank(value) {
            Some(value) => {
                self.community = Community::new(value);
                Ok(())
            }
            None => Err(ConfigError::BlankCommunity),
        }
    }

    pub fn set_version(&mut self, value: &str) -> Result<(), ConfigError> {
        let parsed = value
            .parse::<SnmpVersion>()
            .map_err(|_| ConfigError::BadVersion(value.to_string()))?;
        self.version = parsed;
        Ok(())
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn parse_address(value: &str) -> Option<IpAddr> {
    IpAddr::from_str(value.trim()).ok()
}
