use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors surfaced by the transport layer.
#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("SNMP request failed: {0}")]
    RequestFailed(String),
    #[error("invalid OID: {0}")]
    InvalidOid(String),
    #[error("timeout")]
    Timeout,
    #[error("authentication failure")]
    AuthFailure,
    #[error("network unreachable")]
    NetworkUnreachable,
    #[error("unsupported SNMP version: {0}")]
    UnsupportedVersion(String),
    #[error("not connected")]
    NotConnected,
}

pub type SnmpResult<T> = Result<T, SnmpError>;

/// SNMP protocol version. The stored value is always one of these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnmpVersion {
    V1,
    V2c,
    V3,
}

impl SnmpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnmpVersion::V1 => "1",
            SnmpVersion::V2c => "2c",
            SnmpVersion::V3 => "3",
        }
    }
}

impl fmt::Display for SnmpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnmpVersion {
    type Err = SnmpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "v1" | "snmpv1" => Ok(SnmpVersion::V1),
            "2" | "v2" | "2c" | "v2c" | "snmpv2c" => Ok(SnmpVersion::V2c),
            "3" | "v3" | "snmpv3" => Ok(SnmpVersion::V3),
            _ => Err(SnmpError::UnsupportedVersion(s.to_string())),
        }
    }
}

/// Typed value from a GET or WALK varbind.
#[derive(Debug, Clone, PartialEq)]
pub enum SnmpValue {
    Integer(i64),
    String(String),
    OctetString(Vec<u8>),
    Oid(String),
    Counter32(u32),
    Counter64(u64),
    Gauge32(u32),
    TimeTicks(u32),
    IpAddress(String),
    Null,
    Unsupported(String),
}

impl SnmpValue {
    /// Extract a non-negative integer from counter-ish variants.
    ///
    /// `String` values go through [`parse_textual_counter`] so agents that
    /// render counters as display strings still yield the numeric payload.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            SnmpValue::Integer(v) if *v >= 0 => Some(*v as u64),
            SnmpValue::Counter32(v) => Some(u64::from(*v)),
            SnmpValue::Counter64(v) => Some(*v),
            SnmpValue::Gauge32(v) => Some(u64::from(*v)),
            SnmpValue::TimeTicks(v) => Some(u64::from(*v)),
            SnmpValue::String(s) => parse_textual_counter(s),
            _ => None,
        }
    }
}

/// Pull the bare numeric payload out of a textual varbind rendering.
///
/// Accepts either a plain digit string or the `"<type>: <value>"` form some
/// agents produce, e.g. `"Counter32: 123456"` or a whole varbind line like
/// `"IF-MIB::ifInOctets.1 = Counter32: 123456"`. Returns `None` unless the
/// value part is all digits.
pub fn parse_textual_counter(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let value = match raw.rsplit_once(": ") {
        Some((_, rest)) => rest.trim(),
        None => raw,
    };
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        value.parse().ok()
    } else {
        None
    }
}
