use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use snmp2::{Oid, SyncSession};

use super::types::{SnmpError, SnmpResult, SnmpValue, SnmpVersion};

/// Default SNMP agent port.
pub const SNMP_PORT: u16 = 161;

const REQUEST_ID: i32 = 1;

/// Blocking SNMP session: single-OID GET plus subtree WALK.
///
/// The device layer talks only to this trait; tests substitute an
/// in-memory implementation.
pub trait SnmpSession {
    fn get(&mut self, oid: &str) -> SnmpResult<SnmpValue>;
    fn walk(&mut self, base_oid: &str) -> SnmpResult<Vec<(String, SnmpValue)>>;
}

/// UDP-backed session over `snmp2::SyncSession`.
///
/// Creation binds a local socket without contacting the agent; the first
/// GET does that, bounded by `timeout` per request.
pub struct UdpSession {
    inner: SyncSession,
}

impl std::fmt::Debug for UdpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UdpSession").finish_non_exhaustive()
    }
}

impl UdpSession {
    pub fn open(
        address: IpAddr,
        port: u16,
        community: &[u8],
        version: SnmpVersion,
        timeout: Duration,
    ) -> SnmpResult<Self> {
        let addr = match address {
            IpAddr::V4(v4) => format!("{}:{}", v4, port),
            IpAddr::V6(v6) => format!("[{}]:{}", v6, port),
        };
        let timeout = Some(timeout);

        let inner = match version {
            SnmpVersion::V1 => SyncSession::new_v1(addr.as_str(), community, timeout, REQUEST_ID),
            SnmpVersion::V2c => SyncSession::new_v2c(addr.as_str(), community, timeout, REQUEST_ID),
            SnmpVersion::V3 => {
                // Community-based config cannot satisfy USM.
                return Err(SnmpError::UnsupportedVersion(
                    "SNMPv3 requires USM credentials".into(),
                ));
            }
        }
        .map_err(|_| SnmpError::NetworkUnreachable)?;

        Ok(Self { inner })
    }
}

impl SnmpSession for UdpSession {
    fn get(&mut self, oid: &str) -> SnmpResult<SnmpValue> {
        let parsed =
            Oid::from_str(oid).map_err(|_| SnmpError::InvalidOid(oid.to_string()))?;

        let mut response = self.inner.get(&parsed).map_err(map_snmp_error)?;

        if response.error_status != 0 {
            return Err(SnmpError::RequestFailed(format!(
                "SNMP error status: {}",
                response.error_status
            )));
        }

        let (_name, value) = response
            .varbinds
            .next()
            .ok_or_else(|| SnmpError::RequestFailed("no varbinds in response".into()))?;

        Ok(convert_value(value))
    }

    fn walk(&mut self, base_oid: &str) -> SnmpResult<Vec<(String, SnmpValue)>> {
        let base = Oid::from_str(base_oid)
            .map_err(|_| SnmpError::InvalidOid(base_oid.to_string()))?;
        // Dot-terminated so 2.2.1.1 does not claim 2.2.1.10.
        let prefix = format!("{}.", base_oid.trim_end_matches('.'));

        let mut results = Vec::new();
        let mut current = base;

        // GETNEXT until the agent leaves the base subtree.
        loop {
            let query = current.clone();

            let (error_status, varbinds) = {
                let response = self.inner.getnext(&query).map_err(map_snmp_error)?;
                let status = response.error_status;

                let data: Vec<(String, SnmpValue)> = response
                    .varbinds
                    .map(|(name, value)| (name.to_string(), convert_value(value)))
                    .collect();

                (status, data)
            };

            if error_status != 0 || varbinds.is_empty() {
                break;
            }

            for (name, value) in varbinds {
                if !name.starts_with(&prefix) {
                    return Ok(results);
                }

                current = Oid::from_str(&name)
                    .map_err(|_| SnmpError::InvalidOid(name.clone()))?;
                results.push((name, value));
            }
        }

        Ok(results)
    }
}

/// Convert `snmp2`'s value into ours.
fn convert_value(value: snmp2::Value) -> SnmpValue {
    match value {
        snmp2::Value::Integer(i) => SnmpValue::Integer(i),
        snmp2::Value::OctetString(bytes) => String::from_utf8(bytes.to_vec())
            .map(SnmpValue::String)
            .unwrap_or_else(|_| SnmpValue::OctetString(bytes.to_vec())),
        snmp2::Value::ObjectIdentifier(oid) => SnmpValue::Oid(oid.to_string()),
        snmp2::Value::Counter32(c) => SnmpValue::Counter32(c),
        snmp2::Value::Counter64(c) => SnmpValue::Counter64(c),
        snmp2::Value::Unsigned32(g) => SnmpValue::Gauge32(g),
        snmp2::Value::Timeticks(t) => SnmpValue::TimeTicks(t),
        snmp2::Value::IpAddress(ip) => {
            SnmpValue::IpAddress(format!("{}.{}.{}.{}", ip[0], ip[1], ip[2], ip[3]))
        }
        snmp2::Value::Null => SnmpValue::Null,
        other => SnmpValue::Unsupported(format!("{:?}", other)),
    }
}

fn map_snmp_error(err: snmp2::Error) -> SnmpError {
    match err {
        snmp2::Error::Send => SnmpError::NetworkUnreachable,
        snmp2::Error::Receive => SnmpError::Timeout,
        snmp2::Error::CommunityMismatch => SnmpError::AuthFailure,
        other => SnmpError::RequestFailed(format!("{:?}", other)),
    }
}
