mod community;
mod session;
mod types;

pub use community::Community;
pub use session::{SnmpSession, UdpSession, SNMP_PORT};
pub use types::{parse_textual_counter, SnmpError, SnmpResult, SnmpValue, SnmpVersion};
