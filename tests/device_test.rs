//! End-to-end tests against a mock SNMP agent.
//!
//! The agent is a UDP socket speaking hand-encoded BER: it parses incoming
//! GetRequest/GetNextRequest PDUs and answers from a sorted varbind table.
//! That is enough to drive real `snmp2` sessions through interface
//! discovery and the counter accessors without a switch on the bench.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ifmeter::device::{Device, DeviceConfig, NameSequence};

// ─── BER encoding ───────────────────────────────────────────────────────────

const BER_SEQUENCE: u8 = 0x30;
const BER_INTEGER: u8 = 0x02;
const BER_OCTET_STRING: u8 = 0x04;
const BER_NULL: u8 = 0x05;
const BER_OID: u8 = 0x06;
const BER_COUNTER32: u8 = 0x41;
const BER_GAUGE32: u8 = 0x42;
const BER_COUNTER64: u8 = 0x46;

const SNMP_GET_REQUEST: u8 = 0xA0;
const SNMP_GET_NEXT_REQUEST: u8 = 0xA1;
const SNMP_GET_RESPONSE: u8 = 0xA2;

/// noSuchName, the v1-compatible miss for a GET of an absent object.
const ERROR_NO_SUCH_NAME: i64 = 2;

fn ber_encode_length(len: usize) -> Vec<u8> {
    if len < 128 {
        vec![len as u8]
    } else if len < 256 {
        vec![0x81, len as u8]
    } else {
        vec![0x82, (len >> 8) as u8, len as u8]
    }
}

fn ber_encode_tlv(tag: u8, content: &[u8]) -> Vec<u8> {
    let mut out = vec![tag];
    out.extend(ber_encode_length(content.len()));
    out.extend(content);
    out
}

fn ber_encode_integer(value: i64) -> Vec<u8> {
    let mut bytes = Vec::new();
    if value == 0 {
        bytes.push(0);
    } else {
        let mut v = value;
        while v > 0 {
            bytes.push((v & 0xFF) as u8);
            v >>= 8;
        }
        if bytes.last().unwrap() & 0x80 != 0 {
            bytes.push(0);
        }
        bytes.reverse();
    }
    ber_encode_tlv(BER_INTEGER, &bytes)
}

fn ber_encode_unsigned(tag: u8, value: u64) -> Vec<u8> {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1 && bytes[0] == 0 && (bytes[1] & 0x80) == 0 {
        bytes.remove(0);
    }
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    ber_encode_tlv(tag, &bytes)
}

fn ber_encode_oid(components: &[u32]) -> Vec<u8> {
    if components.len() < 2 {
        return ber_encode_tlv(BER_OID, &[]);
    }
    let mut encoded = vec![(40 * components[0] + components[1]) as u8];
    for &c in &components[2..] {
        if c < 128 {
            encoded.push(c as u8);
        } else {
            let mut chunk = Vec::new();
            let mut v = c;
            chunk.push((v & 0x7F) as u8);
            v >>= 7;
            while v > 0 {
                chunk.push((v & 0x7F) as u8 | 0x80);
                v >>= 7;
            }
            chunk.reverse();
            encoded.extend(chunk);
        }
    }
    ber_encode_tlv(BER_OID, &encoded)
}

fn ber_encode_octet_string(value: &[u8]) -> Vec<u8> {
    ber_encode_tlv(BER_OCTET_STRING, value)
}

fn ber_encode_null() -> Vec<u8> {
    vec![BER_NULL, 0x00]
}

// ─── BER decoding (just enough to read incoming requests) ───────────────────

fn ber_decode_tlv(data: &[u8]) -> Option<(u8, &[u8], &[u8])> {
    if data.len() < 2 {
        return None;
    }
    let tag = data[0];
    let (length, header_len) = if data[1] < 128 {
        (data[1] as usize, 2)
    } else if data[1] == 0x81 && data.len() >= 3 {
        (data[2] as usize, 3)
    } else if data[1] == 0x82 && data.len() >= 4 {
        (((data[2] as usize) << 8) | data[3] as usize, 4)
    } else {
        return None;
    };
    if header_len + length > data.len() {
        return None;
    }
    Some((
        tag,
        &data[header_len..header_len + length],
        &data[header_len + length..],
    ))
}

fn ber_decode_integer(data: &[u8]) -> Option<(i64, &[u8])> {
    let (tag, content, rest) = ber_decode_tlv(data)?;
    if tag != BER_INTEGER || content.is_empty() {
        return None;
    }
    let mut value: i64 = if content[0] & 0x80 != 0 { -1 } else { 0 };
    for &byte in content {
        value = (value << 8) | i64::from(byte);
    }
    Some((value, rest))
}

fn ber_decode_oid(content: &[u8]) -> Option<Vec<u32>> {
    let first = *content.first()?;
    let mut components = vec![u32::from(first) / 40, u32::from(first) % 40];
    let mut acc: u32 = 0;
    for &byte in &content[1..] {
        acc = (acc << 7) | u32::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            components.push(acc);
            acc = 0;
        }
    }
    Some(components)
}

struct Request {
    version: i64,
    community: Vec<u8>,
    pdu_tag: u8,
    request_id: i64,
    oid: Vec<u32>,
}

fn parse_snmp_request(data: &[u8]) -> Option<Request> {
    let (_tag, msg, _) = ber_decode_tlv(data)?;

    let (version, rest) = ber_decode_integer(msg)?;
    let (_, community, rest) = ber_decode_tlv(rest)?;

    let (pdu_tag, pdu, _) = ber_decode_tlv(rest)?;
    if pdu_tag != SNMP_GET_REQUEST && pdu_tag != SNMP_GET_NEXT_REQUEST {
        return None;
    }

    let (request_id, rest) = ber_decode_integer(pdu)?;
    let (_, rest) = ber_decode_integer(rest)?; // error-status
    let (_, rest) = ber_decode_integer(rest)?; // error-index

    let (_, varbind_list, _) = ber_decode_tlv(rest)?;
    let (_, varbind, _) = ber_decode_tlv(varbind_list)?;
    let (tag, oid_content, _) = ber_decode_tlv(varbind)?;
    if tag != BER_OID {
        return None;
    }

    Some(Request {
        version,
        community: community.to_vec(),
        pdu_tag,
        request_id,
        oid: ber_decode_oid(oid_content)?,
    })
}

/// GetResponse with one varbind.
fn build_response(request: &Request, oid: &[u32], value_tlv: &[u8], error_status: i64) -> Vec<u8> {
    let varbind_content = [ber_encode_oid(oid).as_slice(), value_tlv].concat();
    let varbind = ber_encode_tlv(BER_SEQUENCE, &varbind_content);
    let varbind_list = ber_encode_tlv(BER_SEQUENCE, &varbind);

    let pdu_content = [
        ber_encode_integer(request.request_id).as_slice(),
        &ber_encode_integer(error_status),
        &ber_encode_integer(if error_status == 0 { 0 } else { 1 }),
        &varbind_list,
    ]
    .concat();
    let pdu = ber_encode_tlv(SNMP_GET_RESPONSE, &pdu_content);

    let msg_content = [
        ber_encode_integer(request.version).as_slice(),
        &ber_encode_tlv(BER_OCTET_STRING, &request.community),
        &pdu,
    ]
    .concat();

    ber_encode_tlv(BER_SEQUENCE, &msg_content)
}

// ─── Mock agent ─────────────────────────────────────────────────────────────

/// A varbind table behind a UDP socket. GET answers by exact OID; GETNEXT
/// answers with the first entry strictly after the queried OID, or with an
/// OID outside every subtree (2.0) once the table is exhausted so walks
/// terminate.
struct MockAgent {
    port: u16,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MockAgent {
    fn start(mut vars: Vec<(Vec<u32>, Vec<u8>)>) -> Self {
        vars.sort_by(|a, b| a.0.cmp(&b.0));

        let socket = UdpSocket::bind("127.0.0.1:0").expect("bind mock agent");
        let port = socket.local_addr().unwrap().port();
        socket
            .set_read_timeout(Some(Duration::from_millis(200)))
            .unwrap();

        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 4096];
            while !stop_flag.load(Ordering::Relaxed) {
                let (len, src) = match socket.recv_from(&mut buf) {
                    Ok(v) => v,
                    Err(ref e)
                        if e.kind() == std::io::ErrorKind::WouldBlock
                            || e.kind() == std::io::ErrorKind::TimedOut =>
                    {
                        continue
                    }
                    Err(_) => break,
                };

                let request = match parse_snmp_request(&buf[..len]) {
                    Some(r) => r,
                    None => continue,
                };

                let reply = match request.pdu_tag {
                    SNMP_GET_REQUEST => match vars.iter().find(|(oid, _)| *oid == request.oid) {
                        Some((oid, value)) => build_response(&request, oid, value, 0),
                        None => build_response(
                            &request,
                            &request.oid,
                            &ber_encode_null(),
                            ERROR_NO_SUCH_NAME,
                        ),
                    },
                    SNMP_GET_NEXT_REQUEST => match vars.iter().find(|(oid, _)| oid > &request.oid)
                    {
                        Some((oid, value)) => build_response(&request, oid, value, 0),
                        None => build_response(&request, &[2, 0], &ber_encode_null(), 0),
                    },
                    _ => continue,
                };

                let _ = socket.send_to(&reply, src);
            }
        });

        MockAgent {
            port,
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for MockAgent {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

// ─── Varbind table helpers ──────────────────────────────────────────────────

fn if_number_oid() -> Vec<u32> {
    vec![1, 3, 6, 1, 2, 1, 2, 1, 0]
}

fn if_entry(column: u32, index: u32) -> Vec<u32> {
    vec![1, 3, 6, 1, 2, 1, 2, 2, 1, column, index]
}

/// An agent exposing two interfaces, indices 1 and 2.
fn two_port_agent() -> MockAgent {
    MockAgent::start(vec![
        (if_number_oid(), ber_encode_integer(2)),
        (if_entry(1, 1), ber_encode_integer(1)),
        (if_entry(1, 2), ber_encode_integer(2)),
        (if_entry(3, 1), ber_encode_integer(6)),
        (if_entry(3, 2), ber_encode_integer(24)),
        (if_entry(5, 1), ber_encode_unsigned(BER_GAUGE32, 1_000_000_000)),
        (if_entry(5, 2), ber_encode_unsigned(BER_GAUGE32, 500_000)),
        (if_entry(10, 1), ber_encode_unsigned(BER_COUNTER32, 123_456)),
        (
            if_entry(10, 2),
            ber_encode_octet_string(b"Counter32: 654321"),
        ),
        (
            if_entry(16, 1),
            ber_encode_unsigned(BER_COUNTER64, 9_876_543_210),
        ),
        (if_entry(16, 2), ber_encode_unsigned(BER_COUNTER32, 42)),
    ])
}

fn test_device(port: u16, version: &str) -> Device {
    let names = NameSequence::new();
    let config = DeviceConfig::new("127.0.0.1", "public", version, &names)
        .with_name("bench-switch")
        .with_port(port)
        .with_timeout(Duration::from_millis(500));
    Device::new(config)
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[test]
fn discovers_and_reads_the_interface_table() {
    let agent = two_port_agent();
    let mut device = test_device(agent.port, "2c");

    assert!(device.connect());
    assert_eq!(device.interface_count(), 2);
    assert_eq!(device.interface_numbers(), &[1, 2]);

    // Unknown port reads the safe zero.
    assert_eq!(device.in_octets(3), 0);

    assert_eq!(device.in_octets(1), 123_456);
    assert_eq!(device.out_octets(1), 9_876_543_210);
    assert_eq!(device.out_octets(2), 42);
    assert_eq!(device.interface_type(1), 6);
    assert_eq!(device.interface_type(2), 24);
}

#[test]
fn speed_scales_to_megabits_and_floors() {
    let agent = two_port_agent();
    let mut device = test_device(agent.port, "2c");

    assert!(device.connect());
    assert_eq!(device.interface_speed(1), 1000);
    assert_eq!(device.interface_speed(2), 0);
}

#[test]
fn textual_counter_values_parse_over_the_wire() {
    let agent = two_port_agent();
    let mut device = test_device(agent.port, "2c");

    assert!(device.connect());
    assert_eq!(device.in_octets(2), 654_321);
}

#[test]
fn v1_sessions_poll_the_same_table() {
    let agent = two_port_agent();
    let mut device = test_device(agent.port, "1");

    assert!(device.connect());
    assert_eq!(device.interface_count(), 2);
    assert_eq!(device.in_octets(1), 123_456);
}

#[test]
fn silent_agent_leaves_an_empty_interface_table() {
    // A bound socket that never answers: every request times out.
    let socket = UdpSocket::bind("127.0.0.1:0").expect("reserve a port");
    let port = socket.local_addr().unwrap().port();

    let names = NameSequence::new();
    let config = DeviceConfig::new("127.0.0.1", "public", "2c", &names)
        .with_port(port)
        .with_timeout(Duration::from_millis(200));
    let mut device = Device::new(config);

    // UDP has no handshake, so the session opens; discovery comes up empty.
    assert!(device.connect());
    assert!(device.is_connected());
    assert_eq!(device.interface_count(), 0);
    assert!(device.interface_numbers().is_empty());
    assert_eq!(device.in_octets(1), 0);
}

#[test]
fn snmpv3_never_connects_without_credentials() {
    let agent = two_port_agent();
    let mut device = test_device(agent.port, "3");

    assert!(!device.connect());
    assert!(!device.is_connected());
    assert_eq!(device.interface_count(), 0);
}
