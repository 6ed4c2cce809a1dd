//! SNMP per-interface bandwidth meter.
//!
//! Polls one switch or router over SNMP, discovers its MIB-II interface
//! table, and derives in/out throughput from successive octet-counter
//! samples.
//!
//! The pieces:
//! - [`snmp`]: blocking transport layer with typed values, a session trait,
//!   and a UDP implementation over the `snmp2` crate.
//! - [`device`]: validated connection parameters plus the device itself,
//!   covering session lifecycle, interface discovery, and guarded counter
//!   accessors.
//! - [`sampler`]: turns two counter samples and an elapsed interval into a
//!   Mb/s reading, discarding samples where a counter ran backwards.
//! - [`run`]: the run plan (which interface, how often, how many samples).

pub mod device;
pub mod run;
pub mod sampler;
pub mod snmp;
