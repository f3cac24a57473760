//! sensorbridge: bridges periodic physical-sensor readings to an MQTT
//! broker.
//!
//! Raw readings flow through per-topic channels that scale, round,
//! deduplicate, and JSON-encode them before handing the payload to the
//! connection manager for a best-effort publish:
//!
//! ```text
//! raw reading -> channel::SensorChannel -> mqtt::ConnectionManager -> broker
//! ```
//!
//! Connectivity is observed exclusively through the status tokens emitted
//! by [`mqtt::ConnectionManager`]; transport diagnostics land in the
//! size-bounded [`diaglog::DiagnosticLog`].

pub mod channel;
pub mod codec;
pub mod config;
pub mod diaglog;
pub mod mqtt;
