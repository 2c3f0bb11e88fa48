//! Telemetry network adapters.
//!
//! A thin HTTP implementation of the `TelemetrySource` port for the
//! network that relays LoRA-ARTA flowmeter reports.

mod dto;
mod http_source;

pub use http_source::{TelemetryHttpSource, TelemetryHttpSourceConfig};
