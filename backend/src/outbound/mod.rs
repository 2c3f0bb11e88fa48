//! Outbound adapters implementing the domain ports.
//!
//! - **persistence**: PostgreSQL repositories (Diesel, `diesel-async`)
//! - **cache**: job status and results, in Redis or in process memory
//! - **queue**: the calculation worker pool
//! - **telemetry**: the telemetry network HTTP client
//! - **simulation**: the soil water model executable
//! - **coverage**: serviceable area lookup
//! - **notifications**: digest delivery
//!
//! Adapters translate between domain types and infrastructure formats and
//! hold no business rules.

pub mod cache;
pub mod coverage;
pub mod notifications;
pub mod persistence;
pub mod queue;
pub mod simulation;
pub mod telemetry;
