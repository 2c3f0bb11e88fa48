//! Irrigation accounting and calculation dispatch service.
//!
//! The [`domain`] owns the business rules and the ports it needs;
//! [`outbound`] adapters implement those ports, [`inbound`] exposes them
//! over HTTP and [`config`] loads service settings.

pub mod config;
pub mod domain;
pub mod inbound;
pub mod outbound;
#[cfg(feature = "test-support")]
pub mod test_support;
