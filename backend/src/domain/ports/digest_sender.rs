//! Port for delivering rendered irrigation digests.
use async_trait::async_trait;

use crate::domain::{IrrigationDigest, User};

use super::define_port_error;

define_port_error! {
    /// Errors raised by digest delivery adapters.
    pub enum DigestSenderError {
        /// The message could not be handed to the delivery channel.
        Delivery { message: String } => "digest delivery failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DigestSender: Send + Sync {
    async fn send(&self, to: &User, digest: &IrrigationDigest) -> Result<(), DigestSenderError>;
}
