//! Digest delivery through the structured log.
//!
//! Stands in for an email channel: each digest becomes one `info!` event
//! carrying the recipient address, subject and a per-field summary.

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{DigestSender, DigestSenderError};
use crate::domain::{IrrigationDigest, User};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingDigestSender;

#[async_trait]
impl DigestSender for LoggingDigestSender {
    async fn send(&self, to: &User, digest: &IrrigationDigest) -> Result<(), DigestSenderError> {
        let body = serde_json::to_string(&digest.fields)
            .map_err(|error| DigestSenderError::delivery(error.to_string()))?;
        info!(
            user_id = %to.id,
            to = %to.email,
            subject = %digest.subject(),
            language = digest.language.code(),
            fields = digest.fields.len(),
            %body,
            "irrigation digest"
        );
        Ok(())
    }
}
