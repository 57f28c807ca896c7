//! Outbound message delivery.
//!
//! The portal never talks to a mail server itself; it hands messages to a [`Notifier`]. The
//! default [`TracingNotifier`] just records each message in the log.

use crate::errors::Result;
use async_trait::async_trait;

/// Sends a message to a single recipient address.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers `body` with `subject` to `recipient`.
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Notifier that writes every message to the tracing log instead of delivering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(recipient, subject, body_len = body.len(), "Outbound message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tracing_notifier_always_succeeds() -> Result<()> {
        TracingNotifier
            .send("student@example.edu", "Welcome", "Your account is ready")
            .await
    }
}
