use async_trait::async_trait;

use crate::{Result, SignalPayload};

/// A sink that can deliver an alert.
///
/// Implementations must return `Error::Notification` on failure and never
/// panic; the dispatcher owns timeouts and retries.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Name used in logs and dispatch reports, e.g. "telegram".
    fn name(&self) -> &str;

    async fn send(&self, payload: &SignalPayload) -> Result<()>;
}
