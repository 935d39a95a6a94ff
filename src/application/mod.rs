pub mod cart_service;
pub mod checkout_service;
pub mod order_service;
pub mod shipment_relay;

#[cfg(test)]
pub(crate) mod fakes;

use serde_json::Value;

use crate::domain::errors::DomainError;
use crate::domain::ports::{NotificationChannel, Recipient};

/// Run a blocking repository call off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))?
}

/// Send a notification, logging instead of failing when the channel is down.
pub(crate) async fn notify_quietly(
    channel: &dyn NotificationChannel,
    recipient: Recipient,
    message: &str,
    metadata: Value,
) {
    if let Err(e) = channel.notify(recipient, message, &metadata).await {
        log::warn!("Notification to {:?} failed: {}", recipient, e);
    }
}
