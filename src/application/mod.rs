use std::future::Future;
use std::time::Duration;

use crate::domain::errors::{DomainError, TransportError};

pub mod cart_service;
pub mod delivery_service;
pub mod notification_service;
pub mod order_service;
pub mod payment_service;

#[cfg(test)]
pub(crate) mod testing;

pub use cart_service::CartService;
pub use delivery_service::DeliveryService;
pub use notification_service::NotificationService;
pub use order_service::OrderService;
pub use payment_service::{CallbackOutcome, PaymentService, PaymentSettings};

/// Runs synchronous repository work on the blocking pool.
pub(crate) async fn blocking<F, T>(work: F) -> Result<T, DomainError>
where
    F: FnOnce() -> Result<T, DomainError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| DomainError::Internal(format!("blocking task failed: {e}")))?
}

/// Caps an outbound call at `limit`; running out of time is a transport
/// failure like any other.
pub(crate) async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or(Err(TransportError::Timeout(limit)))
}
