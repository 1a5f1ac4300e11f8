pub mod cart_repo;
pub mod catalog_repo;
pub mod delivery_repo;
pub mod models;
pub mod mpesa;
pub mod notification_repo;
pub mod order_repo;
pub mod outbox;
pub mod payment_repo;
pub mod realtime;
pub mod sms;

#[cfg(test)]
pub(crate) mod test_support;

use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::domain::errors::{DomainError, TransportError};

pub use cart_repo::DieselCartRepository;
pub use catalog_repo::DieselCatalog;
pub use delivery_repo::DieselDeliveryRepository;
pub use mpesa::{DarajaClient, DarajaSettings};
pub use notification_repo::DieselNotificationRepository;
pub use order_repo::DieselOrderRepository;
pub use payment_repo::DieselPaymentRepository;
pub use realtime::BroadcastHub;
pub use sms::{AfricasTalkingSettings, AfricasTalkingSms};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<DieselError> for DomainError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => DomainError::NotFound("Record".to_string()),
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            TransportError::InvalidResponse(e.to_string())
        } else {
            TransportError::Failed(e.to_string())
        }
    }
}
