use async_trait::async_trait;
use uuid::Uuid;

use super::access::{DeliveryScope, NotificationScope, OrderScope};
use super::catalog::{CartLine, ProductView, UserView};
use super::delivery::{Assignment, DeliveryStatus, DeliveryView};
use super::errors::{DomainError, TransportError};
use super::notification::{NewNotification, NotificationView, RealtimeMessage};
use super::order::{OrderStatus, OrderView};
use super::payment::{PaymentView, Settlement, SettlementOutcome};
use super::{Page, PageRequest};

// ── Persistence ─────────────────────────────────────────────────────────────
//
// Repositories are synchronous; services run them on the blocking pool.

pub trait CatalogReader: Send + Sync + 'static {
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError>;
    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<ProductView>, DomainError>;
}

pub trait UserDirectory: Send + Sync + 'static {
    fn find_user(&self, id: Uuid) -> Result<Option<UserView>, DomainError>;
}

pub trait CartRepository: Send + Sync + 'static {
    fn lines(&self, customer_id: Uuid) -> Result<Vec<CartLine>, DomainError>;
    /// Sets the quantity of a line, inserting it when absent.
    fn put(&self, customer_id: Uuid, line: CartLine) -> Result<(), DomainError>;
    /// Returns false when the product was not in the cart.
    fn remove(&self, customer_id: Uuid, product_id: Uuid) -> Result<bool, DomainError>;
    fn clear(&self, customer_id: Uuid) -> Result<(), DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// Turns the customer's cart into an order and empties the cart, as one
    /// unit of work.
    fn place_from_cart(&self, customer_id: Uuid) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, scope: OrderScope, page: PageRequest) -> Result<Page<OrderView>, DomainError>;
    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError>;
}

pub trait PaymentRepository: Send + Sync + 'static {
    fn has_completed(&self, order_id: Uuid) -> Result<bool, DomainError>;
    fn create_pending(
        &self,
        order_id: Uuid,
        amount: bigdecimal::BigDecimal,
        phone_number: &str,
    ) -> Result<PaymentView, DomainError>;
    fn record_checkout(&self, id: Uuid, checkout_request_id: &str) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentView>, DomainError>;
    /// Moves a pending payment into `outcome`. A completed outcome also marks
    /// the owning order in progress. Payments already in a terminal state
    /// are left untouched.
    fn settle(&self, id: Uuid, outcome: SettlementOutcome) -> Result<Settlement, DomainError>;
}

pub trait DeliveryRepository: Send + Sync + 'static {
    /// Get-or-create the order's delivery and set its courier.
    fn assign(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        courier_id: Uuid,
    ) -> Result<Assignment, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryView>, DomainError>;
    fn list(
        &self,
        scope: DeliveryScope,
        page: PageRequest,
    ) -> Result<Page<DeliveryView>, DomainError>;
    /// `location: None` keeps the stored location.
    fn update_status(
        &self,
        id: Uuid,
        customer_id: Uuid,
        status: DeliveryStatus,
        location: Option<String>,
    ) -> Result<DeliveryView, DomainError>;
}

pub trait NotificationRepository: Send + Sync + 'static {
    fn record(&self, notification: NewNotification) -> Result<NotificationView, DomainError>;
    fn list(
        &self,
        scope: NotificationScope,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, DomainError>;
}

// ── Outbound collaborators ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub phone_number: String,
    /// Whole currency units.
    pub amount: u64,
    pub callback_url: String,
    pub account_reference: String,
    pub description: String,
}

/// The provider's synchronous answer to a push request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushAck {
    pub accepted: bool,
    pub checkout_request_id: Option<String>,
    pub description: Option<String>,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync + 'static {
    async fn access_token(&self) -> Result<String, TransportError>;
    async fn push_payment(
        &self,
        access_token: &str,
        request: &PushRequest,
    ) -> Result<PushAck, TransportError>;
}

#[async_trait]
pub trait SmsTransport: Send + Sync + 'static {
    async fn send(&self, message: &str, phone_number: &str) -> Result<(), TransportError>;
}

/// Live per-recipient channel. Delivery is best-effort.
#[async_trait]
pub trait RealtimeChannel: Send + Sync + 'static {
    async fn push(&self, recipient_id: Uuid, message: RealtimeMessage) -> Result<(), TransportError>;
}
