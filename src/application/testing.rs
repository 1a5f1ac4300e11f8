//! In-memory port implementations for service tests.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use uuid::Uuid;

use super::{
    CartService, DeliveryService, NotificationService, OrderService, PaymentService,
    PaymentSettings,
};
use crate::domain::access::{DeliveryScope, NotificationScope, OrderScope, Role};
use crate::domain::catalog::{CartLine, ProductView, UserView};
use crate::domain::delivery::{Assignment, DeliveryStatus, DeliveryView};
use crate::domain::errors::{DomainError, TransportError};
use crate::domain::events::DomainEvent;
use crate::domain::notification::{NewNotification, NotificationView, RealtimeMessage};
use crate::domain::order::{price_cart, OrderLineView, OrderStatus, OrderView};
use crate::domain::payment::{PaymentStatus, PaymentView, Settlement, SettlementOutcome};
use crate::domain::ports::{
    CartRepository, CatalogReader, DeliveryRepository, NotificationRepository, OrderRepository,
    PaymentProvider, PaymentRepository, PushAck, PushRequest, RealtimeChannel, SmsTransport,
    UserDirectory,
};
use crate::domain::{Page, PageRequest};

#[derive(Default)]
pub struct MemoryState {
    pub users: HashMap<Uuid, UserView>,
    pub products: HashMap<Uuid, ProductView>,
    pub carts: HashMap<Uuid, Vec<CartLine>>,
    pub orders: Vec<OrderView>,
    pub payments: Vec<PaymentView>,
    pub deliveries: Vec<DeliveryView>,
    pub notifications: Vec<NotificationView>,
    pub outbox: Vec<DomainEvent>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

fn paginate<T: Clone>(items: Vec<T>, page: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .collect();
    Page { items, total }
}

impl MemoryStore {
    pub fn with<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub fn add_user(&self, role: Role) -> UserView {
        let id = Uuid::new_v4();
        let user = UserView {
            id,
            full_name: format!("User {}", &id.simple().to_string()[..6]),
            email: format!("{id}@campus.test"),
            phone: format!("2547{:08}", id.as_u128() % 100_000_000),
            role,
            is_approved: role == Role::Vendor,
        };
        self.with(|s| s.users.insert(id, user.clone()));
        user
    }

    pub fn add_product(&self, vendor_id: Uuid, price: &str, stock: i32) -> ProductView {
        let product = ProductView {
            id: Uuid::new_v4(),
            vendor_id,
            name: "Chapati".to_string(),
            price: BigDecimal::from_str(price).unwrap(),
            quantity: stock,
            category: "food".to_string(),
        };
        self.with(|s| s.products.insert(product.id, product.clone()));
        product
    }

    pub fn user(&self, id: Uuid) -> UserView {
        self.with(|s| s.users.get(&id).cloned().unwrap())
    }

    pub fn set_price(&self, product_id: Uuid, price: &str) {
        self.with(|s| {
            if let Some(p) = s.products.get_mut(&product_id) {
                p.price = BigDecimal::from_str(price).unwrap();
            }
        });
    }

    pub fn cart(&self, customer_id: Uuid) -> Vec<CartLine> {
        self.with(|s| s.carts.get(&customer_id).cloned().unwrap_or_default())
    }

    pub fn order_count(&self) -> usize {
        self.with(|s| s.orders.len())
    }

    pub fn notification_count(&self) -> usize {
        self.with(|s| s.notifications.len())
    }

    pub fn notifications_for(&self, recipient_id: Uuid) -> Vec<NotificationView> {
        self.with(|s| {
            s.notifications
                .iter()
                .filter(|n| n.recipient_id == recipient_id)
                .cloned()
                .collect()
        })
    }

    pub fn outbox(&self) -> Vec<DomainEvent> {
        self.with(|s| s.outbox.clone())
    }

    pub fn payment(&self, id: Uuid) -> PaymentView {
        self.with(|s| s.payments.iter().find(|p| p.id == id).cloned().unwrap())
    }

    pub fn order(&self, id: Uuid) -> OrderView {
        self.with(|s| s.orders.iter().find(|o| o.id == id).cloned().unwrap())
    }

    pub fn deliveries_for(&self, order_id: Uuid) -> Vec<DeliveryView> {
        self.with(|s| {
            s.deliveries
                .iter()
                .filter(|d| d.order_id == order_id)
                .cloned()
                .collect()
        })
    }
}

impl CatalogReader for MemoryStore {
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        Ok(self.with(|s| s.products.get(&id).cloned()))
    }

    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<ProductView>, DomainError> {
        Ok(self.with(|s| ids.iter().filter_map(|id| s.products.get(id).cloned()).collect()))
    }
}

impl UserDirectory for MemoryStore {
    fn find_user(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
        Ok(self.with(|s| s.users.get(&id).cloned()))
    }
}

impl CartRepository for MemoryStore {
    fn lines(&self, customer_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        Ok(self.cart(customer_id))
    }

    fn put(&self, customer_id: Uuid, line: CartLine) -> Result<(), DomainError> {
        self.with(|s| {
            let cart = s.carts.entry(customer_id).or_default();
            match cart.iter_mut().find(|l| l.product_id == line.product_id) {
                Some(existing) => existing.quantity = line.quantity,
                None => cart.push(line),
            }
        });
        Ok(())
    }

    fn remove(&self, customer_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.with(|s| {
            let cart = s.carts.entry(customer_id).or_default();
            let before = cart.len();
            cart.retain(|l| l.product_id != product_id);
            cart.len() != before
        }))
    }

    fn clear(&self, customer_id: Uuid) -> Result<(), DomainError> {
        self.with(|s| s.carts.remove(&customer_id));
        Ok(())
    }
}

impl OrderRepository for MemoryStore {
    fn place_from_cart(&self, customer_id: Uuid) -> Result<OrderView, DomainError> {
        self.with(|s| {
            let cart = s.carts.get(&customer_id).cloned().unwrap_or_default();
            let priced = price_cart(&cart, &s.products)?;
            let order = OrderView {
                id: Uuid::new_v4(),
                customer_id,
                total_price: priced.total_price,
                status: OrderStatus::InProgress,
                created_at: Utc::now(),
                lines: priced
                    .lines
                    .into_iter()
                    .map(|l| OrderLineView {
                        id: Uuid::new_v4(),
                        product_id: l.product_id,
                        vendor_id: l.vendor_id,
                        quantity: l.quantity,
                        unit_price: l.unit_price,
                    })
                    .collect(),
            };
            s.carts.remove(&customer_id);
            s.outbox.push(DomainEvent::order_placed(&order));
            s.orders.push(order.clone());
            Ok(order)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        Ok(self.with(|s| s.orders.iter().find(|o| o.id == id).cloned()))
    }

    fn list(&self, scope: OrderScope, page: PageRequest) -> Result<Page<OrderView>, DomainError> {
        let visible = self.with(|s| {
            s.orders
                .iter()
                .rev()
                .filter(|o| scope.admits(o))
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(paginate(visible, page))
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        self.with(|s| {
            let order = s
                .orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or_else(|| DomainError::NotFound("Order".to_string()))?;
            order.status = status;
            let order = order.clone();
            s.outbox.push(DomainEvent::order_status_changed(&order));
            Ok(order)
        })
    }
}

impl PaymentRepository for MemoryStore {
    fn has_completed(&self, order_id: Uuid) -> Result<bool, DomainError> {
        Ok(self.with(|s| {
            s.payments
                .iter()
                .any(|p| p.order_id == order_id && p.status == PaymentStatus::Completed)
        }))
    }

    fn create_pending(
        &self,
        order_id: Uuid,
        amount: BigDecimal,
        phone_number: &str,
    ) -> Result<PaymentView, DomainError> {
        let payment = PaymentView {
            id: Uuid::new_v4(),
            order_id,
            amount,
            status: PaymentStatus::Pending,
            transaction_code: None,
            phone_number: phone_number.to_string(),
            checkout_request_id: None,
            result_description: None,
            created_at: Utc::now(),
        };
        self.with(|s| s.payments.push(payment.clone()));
        Ok(payment)
    }

    fn record_checkout(&self, id: Uuid, checkout_request_id: &str) -> Result<(), DomainError> {
        self.with(|s| {
            if let Some(p) = s.payments.iter_mut().find(|p| p.id == id) {
                p.checkout_request_id = Some(checkout_request_id.to_string());
            }
        });
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentView>, DomainError> {
        Ok(self.with(|s| s.payments.iter().find(|p| p.id == id).cloned()))
    }

    fn settle(&self, id: Uuid, outcome: SettlementOutcome) -> Result<Settlement, DomainError> {
        self.with(|s| {
            let current = s
                .payments
                .iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or_else(|| DomainError::NotFound("Payment".to_string()))?;
            if current.status.is_terminal() {
                return Ok(Settlement::AlreadySettled(current));
            }

            if let SettlementOutcome::Completed { transaction_code } = &outcome {
                let clash = s.payments.iter().any(|p| {
                    p.transaction_code.as_deref() == Some(transaction_code.as_str())
                        || (p.order_id == current.order_id
                            && p.status == PaymentStatus::Completed)
                });
                if clash {
                    return Err(DomainError::Conflict(
                        "payment already recorded".to_string(),
                    ));
                }
            }

            let payment = s.payments.iter_mut().find(|p| p.id == id).unwrap();
            match outcome {
                SettlementOutcome::Completed { transaction_code } => {
                    payment.status = PaymentStatus::Completed;
                    payment.transaction_code = Some(transaction_code);
                }
                SettlementOutcome::Failed { description } => {
                    payment.status = PaymentStatus::Failed;
                    payment.result_description = description;
                }
            }
            let payment = payment.clone();

            let order = s
                .orders
                .iter_mut()
                .find(|o| o.id == payment.order_id)
                .ok_or_else(|| DomainError::NotFound("Order".to_string()))?;
            if payment.status == PaymentStatus::Completed {
                order.status = OrderStatus::InProgress;
            }
            let customer_id = order.customer_id;
            if let Some(event) = DomainEvent::payment_settled(&payment, customer_id) {
                s.outbox.push(event);
            }
            Ok(Settlement::Applied {
                payment,
                customer_id,
            })
        })
    }
}

impl DeliveryRepository for MemoryStore {
    fn assign(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        courier_id: Uuid,
    ) -> Result<Assignment, DomainError> {
        self.with(|s| {
            let now = Utc::now();
            let assignment = match s.deliveries.iter_mut().find(|d| d.order_id == order_id) {
                Some(existing) => {
                    let previous_courier = existing.courier_id.replace(courier_id);
                    existing.updated_at = now;
                    Assignment {
                        delivery: existing.clone(),
                        created: false,
                        previous_courier,
                    }
                }
                None => {
                    let delivery = DeliveryView {
                        id: Uuid::new_v4(),
                        order_id,
                        courier_id: Some(courier_id),
                        status: DeliveryStatus::Pending,
                        location: String::new(),
                        assigned_at: now,
                        updated_at: now,
                    };
                    s.deliveries.push(delivery.clone());
                    Assignment {
                        delivery,
                        created: true,
                        previous_courier: None,
                    }
                }
            };
            if assignment.changed_courier() {
                if let Some(event) =
                    DomainEvent::delivery_assigned(&assignment.delivery, customer_id)
                {
                    s.outbox.push(event);
                }
            }
            Ok(assignment)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryView>, DomainError> {
        Ok(self.with(|s| s.deliveries.iter().find(|d| d.id == id).cloned()))
    }

    fn list(
        &self,
        scope: DeliveryScope,
        page: PageRequest,
    ) -> Result<Page<DeliveryView>, DomainError> {
        let visible = self.with(|s| {
            s.deliveries
                .iter()
                .rev()
                .filter(|d| match scope {
                    DeliveryScope::All => true,
                    DeliveryScope::AssignedTo(courier) => d.courier_id == Some(courier),
                })
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(paginate(visible, page))
    }

    fn update_status(
        &self,
        id: Uuid,
        customer_id: Uuid,
        status: DeliveryStatus,
        location: Option<String>,
    ) -> Result<DeliveryView, DomainError> {
        self.with(|s| {
            let delivery = s
                .deliveries
                .iter_mut()
                .find(|d| d.id == id)
                .ok_or_else(|| DomainError::NotFound("Delivery".to_string()))?;
            delivery.status = status;
            if let Some(location) = location {
                delivery.location = location;
            }
            delivery.updated_at = Utc::now();
            let delivery = delivery.clone();
            s.outbox
                .push(DomainEvent::delivery_status_changed(&delivery, customer_id));
            Ok(delivery)
        })
    }
}

impl NotificationRepository for MemoryStore {
    fn record(&self, n: NewNotification) -> Result<NotificationView, DomainError> {
        let view = NotificationView {
            id: Uuid::new_v4(),
            recipient_id: n.recipient_id,
            kind: n.kind,
            channel: n.channel,
            message: n.message,
            phone_number: n.phone_number,
            status: n.status,
            created_at: Utc::now(),
        };
        self.with(|s| s.notifications.push(view.clone()));
        Ok(view)
    }

    fn list(
        &self,
        scope: NotificationScope,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, DomainError> {
        let visible = self.with(|s| {
            s.notifications
                .iter()
                .rev()
                .filter(|n| match scope {
                    NotificationScope::All => true,
                    NotificationScope::RecipientIs(id) => n.recipient_id == id,
                })
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(paginate(visible, page))
    }
}

// ── Outbound doubles ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSms {
    fail: bool,
    delay: Option<Duration>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingSms {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// (message, phone) pairs that were accepted.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send(&self, message: &str, phone_number: &str) -> Result<(), TransportError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(TransportError::Failed("gateway unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((message.to_string(), phone_number.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingRealtime {
    pushed: Mutex<Vec<(Uuid, RealtimeMessage)>>,
}

impl RecordingRealtime {
    pub fn pushed(&self) -> Vec<(Uuid, RealtimeMessage)> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl RealtimeChannel for RecordingRealtime {
    async fn push(&self, recipient_id: Uuid, message: RealtimeMessage) -> Result<(), TransportError> {
        self.pushed.lock().unwrap().push((recipient_id, message));
        Ok(())
    }
}

pub struct StubProvider {
    token_fails: bool,
    push_fails: bool,
    ack: PushAck,
    requests: Mutex<Vec<PushRequest>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self {
            token_fails: false,
            push_fails: false,
            ack: PushAck {
                accepted: true,
                checkout_request_id: Some("ws_CO_0001".to_string()),
                description: Some("Success. Request accepted for processing".to_string()),
            },
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl StubProvider {
    pub fn without_token() -> Self {
        Self {
            token_fails: true,
            ..Self::default()
        }
    }

    pub fn unreachable_push() -> Self {
        Self {
            push_fails: true,
            ..Self::default()
        }
    }

    pub fn rejecting(description: &str) -> Self {
        Self {
            ack: PushAck {
                accepted: false,
                checkout_request_id: None,
                description: Some(description.to_string()),
            },
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<PushRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for StubProvider {
    async fn access_token(&self) -> Result<String, TransportError> {
        if self.token_fails {
            Err(TransportError::Failed("401 Unauthorized".to_string()))
        } else {
            Ok("token-123".to_string())
        }
    }

    async fn push_payment(
        &self,
        _access_token: &str,
        request: &PushRequest,
    ) -> Result<PushAck, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.push_fails {
            return Err(TransportError::Failed("connection reset".to_string()));
        }
        Ok(self.ack.clone())
    }
}

// ── Wiring ──────────────────────────────────────────────────────────────────

pub const CALLBACK_BASE: &str = "https://market.test";

/// Every service wired to one shared in-memory store.
pub struct Harness {
    pub store: MemoryStore,
    pub sms: Arc<RecordingSms>,
    pub realtime: Arc<RecordingRealtime>,
    pub provider: Arc<StubProvider>,
    pub notifier: Arc<NotificationService>,
    pub carts: CartService,
    pub orders: OrderService,
    pub payments: PaymentService,
    pub deliveries: DeliveryService,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(RecordingSms::default(), StubProvider::default(), None)
    }

    pub fn with_sms(sms: RecordingSms) -> Self {
        Self::build(sms, StubProvider::default(), None)
    }

    pub fn with_provider(provider: StubProvider) -> Self {
        Self::build(RecordingSms::default(), provider, None)
    }

    pub fn with_callback_token(token: &str) -> Self {
        Self::build(
            RecordingSms::default(),
            StubProvider::default(),
            Some(token.to_string()),
        )
    }

    fn build(sms: RecordingSms, provider: StubProvider, callback_token: Option<String>) -> Self {
        let store = MemoryStore::default();
        let shared = Arc::new(store.clone());
        let sms = Arc::new(sms);
        let realtime = Arc::new(RecordingRealtime::default());
        let provider = Arc::new(provider);
        let timeout = Duration::from_millis(200);

        let notifier = Arc::new(NotificationService::new(
            shared.clone(),
            shared.clone(),
            sms.clone(),
            realtime.clone(),
            timeout,
        ));
        let carts = CartService::new(shared.clone(), shared.clone());
        let orders = OrderService::new(shared.clone(), notifier.clone());
        let payments = PaymentService::new(
            shared.clone(),
            shared.clone(),
            provider.clone(),
            notifier.clone(),
            PaymentSettings {
                callback_base_url: CALLBACK_BASE.to_string(),
                callback_token,
                timeout,
            },
        );
        let deliveries = DeliveryService::new(
            shared.clone(),
            shared.clone(),
            shared.clone(),
            notifier.clone(),
        );

        Self {
            store,
            sms,
            realtime,
            provider,
            notifier,
            carts,
            orders,
            payments,
            deliveries,
        }
    }

    /// A customer whose cart already holds `lines` of (price, quantity).
    pub fn customer_with_cart(&self, lines: &[(&str, i32)]) -> (UserView, Vec<ProductView>) {
        let customer = self.store.add_user(Role::Customer);
        let vendor = self.store.add_user(Role::Vendor);
        let mut products = Vec::new();
        for (price, quantity) in lines {
            let product = self.store.add_product(vendor.id, price, 50);
            CartRepository::put(
                &self.store,
                customer.id,
                CartLine {
                    product_id: product.id,
                    quantity: *quantity,
                },
            )
            .unwrap();
            products.push(product);
        }
        (customer, products)
    }
}
