//! Domain events emitted by the ledger, the payment adapter and delivery
//! assignment. Each one is appended to the outbox in the transaction that
//! caused it and handed to the notification fan-out after commit.

use bigdecimal::BigDecimal;
use serde::Serialize;
use uuid::Uuid;

use super::delivery::{DeliveryStatus, DeliveryView};
use super::order::{OrderStatus, OrderView};
use super::payment::PaymentView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced {
        order_id: Uuid,
        customer_id: Uuid,
        total_price: BigDecimal,
    },
    OrderStatusChanged {
        order_id: Uuid,
        customer_id: Uuid,
        status: OrderStatus,
    },
    PaymentCompleted {
        payment_id: Uuid,
        order_id: Uuid,
        customer_id: Uuid,
        amount: BigDecimal,
        transaction_code: String,
    },
    PaymentFailed {
        payment_id: Uuid,
        order_id: Uuid,
        description: Option<String>,
    },
    DeliveryAssigned {
        delivery_id: Uuid,
        order_id: Uuid,
        customer_id: Uuid,
        courier_id: Uuid,
    },
    DeliveryStatusChanged {
        delivery_id: Uuid,
        order_id: Uuid,
        customer_id: Uuid,
        status: DeliveryStatus,
        location: String,
    },
}

impl DomainEvent {
    pub fn order_placed(order: &OrderView) -> Self {
        DomainEvent::OrderPlaced {
            order_id: order.id,
            customer_id: order.customer_id,
            total_price: order.total_price.clone(),
        }
    }

    pub fn order_status_changed(order: &OrderView) -> Self {
        DomainEvent::OrderStatusChanged {
            order_id: order.id,
            customer_id: order.customer_id,
            status: order.status,
        }
    }

    /// `None` while the payment is not in a terminal state.
    pub fn payment_settled(payment: &PaymentView, customer_id: Uuid) -> Option<Self> {
        use super::payment::PaymentStatus;

        match payment.status {
            PaymentStatus::Completed => Some(DomainEvent::PaymentCompleted {
                payment_id: payment.id,
                order_id: payment.order_id,
                customer_id,
                amount: payment.amount.clone(),
                transaction_code: payment.transaction_code.clone().unwrap_or_default(),
            }),
            PaymentStatus::Failed => Some(DomainEvent::PaymentFailed {
                payment_id: payment.id,
                order_id: payment.order_id,
                description: payment.result_description.clone(),
            }),
            PaymentStatus::Pending => None,
        }
    }

    /// `None` for a delivery without a courier.
    pub fn delivery_assigned(delivery: &DeliveryView, customer_id: Uuid) -> Option<Self> {
        Some(DomainEvent::DeliveryAssigned {
            delivery_id: delivery.id,
            order_id: delivery.order_id,
            customer_id,
            courier_id: delivery.courier_id?,
        })
    }

    pub fn delivery_status_changed(delivery: &DeliveryView, customer_id: Uuid) -> Self {
        DomainEvent::DeliveryStatusChanged {
            delivery_id: delivery.id,
            order_id: delivery.order_id,
            customer_id,
            status: delivery.status,
            location: delivery.location.clone(),
        }
    }

    pub fn aggregate_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced { .. } | DomainEvent::OrderStatusChanged { .. } => "Order",
            DomainEvent::PaymentCompleted { .. } | DomainEvent::PaymentFailed { .. } => "Payment",
            DomainEvent::DeliveryAssigned { .. } | DomainEvent::DeliveryStatusChanged { .. } => {
                "Delivery"
            }
        }
    }

    pub fn aggregate_id(&self) -> Uuid {
        match self {
            DomainEvent::OrderPlaced { order_id, .. }
            | DomainEvent::OrderStatusChanged { order_id, .. } => *order_id,
            DomainEvent::PaymentCompleted { payment_id, .. }
            | DomainEvent::PaymentFailed { payment_id, .. } => *payment_id,
            DomainEvent::DeliveryAssigned { delivery_id, .. }
            | DomainEvent::DeliveryStatusChanged { delivery_id, .. } => *delivery_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::OrderPlaced { .. } => "OrderPlaced",
            DomainEvent::OrderStatusChanged { .. } => "OrderStatusChanged",
            DomainEvent::PaymentCompleted { .. } => "PaymentCompleted",
            DomainEvent::PaymentFailed { .. } => "PaymentFailed",
            DomainEvent::DeliveryAssigned { .. } => "DeliveryAssigned",
            DomainEvent::DeliveryStatusChanged { .. } => "DeliveryStatusChanged",
        }
    }
}
