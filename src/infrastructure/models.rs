use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::catalog::{ProductView, UserView};
use crate::domain::delivery::DeliveryView;
use crate::domain::errors::DomainError;
use crate::domain::notification::NotificationView;
use crate::domain::order::{OrderLineView, OrderView};
use crate::domain::payment::PaymentView;
use crate::schema::{
    cart_items, deliveries, marketplace_outbox, notifications, order_lines, orders, payments,
    products, users,
};

// ── Collaborators ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub is_approved: bool,
}

impl TryFrom<UserRow> for UserView {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserView {
            id: row.id,
            full_name: row.full_name,
            email: row.email,
            phone: row.phone,
            role: row.role.parse()?,
            is_approved: row.is_approved,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub quantity: i32,
    pub category: String,
}

impl From<ProductRow> for ProductView {
    fn from(row: ProductRow) -> Self {
        ProductView {
            id: row.id,
            vendor_id: row.vendor_id,
            name: row.name,
            price: row.price,
            quantity: row.quantity,
            category: row.category,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub customer_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

// ── Orders ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderRow {
    pub fn into_view(self, lines: Vec<OrderLineRow>) -> Result<OrderView, DomainError> {
        Ok(OrderView {
            id: self.id,
            customer_id: self.customer_id,
            total_price: self.total_price,
            status: self.status.parse().map_err(|_| {
                DomainError::Internal(format!("order {} has status '{}'", self.id, self.status))
            })?,
            created_at: self.created_at,
            lines: lines
                .into_iter()
                .map(|l| OrderLineView {
                    id: l.id,
                    product_id: l.product_id,
                    vendor_id: l.vendor_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_price: BigDecimal,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_lines)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_lines)]
pub struct NewOrderLineRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

// ── Payments ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub transaction_code: Option<String>,
    pub phone_number: String,
    pub checkout_request_id: Option<String>,
    pub result_description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentView {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        Ok(PaymentView {
            id: row.id,
            order_id: row.order_id,
            amount: row.amount,
            status: row.status.parse()?,
            transaction_code: row.transaction_code,
            phone_number: row.phone_number,
            checkout_request_id: row.checkout_request_id,
            result_description: row.result_description,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub status: String,
    pub phone_number: String,
}

/// Columns written when a pending payment reaches its outcome.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = payments)]
pub struct SettlementChanges {
    pub status: String,
    pub transaction_code: Option<String>,
    pub result_description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ── Deliveries ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = deliveries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeliveryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub status: String,
    pub location: String,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DeliveryRow> for DeliveryView {
    type Error = DomainError;

    fn try_from(row: DeliveryRow) -> Result<Self, Self::Error> {
        Ok(DeliveryView {
            id: row.id,
            order_id: row.order_id,
            courier_id: row.courier_id,
            status: row.status.parse().map_err(|_| {
                DomainError::Internal(format!("delivery {} has status '{}'", row.id, row.status))
            })?,
            location: row.location,
            assigned_at: row.assigned_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = deliveries)]
pub struct NewDeliveryRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub status: String,
}

// ── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: String,
    pub channel: String,
    pub message: String,
    pub phone_number: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for NotificationView {
    type Error = DomainError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(NotificationView {
            id: row.id,
            recipient_id: row.recipient_id,
            kind: row.notification_type.parse()?,
            channel: row.channel.parse()?,
            message: row.message,
            phone_number: row.phone_number,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = notifications)]
pub struct NewNotificationRow {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub notification_type: String,
    pub channel: String,
    pub message: String,
    pub phone_number: Option<String>,
    pub status: String,
}

// ── Outbox ──────────────────────────────────────────────────────────────────

/// An outbox row as stored. Only tests read the outbox back.
#[cfg(test)]
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = marketplace_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = marketplace_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
