use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::catalog::{CartLine, ProductView};
use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    InProgress,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(OrderStatus::InProgress),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown order status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderLineView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub total_price: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    pub fn has_vendor(&self, vendor_id: Uuid) -> bool {
        self.lines.iter().any(|l| l.vendor_id == vendor_id)
    }
}

/// One line of an order about to be written, price already snapshotted.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total_price: BigDecimal,
}

/// Resolves a cart snapshot against the catalog and computes the order total.
///
/// Fails with `Validation` on an empty cart or a non-positive quantity and
/// with `NotFound` when a product is missing from `catalog`.
pub fn price_cart(
    cart: &[CartLine],
    catalog: &HashMap<Uuid, ProductView>,
) -> Result<PricedOrder, DomainError> {
    if cart.is_empty() {
        return Err(DomainError::Validation("Cart is empty".to_string()));
    }

    let mut total = BigDecimal::zero();
    let mut lines = Vec::with_capacity(cart.len());
    for item in cart {
        if item.quantity <= 0 {
            return Err(DomainError::Validation(format!(
                "quantity for product {} must be positive",
                item.product_id
            )));
        }
        let product = catalog
            .get(&item.product_id)
            .ok_or_else(|| DomainError::NotFound(format!("Product {}", item.product_id)))?;

        total += &product.price * BigDecimal::from(item.quantity);
        lines.push(PricedLine {
            product_id: product.id,
            vendor_id: product.vendor_id,
            quantity: item.quantity,
            unit_price: product.price.clone(),
        });
    }

    Ok(PricedOrder {
        lines,
        total_price: total,
    })
}
