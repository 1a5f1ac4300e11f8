use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::access::{Actor, Role};

/// A catalog entry as the order ledger sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductView {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    /// Units in stock.
    pub quantity: i32,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserView {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub is_approved: bool,
}

impl UserView {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            role: self.role,
            approved: self.is_approved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CartLineView {
    pub product_id: Uuid,
    pub name: String,
    pub unit_price: BigDecimal,
    pub quantity: i32,
    pub subtotal: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: BigDecimal,
}
