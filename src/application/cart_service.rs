use std::collections::HashMap;
use std::sync::Arc;

use bigdecimal::{BigDecimal, Zero};
use uuid::Uuid;

use super::blocking;
use crate::domain::access::{Actor, Role};
use crate::domain::catalog::{CartLine, CartLineView, CartView, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, CatalogReader};

pub struct CartService {
    carts: Arc<dyn CartRepository>,
    catalog: Arc<dyn CatalogReader>,
}

impl CartService {
    pub fn new(carts: Arc<dyn CartRepository>, catalog: Arc<dyn CatalogReader>) -> Self {
        Self { carts, catalog }
    }

    pub async fn view(&self, actor: &Actor) -> Result<CartView, DomainError> {
        actor.require(Role::Customer)?;
        let carts = self.carts.clone();
        let catalog = self.catalog.clone();
        let customer_id = actor.id;
        blocking(move || {
            let lines = carts.lines(customer_id)?;
            let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
            let products = catalog.find_products(&ids)?;
            Ok(render(&lines, products))
        })
        .await
    }

    /// Adds `quantity` units on top of whatever the cart already holds.
    pub async fn add_item(
        &self,
        actor: &Actor,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        actor.require(Role::Customer)?;
        if quantity <= 0 {
            return Err(DomainError::Validation(
                "quantity must be at least 1".to_string(),
            ));
        }
        let carts = self.carts.clone();
        let catalog = self.catalog.clone();
        let customer_id = actor.id;
        blocking(move || {
            let product = find_product(catalog.as_ref(), product_id)?;
            let held = carts
                .lines(customer_id)?
                .iter()
                .find(|l| l.product_id == product_id)
                .map_or(0, |l| l.quantity);
            let wanted = held.saturating_add(quantity);
            check_stock(&product, wanted)?;
            carts.put(
                customer_id,
                CartLine {
                    product_id,
                    quantity: wanted,
                },
            )
        })
        .await?;
        self.view(actor).await
    }

    /// Sets the quantity of a line outright; zero removes it.
    pub async fn set_quantity(
        &self,
        actor: &Actor,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        actor.require(Role::Customer)?;
        if quantity < 0 {
            return Err(DomainError::Validation(
                "quantity cannot be negative".to_string(),
            ));
        }
        if quantity == 0 {
            return self.remove_item(actor, product_id).await;
        }
        let carts = self.carts.clone();
        let catalog = self.catalog.clone();
        let customer_id = actor.id;
        blocking(move || {
            let product = find_product(catalog.as_ref(), product_id)?;
            check_stock(&product, quantity)?;
            carts.put(
                customer_id,
                CartLine {
                    product_id,
                    quantity,
                },
            )
        })
        .await?;
        self.view(actor).await
    }

    pub async fn remove_item(
        &self,
        actor: &Actor,
        product_id: Uuid,
    ) -> Result<CartView, DomainError> {
        actor.require(Role::Customer)?;
        let carts = self.carts.clone();
        let customer_id = actor.id;
        let removed = blocking(move || carts.remove(customer_id, product_id)).await?;
        if !removed {
            return Err(DomainError::NotFound("Cart item".to_string()));
        }
        self.view(actor).await
    }

    pub async fn clear(&self, actor: &Actor) -> Result<CartView, DomainError> {
        actor.require(Role::Customer)?;
        let carts = self.carts.clone();
        let customer_id = actor.id;
        blocking(move || carts.clear(customer_id)).await?;
        Ok(CartView {
            lines: Vec::new(),
            total: BigDecimal::zero(),
        })
    }
}

fn find_product(catalog: &dyn CatalogReader, id: Uuid) -> Result<ProductView, DomainError> {
    catalog
        .find_product(id)?
        .ok_or_else(|| DomainError::NotFound(format!("Product {id}")))
}

fn check_stock(product: &ProductView, wanted: i32) -> Result<(), DomainError> {
    if wanted > product.quantity {
        return Err(DomainError::Validation(format!(
            "not enough stock for {}: {} available",
            product.name, product.quantity
        )));
    }
    Ok(())
}

/// Prices the cart at current catalog prices. Lines whose product has left
/// the catalog are omitted; checkout reports them.
fn render(lines: &[CartLine], products: Vec<ProductView>) -> CartView {
    let products: HashMap<Uuid, ProductView> = products.into_iter().map(|p| (p.id, p)).collect();
    let mut total = BigDecimal::zero();
    let mut rendered = Vec::with_capacity(lines.len());
    for line in lines {
        let Some(product) = products.get(&line.product_id) else {
            log::warn!("Cart references missing product {}", line.product_id);
            continue;
        };
        let subtotal = &product.price * BigDecimal::from(line.quantity);
        total += &subtotal;
        rendered.push(CartLineView {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price.clone(),
            quantity: line.quantity,
            subtotal,
        });
    }
    CartView {
        lines: rendered,
        total,
    }
}
