use std::sync::Arc;

use uuid::Uuid;

use super::{blocking, NotificationService};
use crate::domain::access::{can_manage_order, can_view_order, Actor, OrderScope, Role};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::order::{OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;
use crate::domain::{Page, PageRequest};

pub struct OrderService {
    orders: Arc<dyn OrderRepository>,
    notifier: Arc<NotificationService>,
}

impl OrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, notifier: Arc<NotificationService>) -> Self {
        Self { orders, notifier }
    }

    /// Checks the caller's cart out into a new order.
    pub async fn place_order(&self, actor: &Actor) -> Result<OrderView, DomainError> {
        actor.require(Role::Customer)?;
        let orders = self.orders.clone();
        let customer_id = actor.id;
        let order = blocking(move || orders.place_from_cart(customer_id)).await?;

        log::info!(
            "Order {} placed by {} for {}",
            order.id,
            order.customer_id,
            order.total_price
        );
        self.notifier
            .dispatch(&DomainEvent::order_placed(&order))
            .await;
        Ok(order)
    }

    /// Orders outside the caller's scope are reported as missing.
    pub async fn get_order(&self, actor: &Actor, id: Uuid) -> Result<OrderView, DomainError> {
        let order = self.load(id).await?;
        if !can_view_order(actor, &order) {
            return Err(DomainError::NotFound("Order".to_string()));
        }
        Ok(order)
    }

    pub async fn list_orders(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<Page<OrderView>, DomainError> {
        let scope = OrderScope::for_actor(actor);
        if scope == OrderScope::Nothing {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
            });
        }
        let orders = self.orders.clone();
        blocking(move || orders.list(scope, page)).await
    }

    /// Any status may follow any other; only the caller's role is checked.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<OrderView, DomainError> {
        let order = self.load(id).await?;
        if !can_manage_order(actor, &order) {
            return Err(DomainError::PermissionDenied(
                "only administrators and vendors of this order may change its status"
                    .to_string(),
            ));
        }
        let orders = self.orders.clone();
        let updated = blocking(move || orders.update_status(id, status)).await?;
        log::info!(
            "Order {} moved from {} to {} by {}",
            id,
            order.status,
            updated.status,
            actor.id
        );
        Ok(updated)
    }

    async fn load(&self, id: Uuid) -> Result<OrderView, DomainError> {
        let orders = self.orders.clone();
        blocking(move || orders.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::NotFound("Order".to_string()))
    }
}
