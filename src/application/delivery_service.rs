use std::sync::Arc;

use uuid::Uuid;

use super::{blocking, NotificationService};
use crate::domain::access::{can_update_delivery, Actor, DeliveryScope, Role};
use crate::domain::delivery::{DeliveryStatus, DeliveryView};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::ports::{DeliveryRepository, OrderRepository, UserDirectory};
use crate::domain::{Page, PageRequest};

pub struct DeliveryService {
    orders: Arc<dyn OrderRepository>,
    deliveries: Arc<dyn DeliveryRepository>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<NotificationService>,
}

impl DeliveryService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        deliveries: Arc<dyn DeliveryRepository>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<NotificationService>,
    ) -> Self {
        Self {
            orders,
            deliveries,
            users,
            notifier,
        }
    }

    /// Puts `courier_id` on the order's delivery, creating it on first use.
    ///
    /// An order has at most one delivery. Re-assigning the same courier
    /// changes nothing and notifies nobody.
    pub async fn assign(
        &self,
        actor: &Actor,
        order_id: Uuid,
        courier_id: Uuid,
    ) -> Result<DeliveryView, DomainError> {
        actor.require(Role::Admin)?;

        let orders = self.orders.clone();
        let users = self.users.clone();
        let deliveries = self.deliveries.clone();
        let (assignment, customer_id) = blocking(move || {
            let order = orders
                .find_by_id(order_id)?
                .ok_or_else(|| DomainError::NotFound("Order".to_string()))?;
            users
                .find_user(courier_id)?
                .filter(|u| u.role == Role::Courier)
                .ok_or_else(|| DomainError::NotFound("Courier".to_string()))?;
            let assignment = deliveries.assign(order.id, order.customer_id, courier_id)?;
            Ok((assignment, order.customer_id))
        })
        .await?;

        if !assignment.changed_courier() {
            log::debug!(
                "Courier {} already assigned to delivery {}",
                courier_id,
                assignment.delivery.id
            );
            return Ok(assignment.delivery);
        }

        log::info!(
            "Delivery {} for order {} assigned to courier {}",
            assignment.delivery.id,
            order_id,
            courier_id
        );
        if let Some(event) = DomainEvent::delivery_assigned(&assignment.delivery, customer_id) {
            self.notifier.dispatch(&event).await;
        }
        Ok(assignment.delivery)
    }

    pub async fn update_status(
        &self,
        actor: &Actor,
        id: Uuid,
        status: DeliveryStatus,
        location: Option<String>,
    ) -> Result<DeliveryView, DomainError> {
        let deliveries = self.deliveries.clone();
        let delivery = blocking(move || deliveries.find_by_id(id))
            .await?
            .ok_or_else(|| DomainError::NotFound("Delivery".to_string()))?;
        if !can_update_delivery(actor, &delivery) {
            return Err(DomainError::PermissionDenied(
                "only the assigned courier may update this delivery".to_string(),
            ));
        }

        let customer_id = self.customer_of(delivery.order_id).await?;
        let deliveries = self.deliveries.clone();
        let updated =
            blocking(move || deliveries.update_status(id, customer_id, status, location)).await?;
        log::info!(
            "Delivery {} moved from {} to {} by {}",
            id,
            delivery.status,
            updated.status,
            actor.id
        );
        self.notifier
            .dispatch(&DomainEvent::delivery_status_changed(&updated, customer_id))
            .await;
        Ok(updated)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<Page<DeliveryView>, DomainError> {
        let scope = DeliveryScope::for_actor(actor)?;
        let deliveries = self.deliveries.clone();
        blocking(move || deliveries.list(scope, page)).await
    }

    async fn customer_of(&self, order_id: Uuid) -> Result<Uuid, DomainError> {
        let orders = self.orders.clone();
        blocking(move || orders.find_by_id(order_id))
            .await?
            .map(|o| o.customer_id)
            .ok_or_else(|| DomainError::NotFound("Order".to_string()))
    }
}
