//! Who may see and change what.
//!
//! Every role check in the service goes through this module: handlers and
//! services ask for a scope or a capability instead of branching on roles
//! themselves.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

use super::delivery::DeliveryView;
use super::errors::DomainError;
use super::order::OrderView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Customer,
    Vendor,
    Courier,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Vendor => "vendor",
            Role::Courier => "delivery_person",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "vendor" => Ok(Role::Vendor),
            "delivery_person" => Ok(Role::Courier),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::Internal(format!("unknown role '{other}'"))),
        }
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    /// Only meaningful for vendors.
    pub approved: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    fn is_approved_vendor(&self) -> bool {
        self.role == Role::Vendor && self.approved
    }

    /// Fails with `PermissionDenied` unless the actor holds `role`.
    pub fn require(&self, role: Role) -> Result<(), DomainError> {
        if self.role == role {
            Ok(())
        } else {
            Err(DomainError::PermissionDenied(format!(
                "requires the {role} role"
            )))
        }
    }
}

/// The set of orders an actor may read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    PlacedBy(Uuid),
    ContainingVendor(Uuid),
    Nothing,
}

impl OrderScope {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::Admin => OrderScope::All,
            Role::Customer => OrderScope::PlacedBy(actor.id),
            Role::Vendor if actor.approved => OrderScope::ContainingVendor(actor.id),
            Role::Vendor | Role::Courier => OrderScope::Nothing,
        }
    }

    pub fn admits(&self, order: &OrderView) -> bool {
        match *self {
            OrderScope::All => true,
            OrderScope::PlacedBy(customer) => order.customer_id == customer,
            OrderScope::ContainingVendor(vendor) => order.has_vendor(vendor),
            OrderScope::Nothing => false,
        }
    }
}

pub fn can_view_order(actor: &Actor, order: &OrderView) -> bool {
    OrderScope::for_actor(actor).admits(order)
}

/// Admins, and approved vendors selling at least one line of the order.
pub fn can_manage_order(actor: &Actor, order: &OrderView) -> bool {
    actor.is_admin() || (actor.is_approved_vendor() && order.has_vendor(actor.id))
}

/// Admins, and the courier currently assigned to the delivery.
pub fn can_update_delivery(actor: &Actor, delivery: &DeliveryView) -> bool {
    actor.is_admin() || (actor.role == Role::Courier && delivery.courier_id == Some(actor.id))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryScope {
    All,
    AssignedTo(Uuid),
}

impl DeliveryScope {
    pub fn for_actor(actor: &Actor) -> Result<Self, DomainError> {
        match actor.role {
            Role::Admin => Ok(DeliveryScope::All),
            Role::Courier => Ok(DeliveryScope::AssignedTo(actor.id)),
            _ => Err(DomainError::PermissionDenied(
                "only administrators and couriers may list deliveries".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationScope {
    All,
    RecipientIs(Uuid),
}

impl NotificationScope {
    pub fn for_actor(actor: &Actor) -> Self {
        if actor.is_admin() {
            NotificationScope::All
        } else {
            NotificationScope::RecipientIs(actor.id)
        }
    }
}
