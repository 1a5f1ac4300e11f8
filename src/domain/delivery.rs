use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    PickedUp,
    InTransit,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(DeliveryStatus::Pending),
            "picked_up" => Ok(DeliveryStatus::PickedUp),
            "in_transit" => Ok(DeliveryStatus::InTransit),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            other => Err(DomainError::Validation(format!(
                "unknown delivery status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeliveryView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub status: DeliveryStatus,
    pub location: String,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What an assignment call did to the order's delivery.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub delivery: DeliveryView,
    pub created: bool,
    pub previous_courier: Option<Uuid>,
}

impl Assignment {
    /// True when the courier on the delivery is new to it.
    pub fn changed_courier(&self) -> bool {
        self.created || self.previous_courier != self.delivery.courier_id
    }
}
