use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationType {
    OrderPlaced,
    PaymentCompleted,
    DeliveryAssigned,
    DeliveryStatus,
    ComplaintStatus,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderPlaced => "order_placed",
            NotificationType::PaymentCompleted => "payment_completed",
            NotificationType::DeliveryAssigned => "delivery_assigned",
            NotificationType::DeliveryStatus => "delivery_status",
            NotificationType::ComplaintStatus => "complaint_status",
        }
    }
}

impl FromStr for NotificationType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order_placed" => Ok(NotificationType::OrderPlaced),
            "payment_completed" => Ok(NotificationType::PaymentCompleted),
            "delivery_assigned" => Ok(NotificationType::DeliveryAssigned),
            "delivery_status" => Ok(NotificationType::DeliveryStatus),
            "complaint_status" => Ok(NotificationType::ComplaintStatus),
            other => Err(DomainError::Internal(format!(
                "unknown notification type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Sms,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "sms",
            Channel::InApp => "in_app",
        }
    }
}

impl FromStr for Channel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sms" => Ok(Channel::Sms),
            "in_app" => Ok(Channel::InApp),
            other => Err(DomainError::Internal(format!("unknown channel '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Sent,
    Failed,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Sent => "sent",
            AttemptStatus::Failed => "failed",
        }
    }
}

impl FromStr for AttemptStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(AttemptStatus::Sent),
            "failed" => Ok(AttemptStatus::Failed),
            other => Err(DomainError::Internal(format!(
                "unknown notification status '{other}'"
            ))),
        }
    }
}

/// One delivery attempt about to be written to the notification log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub kind: NotificationType,
    pub channel: Channel,
    pub message: String,
    pub phone_number: Option<String>,
    pub status: AttemptStatus,
}

impl NewNotification {
    pub fn sms(
        recipient_id: Uuid,
        kind: NotificationType,
        message: String,
        phone_number: String,
        status: AttemptStatus,
    ) -> Self {
        Self {
            recipient_id,
            kind,
            channel: Channel::Sms,
            message,
            phone_number: Some(phone_number),
            status,
        }
    }

    /// In-app attempts are always logged as sent: the record is the message.
    pub fn in_app(recipient_id: Uuid, kind: NotificationType, message: String) -> Self {
        Self {
            recipient_id,
            kind,
            channel: Channel::InApp,
            message,
            phone_number: None,
            status: AttemptStatus::Sent,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationView {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub kind: NotificationType,
    pub channel: Channel,
    pub message: String,
    pub phone_number: Option<String>,
    pub status: AttemptStatus,
    pub created_at: DateTime<Utc>,
}

/// Payload pushed to a recipient's live channel.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub created_at: String,
}
