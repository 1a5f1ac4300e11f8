use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use super::{blocking, bounded};
use crate::domain::access::{Actor, NotificationScope};
use crate::domain::catalog::UserView;
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::notification::{
    AttemptStatus, NewNotification, NotificationType, NotificationView, RealtimeMessage,
};
use crate::domain::ports::{NotificationRepository, RealtimeChannel, SmsTransport, UserDirectory};
use crate::domain::{Page, PageRequest};

/// One message owed to one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Announcement {
    recipient_id: Uuid,
    kind: NotificationType,
    audience: Audience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Customer,
    Courier,
}

fn announcements(event: &DomainEvent) -> Vec<Announcement> {
    let to = |recipient_id, kind, audience| Announcement {
        recipient_id,
        kind,
        audience,
    };
    match event {
        DomainEvent::OrderPlaced { customer_id, .. } => vec![to(
            *customer_id,
            NotificationType::OrderPlaced,
            Audience::Customer,
        )],
        DomainEvent::PaymentCompleted { customer_id, .. } => vec![to(
            *customer_id,
            NotificationType::PaymentCompleted,
            Audience::Customer,
        )],
        DomainEvent::DeliveryAssigned {
            customer_id,
            courier_id,
            ..
        } => vec![
            to(
                *customer_id,
                NotificationType::DeliveryAssigned,
                Audience::Customer,
            ),
            to(
                *courier_id,
                NotificationType::DeliveryAssigned,
                Audience::Courier,
            ),
        ],
        DomainEvent::DeliveryStatusChanged { customer_id, .. } => vec![to(
            *customer_id,
            NotificationType::DeliveryStatus,
            Audience::Customer,
        )],
        DomainEvent::OrderStatusChanged { .. } | DomainEvent::PaymentFailed { .. } => vec![],
    }
}

fn compose(event: &DomainEvent, audience: Audience, name: &str) -> Option<String> {
    let message = match (event, audience) {
        (DomainEvent::OrderPlaced { order_id, .. }, _) => {
            format!("Dear {name}, your order #{order_id} has been placed successfully.")
        }
        (
            DomainEvent::PaymentCompleted {
                order_id,
                amount,
                transaction_code,
                ..
            },
            _,
        ) => format!(
            "Dear {name}, payment of KES {amount} for Order #{order_id} received. \
             M-Pesa Code: {transaction_code}."
        ),
        (DomainEvent::DeliveryAssigned { order_id, .. }, Audience::Customer) => {
            format!("Dear {name}, your Order #{order_id} has been assigned for delivery.")
        }
        (DomainEvent::DeliveryAssigned { order_id, .. }, Audience::Courier) => {
            format!("Dear {name}, you have been assigned to deliver Order #{order_id}.")
        }
        (
            DomainEvent::DeliveryStatusChanged {
                order_id,
                status,
                location,
                ..
            },
            _,
        ) => {
            let location = if location.trim().is_empty() {
                "unknown location"
            } else {
                location.as_str()
            };
            format!("Dear {name}, your Order #{order_id} is now {status} at {location}.")
        }
        (DomainEvent::OrderStatusChanged { .. } | DomainEvent::PaymentFailed { .. }, _) => {
            return None
        }
    };
    Some(message)
}

/// Fans domain events out to SMS and in-app recipients.
///
/// Every attempt is written to the notification log whatever its outcome;
/// nothing here returns an error to the caller that triggered the event.
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    users: Arc<dyn UserDirectory>,
    sms: Arc<dyn SmsTransport>,
    realtime: Arc<dyn RealtimeChannel>,
    timeout: Duration,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        users: Arc<dyn UserDirectory>,
        sms: Arc<dyn SmsTransport>,
        realtime: Arc<dyn RealtimeChannel>,
        timeout: Duration,
    ) -> Self {
        Self {
            notifications,
            users,
            sms,
            realtime,
            timeout,
        }
    }

    /// Returns the notification records written for `event`.
    pub async fn dispatch(&self, event: &DomainEvent) -> Vec<NotificationView> {
        let mut recorded = Vec::new();
        for announcement in announcements(event) {
            let users = self.users.clone();
            let recipient_id = announcement.recipient_id;
            let recipient = match blocking(move || users.find_user(recipient_id)).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    log::warn!(
                        "Skipping {} notification: recipient {} does not exist",
                        announcement.kind,
                        recipient_id
                    );
                    continue;
                }
                Err(e) => {
                    log::error!("Could not load recipient {}: {}", recipient_id, e);
                    continue;
                }
            };

            let Some(message) = compose(event, announcement.audience, &recipient.full_name)
            else {
                continue;
            };
            recorded.extend(self.deliver(&recipient, announcement.kind, message).await);
        }
        recorded
    }

    async fn deliver(
        &self,
        recipient: &UserView,
        kind: NotificationType,
        message: String,
    ) -> Vec<NotificationView> {
        let mut recorded = Vec::with_capacity(2);

        let status = match bounded(self.timeout, self.sms.send(&message, &recipient.phone)).await
        {
            Ok(()) => AttemptStatus::Sent,
            Err(e) => {
                log::warn!(
                    "SMS {} to {} ({}) failed: {}",
                    kind,
                    recipient.id,
                    recipient.phone,
                    e
                );
                AttemptStatus::Failed
            }
        };
        recorded.extend(
            self.record(NewNotification::sms(
                recipient.id,
                kind,
                message.clone(),
                recipient.phone.clone(),
                status,
            ))
            .await,
        );

        let push = RealtimeMessage {
            kind: kind.as_str().to_string(),
            message: message.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        if let Err(e) = bounded(self.timeout, self.realtime.push(recipient.id, push)).await {
            log::debug!("In-app push to {} not delivered live: {}", recipient.id, e);
        }
        recorded.extend(
            self.record(NewNotification::in_app(recipient.id, kind, message))
                .await,
        );

        recorded
    }

    async fn record(&self, notification: NewNotification) -> Option<NotificationView> {
        let repo = self.notifications.clone();
        match blocking(move || repo.record(notification)).await {
            Ok(view) => Some(view),
            Err(e) => {
                log::error!("Failed to record notification: {}", e);
                None
            }
        }
    }

    pub async fn list(
        &self,
        actor: &Actor,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, DomainError> {
        let scope = NotificationScope::for_actor(actor);
        let repo = self.notifications.clone();
        blocking(move || repo.list(scope, page)).await
    }
}
