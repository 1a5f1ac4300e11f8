use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::{blocking, bounded, NotificationService};
use crate::domain::access::{Actor, Role};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::payment::{
    validate_phone_number, whole_units, PaymentStatus, PaymentView, Settlement,
    SettlementOutcome, StkCallback,
};
use crate::domain::ports::{OrderRepository, PaymentProvider, PaymentRepository, PushRequest};

/// Daraja rejects account references longer than this.
const ACCOUNT_REFERENCE_MAX: usize = 12;

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Public base URL the provider calls back on.
    pub callback_base_url: String,
    /// Shared secret expected in the callback's `token` query parameter.
    pub callback_token: Option<String>,
    pub timeout: Duration,
}

impl PaymentSettings {
    fn callback_url(&self, payment_id: Uuid) -> String {
        let base = self.callback_base_url.trim_end_matches('/');
        match &self.callback_token {
            Some(token) => format!("{base}/payments/callback/{payment_id}?token={token}"),
            None => format!("{base}/payments/callback/{payment_id}"),
        }
    }
}

/// How a provider callback was applied.
#[derive(Debug, Clone)]
pub enum CallbackOutcome {
    Completed(PaymentView),
    Failed(PaymentView),
    /// The payment was already completed or failed; nothing changed.
    AlreadyProcessed(PaymentView),
}

pub struct PaymentService {
    orders: Arc<dyn OrderRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<NotificationService>,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<NotificationService>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            orders,
            payments,
            provider,
            notifier,
            settings,
        }
    }

    /// Prompts the customer's phone to pay for `order_id`.
    ///
    /// Success means the provider accepted the push request, not that the
    /// customer has paid; that arrives later through [`Self::handle_callback`].
    pub async fn initiate(
        &self,
        actor: &Actor,
        order_id: Uuid,
        phone_number: &str,
    ) -> Result<PaymentView, DomainError> {
        actor.require(Role::Customer)?;
        validate_phone_number(phone_number)?;

        let orders = self.orders.clone();
        let payments = self.payments.clone();
        let customer_id = actor.id;
        let (order, already_paid) = blocking(move || {
            let order = orders
                .find_by_id(order_id)?
                .filter(|o| o.customer_id == customer_id)
                .ok_or_else(|| DomainError::NotFound("Order".to_string()))?;
            let paid = payments.has_completed(order.id)?;
            Ok((order, paid))
        })
        .await?;
        if already_paid {
            return Err(DomainError::Validation("Order already paid".to_string()));
        }
        let amount = whole_units(&order.total_price)?;

        let token = bounded(self.settings.timeout, self.provider.access_token())
            .await
            .map_err(|e| {
                log::warn!("M-Pesa token exchange failed: {}", e);
                DomainError::Upstream("Failed to obtain M-Pesa token".to_string())
            })?;

        let payments = self.payments.clone();
        let phone = phone_number.to_string();
        let total = order.total_price.clone();
        let payment = blocking(move || payments.create_pending(order_id, total, &phone)).await?;

        let request = PushRequest {
            phone_number: phone_number.to_string(),
            amount,
            callback_url: self.settings.callback_url(payment.id),
            account_reference: account_reference(order_id),
            description: "Payment for order".to_string(),
        };
        let ack = match bounded(
            self.settings.timeout,
            self.provider.push_payment(&token, &request),
        )
        .await
        {
            Ok(ack) => ack,
            Err(e) => {
                log::warn!("STK push for payment {} failed: {}", payment.id, e);
                self.fail(payment.id, Some(e.to_string())).await?;
                return Err(DomainError::Upstream(
                    "Payment initiation failed".to_string(),
                ));
            }
        };

        if !ack.accepted {
            let description = ack
                .description
                .unwrap_or_else(|| "Payment initiation failed".to_string());
            log::warn!(
                "Provider rejected STK push for payment {}: {}",
                payment.id,
                description
            );
            self.fail(payment.id, Some(description.clone())).await?;
            return Err(DomainError::Upstream(description));
        }

        let payment = match ack.checkout_request_id {
            Some(checkout) => {
                let payments = self.payments.clone();
                let id = payment.id;
                let stored = checkout.clone();
                blocking(move || payments.record_checkout(id, &stored)).await?;
                PaymentView {
                    checkout_request_id: Some(checkout),
                    ..payment
                }
            }
            None => payment,
        };
        log::info!(
            "STK push sent for payment {} (order {}, KES {})",
            payment.id,
            order_id,
            amount
        );
        Ok(payment)
    }

    async fn fail(&self, payment_id: Uuid, description: Option<String>) -> Result<(), DomainError> {
        let payments = self.payments.clone();
        blocking(move || payments.settle(payment_id, SettlementOutcome::Failed { description }))
            .await
            .map(|_| ())
    }

    /// Applies the provider's asynchronous verdict to a payment.
    ///
    /// Only a pending payment changes; repeated deliveries of the same
    /// callback are acknowledged without side effects.
    pub async fn handle_callback(
        &self,
        payment_id: Uuid,
        token: Option<&str>,
        callback: &StkCallback,
    ) -> Result<CallbackOutcome, DomainError> {
        if let Some(expected) = &self.settings.callback_token {
            if token != Some(expected.as_str()) {
                log::warn!("Rejected callback for payment {}: bad token", payment_id);
                return Err(DomainError::PermissionDenied(
                    "invalid callback token".to_string(),
                ));
            }
        }

        let payments = self.payments.clone();
        blocking(move || payments.find_by_id(payment_id))
            .await?
            .ok_or_else(|| DomainError::NotFound("Payment".to_string()))?;

        let outcome = callback.outcome()?;
        let payments = self.payments.clone();
        let settlement = blocking(move || payments.settle(payment_id, outcome))
            .await
            .inspect_err(|e| {
                if let DomainError::Conflict(reason) = e {
                    log::error!(
                        "Callback for payment {} collides with an existing payment: {}",
                        payment_id,
                        reason
                    );
                }
            })?;

        match settlement {
            Settlement::AlreadySettled(payment) => {
                log::info!(
                    "Ignoring repeated callback for payment {} ({})",
                    payment.id,
                    payment.status
                );
                Ok(CallbackOutcome::AlreadyProcessed(payment))
            }
            Settlement::Applied {
                payment,
                customer_id,
            } => {
                log::info!("Payment {} is now {}", payment.id, payment.status);
                if let Some(event) = DomainEvent::payment_settled(&payment, customer_id) {
                    self.notifier.dispatch(&event).await;
                }
                if payment.status == PaymentStatus::Completed {
                    Ok(CallbackOutcome::Completed(payment))
                } else {
                    Ok(CallbackOutcome::Failed(payment))
                }
            }
        }
    }
}

fn account_reference(order_id: Uuid) -> String {
    let mut reference = format!("ORD{}", order_id.simple());
    reference.truncate(ACCOUNT_REFERENCE_MAX);
    reference.to_uppercase()
}
