use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use super::models::{NewPaymentRow, PaymentRow, SettlementChanges};
use super::outbox::append_event;
use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{PaymentStatus, PaymentView, Settlement, SettlementOutcome};
use crate::domain::ports::PaymentRepository;
use crate::schema::{orders, payments};

pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl SettlementChanges {
    fn from_outcome(outcome: SettlementOutcome) -> Self {
        match outcome {
            SettlementOutcome::Completed { transaction_code } => SettlementChanges {
                status: PaymentStatus::Completed.as_str().to_string(),
                transaction_code: Some(transaction_code),
                result_description: None,
                updated_at: Utc::now(),
            },
            SettlementOutcome::Failed { description } => SettlementChanges {
                status: PaymentStatus::Failed.as_str().to_string(),
                transaction_code: None,
                result_description: description,
                updated_at: Utc::now(),
            },
        }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn has_completed(&self, order_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let exists = diesel::select(diesel::dsl::exists(
            payments::table
                .filter(payments::order_id.eq(order_id))
                .filter(payments::status.eq(PaymentStatus::Completed.as_str())),
        ))
        .get_result(&mut conn)?;
        Ok(exists)
    }

    fn create_pending(
        &self,
        order_id: Uuid,
        amount: BigDecimal,
        phone_number: &str,
    ) -> Result<PaymentView, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(payments::table)
            .values(&NewPaymentRow {
                id: Uuid::new_v4(),
                order_id,
                amount,
                status: PaymentStatus::Pending.as_str().to_string(),
                phone_number: phone_number.to_string(),
            })
            .returning(PaymentRow::as_returning())
            .get_result(&mut conn)?
            .try_into()
    }

    fn record_checkout(&self, id: Uuid, checkout_request_id: &str) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::update(payments::table.find(id))
            .set((
                payments::checkout_request_id.eq(checkout_request_id),
                payments::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<PaymentView>, DomainError> {
        let mut conn = self.pool.get()?;
        payments::table
            .find(id)
            .select(PaymentRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(PaymentView::try_from)
            .transpose()
    }

    fn settle(&self, id: Uuid, outcome: SettlementOutcome) -> Result<Settlement, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Only a pending row matches, so concurrent callbacks settle once.
            let updated = diesel::update(
                payments::table
                    .filter(payments::id.eq(id))
                    .filter(payments::status.eq(PaymentStatus::Pending.as_str())),
            )
            .set(SettlementChanges::from_outcome(outcome))
            .returning(PaymentRow::as_returning())
            .get_result(conn)
            .optional()?;

            let Some(row) = updated else {
                let current = payments::table
                    .find(id)
                    .select(PaymentRow::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| DomainError::NotFound("Payment".to_string()))?;
                return Ok(Settlement::AlreadySettled(current.try_into()?));
            };
            let payment = PaymentView::try_from(row)?;

            let customer_id = if payment.status == PaymentStatus::Completed {
                diesel::update(orders::table.find(payment.order_id))
                    .set((
                        orders::status.eq(OrderStatus::InProgress.as_str()),
                        orders::updated_at.eq(Utc::now()),
                    ))
                    .returning(orders::customer_id)
                    .get_result(conn)?
            } else {
                orders::table
                    .find(payment.order_id)
                    .select(orders::customer_id)
                    .first(conn)?
            };

            if let Some(event) = DomainEvent::payment_settled(&payment, customer_id) {
                append_event(conn, &event)?;
            }
            Ok(Settlement::Applied {
                payment,
                customer_id,
            })
        })
    }
}
