use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use uuid::Uuid;

use super::models::{DeliveryRow, NewDeliveryRow};
use super::outbox::append_event;
use crate::db::DbPool;
use crate::domain::access::DeliveryScope;
use crate::domain::delivery::{Assignment, DeliveryStatus, DeliveryView};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::ports::DeliveryRepository;
use crate::domain::{Page, PageRequest};
use crate::schema::deliveries;

pub struct DieselDeliveryRepository {
    pool: DbPool,
}

impl DieselDeliveryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Appends `DeliveryAssigned` when the courier on the delivery is new to it.
fn record_assignment(
    conn: &mut PgConnection,
    assignment: Assignment,
    customer_id: Uuid,
) -> Result<Assignment, DomainError> {
    if assignment.changed_courier() {
        if let Some(event) = DomainEvent::delivery_assigned(&assignment.delivery, customer_id) {
            append_event(conn, &event)?;
        }
    }
    Ok(assignment)
}

impl DeliveryRepository for DieselDeliveryRepository {
    fn assign(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
        courier_id: Uuid,
    ) -> Result<Assignment, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let locked = |conn: &mut PgConnection| {
                deliveries::table
                    .filter(deliveries::order_id.eq(order_id))
                    .select(DeliveryRow::as_select())
                    .for_update()
                    .first(conn)
                    .optional()
            };

            let current = match locked(conn)? {
                Some(current) => current,
                None => {
                    let inserted = diesel::insert_into(deliveries::table)
                        .values(&NewDeliveryRow {
                            id: Uuid::new_v4(),
                            order_id,
                            courier_id: Some(courier_id),
                            status: DeliveryStatus::Pending.as_str().to_string(),
                        })
                        .on_conflict(deliveries::order_id)
                        .do_nothing()
                        .returning(DeliveryRow::as_returning())
                        .get_result(conn)
                        .optional()?;
                    match inserted {
                        Some(row) => {
                            let assignment = Assignment {
                                delivery: row.try_into()?,
                                created: true,
                                previous_courier: None,
                            };
                            return record_assignment(conn, assignment, customer_id);
                        }
                        // A racing first assignment committed the row first.
                        None => locked(conn)?.ok_or(DieselError::NotFound)?,
                    }
                }
            };

            let row = diesel::update(deliveries::table.find(current.id))
                .set((
                    deliveries::courier_id.eq(courier_id),
                    deliveries::updated_at.eq(Utc::now()),
                ))
                .returning(DeliveryRow::as_returning())
                .get_result(conn)?;
            let assignment = Assignment {
                delivery: row.try_into()?,
                created: false,
                previous_courier: current.courier_id,
            };
            record_assignment(conn, assignment, customer_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<DeliveryView>, DomainError> {
        let mut conn = self.pool.get()?;
        deliveries::table
            .find(id)
            .select(DeliveryRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(DeliveryView::try_from)
            .transpose()
    }

    fn list(
        &self,
        scope: DeliveryScope,
        page: PageRequest,
    ) -> Result<Page<DeliveryView>, DomainError> {
        let scoped = || {
            let query = deliveries::table.into_boxed();
            match scope {
                DeliveryScope::All => query,
                DeliveryScope::AssignedTo(courier) => {
                    query.filter(deliveries::courier_id.eq(courier))
                }
            }
        };
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = scoped().count().get_result(conn)?;
            let items = scoped()
                .select(DeliveryRow::as_select())
                .order(deliveries::assigned_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?
                .into_iter()
                .map(DeliveryView::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page { items, total })
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        customer_id: Uuid,
        status: DeliveryStatus,
        location: Option<String>,
    ) -> Result<DeliveryView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let target = deliveries::table.find(id);
            let now = Utc::now();
            let row = match location {
                Some(location) => diesel::update(target)
                    .set((
                        deliveries::status.eq(status.as_str()),
                        deliveries::location.eq(location),
                        deliveries::updated_at.eq(now),
                    ))
                    .returning(DeliveryRow::as_returning())
                    .get_result(conn)
                    .optional()?,
                None => diesel::update(target)
                    .set((
                        deliveries::status.eq(status.as_str()),
                        deliveries::updated_at.eq(now),
                    ))
                    .returning(DeliveryRow::as_returning())
                    .get_result(conn)
                    .optional()?,
            };
            let delivery = DeliveryView::try_from(
                row.ok_or_else(|| DomainError::NotFound("Delivery".to_string()))?,
            )?;
            append_event(
                conn,
                &DomainEvent::delivery_status_changed(&delivery, customer_id),
            )?;
            Ok(delivery)
        })
    }
}
