//! Transactional outbox. Every state change appends its domain event here
//! inside the transaction that made the change, so the event log never
//! disagrees with the tables it describes.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use super::models::NewOutboxEventRow;
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::schema::marketplace_outbox;

pub fn append_event(conn: &mut PgConnection, event: &DomainEvent) -> Result<(), DomainError> {
    let payload = serde_json::to_value(event)
        .map_err(|e| DomainError::Internal(format!("unserializable event: {e}")))?;
    diesel::insert_into(marketplace_outbox::table)
        .values(&NewOutboxEventRow {
            id: Uuid::new_v4(),
            aggregate_type: event.aggregate_type().to_string(),
            aggregate_id: event.aggregate_id().to_string(),
            event_type: event.event_type().to_string(),
            payload,
        })
        .execute(conn)?;
    Ok(())
}
