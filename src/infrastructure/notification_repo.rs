use diesel::prelude::*;
use uuid::Uuid;

use super::models::{NewNotificationRow, NotificationRow};
use crate::db::DbPool;
use crate::domain::access::NotificationScope;
use crate::domain::errors::DomainError;
use crate::domain::notification::{NewNotification, NotificationView};
use crate::domain::ports::NotificationRepository;
use crate::domain::{Page, PageRequest};
use crate::schema::notifications;

/// Append-only log of notification attempts.
pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl NotificationRepository for DieselNotificationRepository {
    fn record(&self, n: NewNotification) -> Result<NotificationView, DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(notifications::table)
            .values(&NewNotificationRow {
                id: Uuid::new_v4(),
                recipient_id: n.recipient_id,
                notification_type: n.kind.as_str().to_string(),
                channel: n.channel.as_str().to_string(),
                message: n.message,
                phone_number: n.phone_number,
                status: n.status.as_str().to_string(),
            })
            .returning(NotificationRow::as_returning())
            .get_result(&mut conn)?
            .try_into()
    }

    fn list(
        &self,
        scope: NotificationScope,
        page: PageRequest,
    ) -> Result<Page<NotificationView>, DomainError> {
        let scoped = || {
            let query = notifications::table.into_boxed();
            match scope {
                NotificationScope::All => query,
                NotificationScope::RecipientIs(id) => {
                    query.filter(notifications::recipient_id.eq(id))
                }
            }
        };
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = scoped().count().get_result(conn)?;
            let items = scoped()
                .select(NotificationRow::as_select())
                .order(notifications::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?
                .into_iter()
                .map(NotificationView::try_from)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page { items, total })
        })
    }
}
