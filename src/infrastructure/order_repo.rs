use std::collections::HashMap;

use chrono::Utc;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use uuid::Uuid;

use super::models::{
    CartItemRow, NewOrderLineRow, NewOrderRow, OrderLineRow, OrderRow, ProductRow,
};
use super::outbox::append_event;
use crate::db::DbPool;
use crate::domain::access::OrderScope;
use crate::domain::catalog::{CartLine, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::events::DomainEvent;
use crate::domain::order::{price_cart, OrderStatus, OrderView};
use crate::domain::ports::OrderRepository;
use crate::domain::{Page, PageRequest};
use crate::schema::{cart_items, order_lines, orders, products};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Orders visible under `scope`, or `None` when nothing is.
fn scoped(scope: OrderScope) -> Option<orders::BoxedQuery<'static, Pg>> {
    let query = orders::table.into_boxed();
    match scope {
        OrderScope::All => Some(query),
        OrderScope::PlacedBy(customer_id) => {
            Some(query.filter(orders::customer_id.eq(customer_id)))
        }
        OrderScope::ContainingVendor(vendor_id) => Some(
            query.filter(
                orders::id.eq_any(
                    order_lines::table
                        .filter(order_lines::vendor_id.eq(vendor_id))
                        .select(order_lines::order_id),
                ),
            ),
        ),
        OrderScope::Nothing => None,
    }
}

fn load_lines(conn: &mut PgConnection, order: &OrderRow) -> QueryResult<Vec<OrderLineRow>> {
    OrderLineRow::belonging_to(order)
        .select(OrderLineRow::as_select())
        .order(order_lines::created_at.asc())
        .load(conn)
}

impl OrderRepository for DieselOrderRepository {
    fn place_from_cart(&self, customer_id: Uuid) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Lock the cart so a concurrent checkout waits for this one.
            let cart: Vec<CartLine> = cart_items::table
                .filter(cart_items::customer_id.eq(customer_id))
                .order(cart_items::added_at.asc())
                .select(CartItemRow::as_select())
                .for_update()
                .load(conn)?
                .into_iter()
                .map(|r| CartLine {
                    product_id: r.product_id,
                    quantity: r.quantity,
                })
                .collect();

            // 2. Snapshot prices
            let ids: Vec<Uuid> = cart.iter().map(|l| l.product_id).collect();
            let catalog: HashMap<Uuid, ProductView> = products::table
                .filter(products::id.eq_any(&ids))
                .select(ProductRow::as_select())
                .load(conn)?
                .into_iter()
                .map(|p| (p.id, ProductView::from(p)))
                .collect();
            let priced = price_cart(&cart, &catalog)?;

            // 3. Insert the order and its lines
            let order_id = Uuid::new_v4();
            let order = diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    customer_id,
                    total_price: priced.total_price,
                    status: OrderStatus::InProgress.as_str().to_string(),
                })
                .returning(OrderRow::as_returning())
                .get_result(conn)?;

            let new_lines: Vec<NewOrderLineRow> = priced
                .lines
                .into_iter()
                .map(|l| NewOrderLineRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: l.product_id,
                    vendor_id: l.vendor_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price,
                })
                .collect();
            let lines = diesel::insert_into(order_lines::table)
                .values(&new_lines)
                .returning(OrderLineRow::as_returning())
                .get_results(conn)?;

            // 4. Consume exactly the locked lines. A line added after the
            //    snapshot is not in this order and stays in the cart.
            diesel::delete(
                cart_items::table
                    .filter(cart_items::customer_id.eq(customer_id))
                    .filter(cart_items::product_id.eq_any(&ids)),
            )
            .execute(conn)?;

            // 5. Outbox event in the same transaction
            let view = order.into_view(lines)?;
            append_event(conn, &DomainEvent::order_placed(&view))?;

            Ok(view)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = load_lines(&mut conn, &order)?;
        order.into_view(lines).map(Some)
    }

    fn list(&self, scope: OrderScope, page: PageRequest) -> Result<Page<OrderView>, DomainError> {
        let (Some(count_query), Some(rows_query)) = (scoped(scope), scoped(scope)) else {
            return Ok(Page {
                items: Vec::new(),
                total: 0,
            });
        };
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = count_query.count().get_result(conn)?;

            let rows = rows_query
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(page.limit)
                .offset(page.offset())
                .load(conn)?;

            let lines = OrderLineRow::belonging_to(&rows)
                .select(OrderLineRow::as_select())
                .load(conn)?
                .grouped_by(&rows);

            let items = rows
                .into_iter()
                .zip(lines)
                .map(|(order, lines)| order.into_view(lines))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Page { items, total })
        })
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = diesel::update(orders::table.find(id))
                .set((
                    orders::status.eq(status.as_str()),
                    orders::updated_at.eq(Utc::now()),
                ))
                .returning(OrderRow::as_returning())
                .get_result(conn)
                .optional()?
                .ok_or_else(|| DomainError::NotFound("Order".to_string()))?;

            let lines = load_lines(conn, &order)?;
            let view = order.into_view(lines)?;
            append_event(conn, &DomainEvent::order_status_changed(&view))?;
            Ok(view)
        })
    }
}
