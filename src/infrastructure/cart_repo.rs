use diesel::prelude::*;
use diesel::upsert::excluded;
use uuid::Uuid;

use super::models::{CartItemRow, NewCartItemRow};
use crate::db::DbPool;
use crate::domain::catalog::CartLine;
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::cart_items;

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CartRepository for DieselCartRepository {
    fn lines(&self, customer_id: Uuid) -> Result<Vec<CartLine>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = cart_items::table
            .filter(cart_items::customer_id.eq(customer_id))
            .order(cart_items::added_at.asc())
            .select(CartItemRow::as_select())
            .load(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|r| CartLine {
                product_id: r.product_id,
                quantity: r.quantity,
            })
            .collect())
    }

    fn put(&self, customer_id: Uuid, line: CartLine) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(cart_items::table)
            .values(&NewCartItemRow {
                customer_id,
                product_id: line.product_id,
                quantity: line.quantity,
            })
            .on_conflict((cart_items::customer_id, cart_items::product_id))
            .do_update()
            .set(cart_items::quantity.eq(excluded(cart_items::quantity)))
            .execute(&mut conn)?;
        Ok(())
    }

    fn remove(&self, customer_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;
        let deleted = diesel::delete(
            cart_items::table
                .filter(cart_items::customer_id.eq(customer_id))
                .filter(cart_items::product_id.eq(product_id)),
        )
        .execute(&mut conn)?;
        Ok(deleted > 0)
    }

    fn clear(&self, customer_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::delete(cart_items::table.filter(cart_items::customer_id.eq(customer_id)))
            .execute(&mut conn)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::Role;
    use crate::infrastructure::test_support::{seed_product, seed_user, setup_db};

    #[tokio::test]
    async fn put_upserts_and_remove_reports_presence() {
        let (_container, pool) = setup_db().await;
        let customer = seed_user(&pool, Role::Customer);
        let vendor = seed_user(&pool, Role::Vendor);
        let product = seed_product(&pool, vendor, "3.00", 10);
        let repo = DieselCartRepository::new(pool);

        repo.put(customer, CartLine { product_id: product, quantity: 1 })
            .expect("put failed");
        repo.put(customer, CartLine { product_id: product, quantity: 4 })
            .expect("put failed");

        let lines = repo.lines(customer).expect("lines failed");
        assert_eq!(lines, vec![CartLine { product_id: product, quantity: 4 }]);

        assert!(repo.remove(customer, product).expect("remove failed"));
        assert!(!repo.remove(customer, product).expect("remove failed"));
        assert!(repo.lines(customer).expect("lines failed").is_empty());
    }
}
