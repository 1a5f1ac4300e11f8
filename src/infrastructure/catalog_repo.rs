use diesel::prelude::*;
use uuid::Uuid;

use super::models::{ProductRow, UserRow};
use crate::db::DbPool;
use crate::domain::catalog::{ProductView, UserView};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogReader, UserDirectory};
use crate::schema::{products, users};

/// Read-only view of the product and user tables, which other services own.
pub struct DieselCatalog {
    pool: DbPool,
}

impl DieselCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogReader for DieselCatalog {
    fn find_product(&self, id: Uuid) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .find(id)
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(ProductView::from))
    }

    fn find_products(&self, ids: &[Uuid]) -> Result<Vec<ProductView>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(ProductView::from).collect())
    }
}

impl UserDirectory for DieselCatalog {
    fn find_user(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?
            .map(UserView::try_from)
            .transpose()
    }
}
