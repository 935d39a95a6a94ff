use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::ProductCatalog;
use crate::domain::product::Product;
use crate::domain::shipping::Parcel;
use crate::schema::products;

use super::models::{NewProductRow, ProductRow};

/// Read side of the product catalog. Listings are owned elsewhere; `insert`
/// exists for seeding.
#[derive(Clone)]
pub struct DieselProductCatalog {
    pool: DbPool,
}

impl DieselProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn insert(&self, product: &Product) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: product.id,
                seller_id: product.seller_id,
                title: product.title.clone(),
                price: product.price.clone(),
                stock: product.stock,
                weight_grams: product.parcel.weight_grams,
                length_cm: product.parcel.length_cm,
                breadth_cm: product.parcel.breadth_cm,
                height_cm: product.parcel.height_cm,
            })
            .execute(&mut conn)?;
        Ok(())
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            seller_id: row.seller_id,
            title: row.title,
            price: row.price,
            stock: row.stock,
            parcel: Parcel {
                weight_grams: row.weight_grams,
                length_cm: row.length_cm,
                breadth_cm: row.breadth_cm,
                height_cm: row.height_cm,
            },
        }
    }
}

impl ProductCatalog for DieselProductCatalog {
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = products::table
            .filter(products::id.eq(id))
            .select(ProductRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Product::from))
    }

    fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.pool.get()?;
        let rows = products::table
            .filter(products::id.eq_any(ids))
            .select(ProductRow::as_select())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Product::from).collect())
    }
}
