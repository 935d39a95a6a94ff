use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{Cart, CartItem, ProtectionPlan};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts};

use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow};

#[derive(Clone)]
pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn stale_cart() -> DomainError {
    DomainError::Conflict("cart was modified concurrently; reload and retry".to_string())
}

impl CartRepository for DieselCartRepository {
    fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Cart>, DomainError> {
        let mut conn = self.pool.get()?;

        // Header and items are read in one transaction so the version always
        // matches the items returned with it.
        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = carts::table
                .filter(carts::owner_id.eq(owner_id))
                .select(CartRow::as_select())
                .first(conn)
                .optional()?;

            let Some(cart) = cart else {
                return Ok(None);
            };

            let items = CartItemRow::belonging_to(&cart)
                .select(CartItemRow::as_select())
                .order(cart_items::position.asc())
                .load(conn)?
                .into_iter()
                .map(|row| {
                    let plan = if row.protection_selected {
                        ProtectionPlan::selected(row.protection_price)
                    } else {
                        ProtectionPlan::none()
                    };
                    CartItem::new(row.product_id, row.quantity, row.unit_price, plan)
                })
                .collect();

            Ok(Some(Cart::restore(
                cart.id,
                cart.owner_id,
                cart.version,
                cart.updated_at,
                items,
            )))
        })
    }

    fn save(&self, cart: &Cart) -> Result<Cart, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let totals = cart.totals();
            let next_version = cart.version + 1;

            if cart.version == 0 {
                // A concurrent first save for the same owner trips the
                // unique owner index and surfaces as a conflict.
                diesel::insert_into(carts::table)
                    .values(&NewCartRow {
                        id: cart.id,
                        owner_id: cart.owner_id,
                        version: next_version,
                        subtotal: totals.subtotal.clone(),
                        protection_plan_total: totals.protection_plan_total.clone(),
                        total_item_count: totals.total_item_count,
                        grand_total: totals.grand_total.clone(),
                        updated_at: cart.updated_at,
                    })
                    .execute(conn)?;
            } else {
                let updated = diesel::update(
                    carts::table
                        .filter(carts::id.eq(cart.id))
                        .filter(carts::version.eq(cart.version)),
                )
                .set((
                    carts::version.eq(next_version),
                    carts::subtotal.eq(totals.subtotal.clone()),
                    carts::protection_plan_total.eq(totals.protection_plan_total.clone()),
                    carts::total_item_count.eq(totals.total_item_count),
                    carts::grand_total.eq(totals.grand_total.clone()),
                    carts::updated_at.eq(cart.updated_at),
                ))
                .execute(conn)?;
                if updated == 0 {
                    return Err(stale_cart());
                }
            }

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;

            let rows: Vec<NewCartItemRow> = cart
                .items()
                .iter()
                .enumerate()
                .map(|(position, item)| NewCartItemRow {
                    id: Uuid::new_v4(),
                    cart_id: cart.id,
                    product_id: item.product_id,
                    position: position as i32,
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                    protection_selected: item.protection_plan.selected,
                    protection_price: item.protection_plan.price.clone(),
                    line_total: item.line_total().clone(),
                })
                .collect();
            if !rows.is_empty() {
                diesel::insert_into(cart_items::table)
                    .values(&rows)
                    .execute(conn)?;
            }

            let mut saved = cart.clone();
            saved.version = next_version;
            Ok(saved)
        })
    }

    fn clear(&self, owner_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart_id: Option<Uuid> = diesel::update(carts::table.filter(carts::owner_id.eq(owner_id)))
                .set((
                    carts::version.eq(carts::version + 1),
                    carts::subtotal.eq(BigDecimal::from(0)),
                    carts::protection_plan_total.eq(BigDecimal::from(0)),
                    carts::total_item_count.eq(0_i64),
                    carts::grand_total.eq(BigDecimal::from(0)),
                    carts::updated_at.eq(Utc::now()),
                ))
                .returning(carts::id)
                .get_result(conn)
                .optional()?;

            if let Some(cart_id) = cart_id {
                diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart_id)))
                    .execute(conn)?;
            }
            Ok(())
        })
    }
}
