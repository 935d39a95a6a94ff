use chrono::Utc;
use diesel::dsl::not;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::ProtectionPlan;
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{FulfillmentUpdate, ListResult, Order, OrderItem};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing::CheckoutBreakdown;
use crate::domain::shipping::{LegKind, LegStatus, ShippingLeg};
use crate::schema::{marketplace_outbox, order_items, orders, shipping_legs};

use super::models::{NewOutboxEventRow, OrderItemRow, OrderRow, ShippingLegRow};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<diesel::result::Error> for DomainError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DomainError::Conflict(info.message().to_string())
            }
            other => DomainError::Internal(other.to_string()),
        }
    }
}

impl From<r2d2::Error> for DomainError {
    fn from(e: r2d2::Error) -> Self {
        DomainError::Internal(e.to_string())
    }
}

/// Explain an order write that matched no row: either the order is gone or
/// another writer moved it past the version the change was built on.
fn unmatched_order(conn: &mut PgConnection, order_id: Uuid) -> DomainError {
    let exists = diesel::select(diesel::dsl::exists(
        orders::table.filter(orders::id.eq(order_id)),
    ))
    .get_result::<bool>(conn);
    match exists {
        Ok(true) => DomainError::Conflict(
            "order was modified concurrently; reload and retry".to_string(),
        ),
        Ok(false) => DomainError::not_found("Order"),
        Err(e) => e.into(),
    }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> DomainError {
    DomainError::Internal(format!("stored {what} is invalid: {e}"))
}

// ── Row mapping ──────────────────────────────────────────────────────────────

fn order_row(order: &Order) -> Result<OrderRow, DomainError> {
    let shipping_address =
        serde_json::to_value(&order.shipping_address).map_err(|e| corrupt("address", e))?;
    let b = &order.breakdown;
    Ok(OrderRow {
        id: order.id,
        buyer_id: order.buyer_id,
        shipping_address,
        subtotal: b.subtotal.clone(),
        protection_plan_total: b.protection_plan_total.clone(),
        platform_fee: b.platform_fee.clone(),
        platform_fee_percentage: b.platform_fee_percentage as i32,
        gst: b.gst.clone(),
        shipping: b.shipping.clone(),
        total_amount: order.total_amount.clone(),
        payment_status: order.payment_status.as_str().to_string(),
        fulfillment_status: order.fulfillment_status.as_str().to_string(),
        gateway_order_id: order.gateway_order_id.clone(),
        gateway_payment_id: order.gateway_payment_id.clone(),
        version: order.version,
        created_at: order.created_at,
        updated_at: order.updated_at,
    })
}

fn item_row(order_id: Uuid, position: usize, item: &OrderItem) -> OrderItemRow {
    OrderItemRow {
        id: Uuid::new_v4(),
        order_id,
        position: position as i32,
        product_id: item.product_id,
        seller_id: item.seller_id,
        title: item.title.clone(),
        quantity: item.quantity,
        unit_price: item.unit_price.clone(),
        protection_selected: item.protection_plan.selected,
        protection_price: item.protection_plan.price.clone(),
        line_total: item.line_total.clone(),
    }
}

fn leg_row(order_id: Uuid, leg: &ShippingLeg) -> ShippingLegRow {
    ShippingLegRow {
        id: leg.id,
        order_id,
        leg_kind: leg.kind.as_str().to_string(),
        status: leg.status.as_str().to_string(),
        tracking_ref: leg.tracking_ref.clone(),
        label_url: leg.label_url.clone(),
        courier_name: leg.courier_name.clone(),
        note: leg.note.clone(),
        started_at: leg.started_at,
        completed_at: leg.completed_at,
        updated_at: leg.updated_at,
    }
}

fn outbox_row(order_id: Uuid, event: &OrderEvent) -> NewOutboxEventRow {
    NewOutboxEventRow {
        id: Uuid::new_v4(),
        aggregate_type: "Order".to_string(),
        aggregate_id: order_id.to_string(),
        event_type: event.event_type().to_string(),
        payload: event.payload(order_id),
    }
}

fn to_item(row: OrderItemRow) -> OrderItem {
    OrderItem {
        product_id: row.product_id,
        seller_id: row.seller_id,
        title: row.title,
        quantity: row.quantity,
        unit_price: row.unit_price,
        protection_plan: if row.protection_selected {
            ProtectionPlan::selected(row.protection_price)
        } else {
            ProtectionPlan::none()
        },
        line_total: row.line_total,
    }
}

fn to_leg(row: ShippingLegRow) -> Result<ShippingLeg, DomainError> {
    Ok(ShippingLeg {
        id: row.id,
        kind: row
            .leg_kind
            .parse::<LegKind>()
            .map_err(|e| corrupt("leg kind", e))?,
        status: row
            .status
            .parse::<LegStatus>()
            .map_err(|e| corrupt("leg status", e))?,
        tracking_ref: row.tracking_ref,
        label_url: row.label_url,
        courier_name: row.courier_name,
        note: row.note,
        started_at: row.started_at,
        completed_at: row.completed_at,
        updated_at: row.updated_at,
    })
}

fn to_order(
    row: OrderRow,
    items: Vec<OrderItemRow>,
    legs: Vec<ShippingLegRow>,
) -> Result<Order, DomainError> {
    let breakdown = CheckoutBreakdown {
        subtotal: row.subtotal,
        protection_plan_total: row.protection_plan_total,
        platform_fee: row.platform_fee,
        platform_fee_percentage: u32::try_from(row.platform_fee_percentage)
            .map_err(|e| corrupt("platform fee percentage", e))?,
        gst: row.gst,
        shipping: row.shipping,
        grand_total: row.total_amount.clone(),
    };
    Ok(Order {
        id: row.id,
        buyer_id: row.buyer_id,
        items: items.into_iter().map(to_item).collect(),
        shipping_address: serde_json::from_value(row.shipping_address)
            .map_err(|e| corrupt("address", e))?,
        breakdown,
        total_amount: row.total_amount,
        payment_status: row.payment_status.parse()?,
        fulfillment_status: row.fulfillment_status.parse()?,
        gateway_order_id: row.gateway_order_id,
        gateway_payment_id: row.gateway_payment_id,
        shipping_legs: legs.into_iter().map(to_leg).collect::<Result<_, _>>()?,
        version: row.version,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

/// Load items and legs for `rows` and assemble orders, keeping row order.
fn hydrate(conn: &mut PgConnection, rows: Vec<OrderRow>) -> Result<Vec<Order>, DomainError> {
    let items = OrderItemRow::belonging_to(&rows)
        .select(OrderItemRow::as_select())
        .order(order_items::position.asc())
        .load(conn)?
        .grouped_by(&rows);
    let legs = ShippingLegRow::belonging_to(&rows)
        .select(ShippingLegRow::as_select())
        .order(shipping_legs::started_at.asc())
        .load(conn)?
        .grouped_by(&rows);

    rows.into_iter()
        .zip(items)
        .zip(legs)
        .map(|((row, items), legs)| to_order(row, items, legs))
        .collect()
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(&self, order: &Order) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let row = order_row(order)?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(orders::table)
                .values(&row)
                .execute(conn)?;

            let items: Vec<OrderItemRow> = order
                .items
                .iter()
                .enumerate()
                .map(|(position, item)| item_row(order.id, position, item))
                .collect();
            diesel::insert_into(order_items::table)
                .values(&items)
                .execute(conn)?;

            let placed = OrderEvent::OrderPlaced {
                buyer_id: order.buyer_id,
                total_amount: order.total_amount.clone(),
                item_count: order.items.len(),
            };
            diesel::insert_into(marketplace_outbox::table)
                .values(&outbox_row(order.id, &placed))
                .execute(conn)?;

            Ok(())
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let order = orders::table
            .filter(orders::id.eq(id))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;

        let Some(order) = order else {
            return Ok(None);
        };

        Ok(hydrate(&mut conn, vec![order])?.pop())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table.count().get_result(conn)?;

            let rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .load(conn)?;

            Ok(ListResult {
                items: hydrate(conn, rows)?,
                total,
            })
        })
    }

    fn find_awaiting_forward(&self) -> Result<Vec<Order>, DomainError> {
        let mut conn = self.pool.get()?;

        let live_origin = shipping_legs::table
            .filter(shipping_legs::leg_kind.eq(LegKind::OriginToHub.as_str()))
            .filter(shipping_legs::status.ne(LegStatus::Cancelled.as_str()))
            .select(shipping_legs::order_id);
        let forwarded = shipping_legs::table
            .filter(shipping_legs::leg_kind.eq(LegKind::HubToDestination.as_str()))
            .select(shipping_legs::order_id);

        let rows = orders::table
            .filter(orders::payment_status.eq("paid"))
            .filter(orders::fulfillment_status.ne("cancelled"))
            .filter(orders::id.eq_any(live_origin))
            .filter(not(orders::id.eq_any(forwarded)))
            .select(OrderRow::as_select())
            .order(orders::created_at.asc())
            .load(&mut conn)?;

        Ok(hydrate(&mut conn, rows)?
            .into_iter()
            .filter(Order::awaiting_forward)
            .collect())
    }

    fn update_payment(&self, order: &Order, event: OrderEvent) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(order.id))
                    .filter(orders::version.eq(order.version - 1)),
            )
            .set((
                orders::payment_status.eq(order.payment_status.as_str()),
                orders::gateway_payment_id.eq(order.gateway_payment_id.clone()),
                orders::version.eq(order.version),
                orders::updated_at.eq(order.updated_at),
            ))
            .execute(conn)?;
            if updated == 0 {
                return Err(unmatched_order(conn, order.id));
            }

            diesel::insert_into(marketplace_outbox::table)
                .values(&outbox_row(order.id, &event))
                .execute(conn)?;
            Ok(())
        })
    }

    fn apply_fulfillment(&self, update: FulfillmentUpdate) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let updated = diesel::update(
                orders::table
                    .filter(orders::id.eq(update.order_id))
                    .filter(orders::version.eq(update.version - 1)),
            )
            .set((
                orders::fulfillment_status.eq(update.fulfillment_status.as_str()),
                orders::version.eq(update.version),
                orders::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;
            if updated == 0 {
                return Err(unmatched_order(conn, update.order_id));
            }

            for leg in &update.updated_legs {
                diesel::update(shipping_legs::table.filter(shipping_legs::id.eq(leg.id)))
                    .set(&leg_row(update.order_id, leg))
                    .execute(conn)?;
            }

            // Writers racing on the same version are stopped above; the unique
            // (order_id, leg_kind) index still backs the one-leg-per-kind rule.
            if let Some(leg) = &update.new_leg {
                diesel::insert_into(shipping_legs::table)
                    .values(&leg_row(update.order_id, leg))
                    .execute(conn)?;
            }

            let events: Vec<NewOutboxEventRow> = update
                .events
                .iter()
                .map(|e| outbox_row(update.order_id, e))
                .collect();
            if !events.is_empty() {
                diesel::insert_into(marketplace_outbox::table)
                    .values(&events)
                    .execute(conn)?;
            }
            Ok(())
        })
    }
}

/// Count outbox rows per event type for one order.
#[cfg(test)]
pub(crate) fn outbox_event_types(
    pool: &DbPool,
    order_id: Uuid,
) -> std::collections::HashMap<String, usize> {
    use super::models::OutboxEventRow;

    let mut conn = pool.get().expect("Failed to get connection");
    let events: Vec<OutboxEventRow> = marketplace_outbox::table
        .filter(marketplace_outbox::aggregate_id.eq(order_id.to_string()))
        .select(OutboxEventRow::as_select())
        .load(&mut conn)
        .expect("query failed");
    let mut counts = std::collections::HashMap::new();
    for e in events {
        *counts.entry(e.event_type).or_insert(0) += 1;
    }
    counts
}
