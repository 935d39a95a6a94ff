use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::schema::{
    cart_items, carts, marketplace_outbox, order_items, orders, products, shipping_legs,
};

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub weight_grams: i32,
    pub length_cm: i32,
    pub breadth_cm: i32,
    pub height_cm: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub weight_grams: i32,
    pub length_cm: i32,
    pub breadth_cm: i32,
    pub height_cm: i32,
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub version: i32,
    pub subtotal: BigDecimal,
    pub protection_plan_total: BigDecimal,
    pub total_item_count: i64,
    pub grand_total: BigDecimal,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = cart_items)]
#[diesel(belongs_to(CartRow, foreign_key = cart_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub protection_selected: bool,
    pub protection_price: BigDecimal,
    pub line_total: BigDecimal,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = cart_items)]
pub struct NewCartItemRow {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub position: i32,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub protection_selected: bool,
    pub protection_price: BigDecimal,
    pub line_total: BigDecimal,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Insertable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub shipping_address: Value,
    pub subtotal: BigDecimal,
    pub protection_plan_total: BigDecimal,
    pub platform_fee: BigDecimal,
    pub platform_fee_percentage: i32,
    pub gst: BigDecimal,
    pub shipping: BigDecimal,
    pub total_amount: BigDecimal,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub position: i32,
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub protection_selected: bool,
    pub protection_price: BigDecimal,
    pub line_total: BigDecimal,
}

#[derive(
    Debug, Clone, Queryable, Selectable, Identifiable, Associations, Insertable, AsChangeset,
)]
#[diesel(table_name = shipping_legs)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ShippingLegRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub leg_kind: String,
    pub status: String,
    pub tracking_ref: String,
    pub label_url: Option<String>,
    pub courier_name: Option<String>,
    pub note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

// ── Outbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = marketplace_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = marketplace_outbox)]
pub struct NewOutboxEventRow {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub payload: Value,
}
