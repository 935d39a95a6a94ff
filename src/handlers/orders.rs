use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::cart::ProtectionPlan;
use crate::domain::order::{Address, FulfillmentStatus, Order, OrderItem, PaymentStatus};
use crate::domain::pricing::BuyerBreakdown;
use crate::domain::shipping::{LegKind, LegStatus, ShippingLeg};
use crate::errors::AppError;
use crate::Orders;

// ── Response DTOs ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ProtectionPlanResponse {
    pub selected: bool,
    pub price: String,
}

impl From<&ProtectionPlan> for ProtectionPlanResponse {
    fn from(plan: &ProtectionPlan) -> Self {
        Self {
            selected: plan.selected,
            price: plan.price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: String,
    pub protection_plan: ProtectionPlanResponse,
    pub line_total: String,
}

impl From<&OrderItem> for OrderItemResponse {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            seller_id: item.seller_id,
            title: item.title.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            protection_plan: (&item.protection_plan).into(),
            line_total: item.line_total.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingLegResponse {
    pub leg_kind: LegKind,
    pub status: LegStatus,
    pub tracking_ref: String,
    pub label_url: Option<String>,
    pub courier_name: Option<String>,
    pub note: Option<String>,
    pub started_at: String,
    pub completed_at: Option<String>,
}

impl From<&ShippingLeg> for ShippingLegResponse {
    fn from(leg: &ShippingLeg) -> Self {
        Self {
            leg_kind: leg.kind,
            status: leg.status,
            tracking_ref: leg.tracking_ref.clone(),
            label_url: leg.label_url.clone(),
            courier_name: leg.courier_name.clone(),
            note: leg.note.clone(),
            started_at: leg.started_at.to_rfc3339(),
            completed_at: leg.completed_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Buyer-facing order. The internal platform fee is never included.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub items: Vec<OrderItemResponse>,
    pub shipping_address: Address,
    pub breakdown: BuyerBreakdown,
    pub total_amount: String,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub gateway_order_id: Option<String>,
    pub shipping_legs: Vec<ShippingLegResponse>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            items: order.items.iter().map(Into::into).collect(),
            shipping_address: order.shipping_address.clone(),
            breakdown: order.breakdown.buyer_view(),
            total_amount: order.total_amount.to_string(),
            payment_status: order.payment_status,
            fulfillment_status: order.fulfillment_status,
            gateway_order_id: order.gateway_order_id.clone(),
            shipping_legs: order.shipping_legs.iter().map(Into::into).collect(),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingStatusResponse {
    pub order_id: Uuid,
    pub fulfillment_status: FulfillmentStatus,
    pub legs: Vec<ShippingLegResponse>,
}

impl From<&Order> for ShippingStatusResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            fulfillment_status: order.fulfillment_status,
            legs: order.shipping_legs.iter().map(Into::into).collect(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders/{id}
///
/// Returns the order with its items, legs and statuses.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let order = web::block(move || orders.get_order(order_id)).await??;
    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}

/// GET /orders
///
/// Returns a paginated list of orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    orders: web::Data<Orders>,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || orders.list_orders(page, limit)).await??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.iter().map(Into::into).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// GET /orders/{id}/shipping
///
/// Read-only view of the shipping legs and the derived order status.
#[utoipa::path(
    get,
    path = "/orders/{id}/shipping",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Shipping status", body = ShippingStatusResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "shipping"
)]
pub async fn get_shipping(
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();
    let order = web::block(move || orders.get_order(order_id)).await??;
    Ok(HttpResponse::Ok().json(ShippingStatusResponse::from(&order)))
}
