use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::orders::ProtectionPlanResponse;
use crate::domain::cart::{Cart, CartItem, ProtectionChoice};
use crate::domain::pricing::BuyerBreakdown;
use crate::errors::AppError;
use crate::Carts;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProtectionRequest {
    pub selected: bool,
    /// Decimal price as a string, e.g. "499". Omit to use the default price
    /// for the item.
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub price: Option<BigDecimal>,
}

impl From<ProtectionRequest> for ProtectionChoice {
    fn from(req: ProtectionRequest) -> Self {
        ProtectionChoice {
            selected: req.selected,
            price: req.price,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default)]
    pub protection_plan: Option<ProtectionRequest>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
    pub protection_plan: ProtectionPlanResponse,
    pub line_total: String,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            protection_plan: (&item.protection_plan).into(),
            line_total: item.line_total().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub owner_id: Uuid,
    pub version: i32,
    pub items: Vec<CartItemResponse>,
    pub subtotal: String,
    pub protection_plan_total: String,
    pub total_item_count: i64,
    pub grand_total: String,
    pub updated_at: String,
}

impl From<&Cart> for CartResponse {
    fn from(cart: &Cart) -> Self {
        let totals = cart.totals();
        Self {
            owner_id: cart.owner_id,
            version: cart.version,
            items: cart.items().iter().map(Into::into).collect(),
            subtotal: totals.subtotal.to_string(),
            protection_plan_total: totals.protection_plan_total.to_string(),
            total_item_count: totals.total_item_count,
            grand_total: totals.grand_total.to_string(),
            updated_at: cart.updated_at.to_rfc3339(),
        }
    }
}

fn cart_ok(cart: &Cart) -> HttpResponse {
    HttpResponse::Ok().json(CartResponse::from(cart))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /carts/{owner_id}
///
/// Returns the owner's cart, or an empty one if nothing was added yet.
#[utoipa::path(
    get,
    path = "/carts/{owner_id}",
    params(("owner_id" = Uuid, Path, description = "Cart owner UUID")),
    responses(
        (status = 200, description = "Cart", body = CartResponse),
        (status = 500, description = "Internal server error"),
    ),
    tag = "carts"
)]
pub async fn get_cart(
    carts: web::Data<Carts>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let owner_id = path.into_inner();
    let cart = web::block(move || carts.get_cart(owner_id)).await??;
    Ok(cart_ok(&cart))
}

#[utoipa::path(
    delete,
    path = "/carts/{owner_id}",
    params(("owner_id" = Uuid, Path, description = "Cart owner UUID")),
    responses((status = 204, description = "Cart emptied")),
    tag = "carts"
)]
pub async fn clear_cart(
    carts: web::Data<Carts>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let owner_id = path.into_inner();
    web::block(move || carts.clear(owner_id)).await??;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /carts/{owner_id}/summary
///
/// Checkout breakdown as the buyer sees it.
#[utoipa::path(
    get,
    path = "/carts/{owner_id}/summary",
    params(("owner_id" = Uuid, Path, description = "Cart owner UUID")),
    responses((status = 200, description = "Checkout summary", body = BuyerBreakdown)),
    tag = "carts"
)]
pub async fn cart_summary(
    carts: web::Data<Carts>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let owner_id = path.into_inner();
    let summary = web::block(move || carts.summary(owner_id)).await??;
    Ok(HttpResponse::Ok().json(summary))
}

/// POST /carts/{owner_id}/items
///
/// Adds a product, merging with an existing line for the same product.
#[utoipa::path(
    post,
    path = "/carts/{owner_id}/items",
    params(("owner_id" = Uuid, Path, description = "Cart owner UUID")),
    request_body = AddItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Cart changed concurrently"),
    ),
    tag = "carts"
)]
pub async fn add_item(
    carts: web::Data<Carts>,
    path: web::Path<Uuid>,
    body: web::Json<AddItemRequest>,
) -> Result<HttpResponse, AppError> {
    let owner_id = path.into_inner();
    let body = body.into_inner();
    let protection = body.protection_plan.map(ProtectionChoice::from);

    let cart = web::block(move || {
        carts.add_item(owner_id, body.product_id, body.quantity, protection)
    })
    .await??;
    Ok(cart_ok(&cart))
}

#[utoipa::path(
    patch,
    path = "/carts/{owner_id}/items/{product_id}",
    params(
        ("owner_id" = Uuid, Path, description = "Cart owner UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Invalid quantity or insufficient stock"),
        (status = 404, description = "Cart or line not found"),
    ),
    tag = "carts"
)]
pub async fn update_quantity(
    carts: web::Data<Carts>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<UpdateQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let (owner_id, product_id) = path.into_inner();
    let quantity = body.quantity;
    let cart = web::block(move || carts.update_quantity(owner_id, product_id, quantity)).await??;
    Ok(cart_ok(&cart))
}

#[utoipa::path(
    delete,
    path = "/carts/{owner_id}/items/{product_id}",
    params(
        ("owner_id" = Uuid, Path, description = "Cart owner UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart or line not found"),
    ),
    tag = "carts"
)]
pub async fn remove_item(
    carts: web::Data<Carts>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (owner_id, product_id) = path.into_inner();
    let cart = web::block(move || carts.remove_item(owner_id, product_id)).await??;
    Ok(cart_ok(&cart))
}

/// PUT /carts/{owner_id}/items/{product_id}/protection
///
/// Turns the protection plan on or off for one line.
#[utoipa::path(
    put,
    path = "/carts/{owner_id}/items/{product_id}/protection",
    params(
        ("owner_id" = Uuid, Path, description = "Cart owner UUID"),
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = ProtectionRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Negative protection price"),
        (status = 404, description = "Cart or line not found"),
    ),
    tag = "carts"
)]
pub async fn set_protection(
    carts: web::Data<Carts>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<ProtectionRequest>,
) -> Result<HttpResponse, AppError> {
    let (owner_id, product_id) = path.into_inner();
    let choice = ProtectionChoice::from(body.into_inner());
    let cart = web::block(move || carts.set_protection(owner_id, product_id, choice)).await??;
    Ok(cart_ok(&cart))
}
