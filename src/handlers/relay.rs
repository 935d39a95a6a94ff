use actix_web::{web, HttpResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::orders::{OrderResponse, ShippingStatusResponse};
use crate::application::shipment_relay::MonitorReport;
use crate::domain::order::Address;
use crate::domain::shipping::{LegKind, LegStatus};
use crate::errors::AppError;
use crate::Relay;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DispatchRequest {
    /// Where the courier collects the goods from the seller.
    pub pickup_address: Address,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LegTransitionRequest {
    pub status: LegStatus,
    #[serde(default)]
    pub note: Option<String>,
}

/// POST /orders/{id}/shipping/dispatch
///
/// Books the seller → hub shipment for a paid order.
#[utoipa::path(
    post,
    path = "/orders/{id}/shipping/dispatch",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = DispatchRequest,
    responses(
        (status = 201, description = "First leg created", body = ShippingStatusResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order unpaid, cancelled or already dispatched"),
        (status = 502, description = "Courier unavailable"),
    ),
    tag = "shipping"
)]
pub async fn dispatch_first_leg(
    relay: web::Data<Relay>,
    path: web::Path<Uuid>,
    body: web::Json<DispatchRequest>,
) -> Result<HttpResponse, AppError> {
    let order = relay
        .dispatch_first_leg(path.into_inner(), body.into_inner().pickup_address)
        .await?;
    Ok(HttpResponse::Created().json(ShippingStatusResponse::from(&order)))
}

/// PUT /orders/{id}/shipping/{leg_kind}
///
/// Records a manual status change for one leg. Transitions only move
/// forward.
#[utoipa::path(
    put,
    path = "/orders/{id}/shipping/{leg_kind}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
        ("leg_kind" = LegKind, Path, description = "origin_to_hub or hub_to_destination"),
    ),
    request_body = LegTransitionRequest,
    responses(
        (status = 200, description = "Leg updated", body = ShippingStatusResponse),
        (status = 400, description = "Unknown leg kind"),
        (status = 404, description = "Order or leg not found"),
        (status = 409, description = "Transition not allowed"),
    ),
    tag = "shipping"
)]
pub async fn record_leg_transition(
    relay: web::Data<Relay>,
    path: web::Path<(Uuid, String)>,
    body: web::Json<LegTransitionRequest>,
) -> Result<HttpResponse, AppError> {
    let (order_id, leg_kind) = path.into_inner();
    let kind: LegKind = leg_kind.parse()?;
    let body = body.into_inner();

    let order = relay
        .record_leg_transition(order_id, kind, body.status, body.note)
        .await?;
    Ok(HttpResponse::Ok().json(ShippingStatusResponse::from(&order)))
}

#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already shipped, delivered or cancelled"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    relay: web::Data<Relay>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order = relay.cancel_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}

/// POST /relay/run
///
/// Runs one monitor cycle now instead of waiting for the next tick.
#[utoipa::path(
    post,
    path = "/relay/run",
    responses(
        (status = 200, description = "Cycle finished", body = MonitorReport),
        (status = 500, description = "Internal server error"),
    ),
    tag = "shipping"
)]
pub async fn run_monitor(relay: web::Data<Relay>) -> Result<HttpResponse, AppError> {
    let report = relay.monitor_and_forward().await?;
    Ok(HttpResponse::Ok().json(report))
}
