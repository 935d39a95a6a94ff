use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::orders::OrderResponse;
use crate::application::checkout_service::PaymentConfirmation;
use crate::domain::order::Address;
use crate::errors::AppError;
use crate::Checkout;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub buyer_id: Uuid,
    pub shipping_address: Address,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub gateway_order_id: String,
    /// Amount in the currency's minor unit (paise for INR).
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub payment: PaymentIntentResponse,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// POST /checkout
///
/// Turns the buyer's cart into a pending order and opens a payment intent
/// for its grand total. Nothing is written if the gateway call fails.
#[utoipa::path(
    post,
    path = "/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created, awaiting payment", body = CheckoutResponse),
        (status = 400, description = "Empty cart, invalid address or insufficient stock"),
        (status = 502, description = "Payment gateway unavailable"),
    ),
    tag = "checkout"
)]
pub async fn checkout(
    service: web::Data<Checkout>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let session = service.checkout(body.buyer_id, body.shipping_address).await?;

    Ok(HttpResponse::Created().json(CheckoutResponse {
        order: OrderResponse::from(&session.order),
        payment: PaymentIntentResponse {
            gateway_order_id: session.payment.gateway_order_id,
            amount: session.payment.amount_minor,
            currency: session.payment.currency,
        },
    }))
}

/// POST /checkout/verify
///
/// Checks the gateway's payment signature and captures the payment.
#[utoipa::path(
    post,
    path = "/checkout/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment captured", body = OrderResponse),
        (status = 400, description = "Signature mismatch"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order already paid with another payment"),
    ),
    tag = "checkout"
)]
pub async fn verify_payment(
    service: web::Data<Checkout>,
    body: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let order = service
        .verify_payment(PaymentConfirmation {
            order_id: body.order_id,
            gateway_order_id: body.gateway_order_id,
            gateway_payment_id: body.gateway_payment_id,
            signature: body.signature,
        })
        .await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(&order)))
}
