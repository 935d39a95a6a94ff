//! Payment gateway client.
//!
//! Speaks the order-then-capture protocol used by Indian card gateways: we
//! create a gateway order for the amount in paise, the buyer pays against it
//! in the browser, and the gateway hands back a payment id plus an
//! HMAC-SHA256 signature over `"{order_id}|{payment_id}"` keyed with our
//! secret.

use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::map_reqwest;
use crate::domain::errors::CollaboratorError;
use crate::domain::ports::{PaymentGateway, PaymentIntent};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
    pub timeout: Duration,
}

pub struct HttpPaymentGateway {
    client: Client,
    config: PaymentConfig,
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GatewayOrder {
    id: String,
    amount: i64,
    currency: String,
}

impl HttpPaymentGateway {
    pub fn new(config: PaymentConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }
}

/// Amount in the currency's minor unit (paise for INR).
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, CollaboratorError> {
    (amount * &BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| CollaboratorError::Rejected(format!("amount {amount} out of range")))
}

/// Check a gateway signature without leaking timing information.
pub fn signature_matches(
    secret: &str,
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
) -> bool {
    let Ok(expected) = hex::decode(signature) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{gateway_order_id}|{gateway_payment_id}").as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment_intent(
        &self,
        amount: &BigDecimal,
        receipt: &str,
    ) -> Result<PaymentIntent, CollaboratorError> {
        let body = CreateOrderBody {
            amount: to_minor_units(amount)?,
            currency: &self.config.currency,
            receipt,
        };

        let response = self
            .client
            .post(format!("{}/orders", self.config.base_url.trim_end_matches('/')))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Rejected(format!(
                "payment gateway returned {status}: {detail}"
            )));
        }

        let order: GatewayOrder = response.json().await.map_err(map_reqwest)?;
        log::debug!("Created gateway order {} for receipt {}", order.id, receipt);
        Ok(PaymentIntent {
            gateway_order_id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
        })
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        signature_matches(
            &self.config.key_secret,
            gateway_order_id,
            gateway_payment_id,
            signature,
        )
    }
}
