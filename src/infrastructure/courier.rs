//! Courier clients.
//!
//! `HttpCourier` talks to the courier aggregator's REST API. `MockCourier`
//! stands in when no courier is configured: it books fake shipments and
//! reports every one of them as delivered, so the relay can be exercised end
//! to end in development.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::map_reqwest;
use crate::domain::errors::CollaboratorError;
use crate::domain::order::Address;
use crate::domain::ports::CourierGateway;
use crate::domain::shipping::{Parcel, Shipment, ShipmentRequest, TrackingStatus};

#[derive(Debug, Clone)]
pub struct CourierConfig {
    pub base_url: String,
    pub api_token: String,
    pub timeout: Duration,
}

pub struct HttpCourier {
    client: Client,
    config: CourierConfig,
}

#[derive(Debug, Serialize)]
struct CreateShipmentBody<'a> {
    reference: &'a str,
    pickup: &'a Address,
    delivery: &'a Address,
    parcel: &'a Parcel,
    declared_value: String,
}

#[derive(Debug, Deserialize)]
struct ShipmentResponse {
    awb_code: String,
    #[serde(default)]
    label_url: Option<String>,
    #[serde(default)]
    courier_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackingResponse {
    current_status: String,
}

impl HttpCourier {
    pub fn new(config: CourierConfig) -> Result<Self, CollaboratorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let detail = response.text().await.unwrap_or_default();
        if status.is_server_error() {
            Err(CollaboratorError::Unavailable(format!("courier returned {status}: {detail}")))
        } else {
            Err(CollaboratorError::Rejected(format!("courier returned {status}: {detail}")))
        }
    }
}

/// True when a courier status means the parcel reached its destination.
pub fn is_delivered_status(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("DELIVERED")
}

#[async_trait]
impl CourierGateway for HttpCourier {
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<Shipment, CollaboratorError> {
        let body = CreateShipmentBody {
            reference: &request.reference,
            pickup: &request.origin,
            delivery: &request.destination,
            parcel: &request.parcel,
            declared_value: request.declared_value.to_string(),
        };

        let response = self
            .client
            .post(self.url("shipments"))
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest)?;
        let created: ShipmentResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest)?;

        log::info!(
            "Courier booked shipment {} as {}",
            request.reference,
            created.awb_code
        );
        Ok(Shipment {
            tracking_ref: created.awb_code,
            label_url: created.label_url,
            courier_name: created.courier_name,
        })
    }

    async fn track_status(&self, tracking_ref: &str) -> Result<TrackingStatus, CollaboratorError> {
        let response = self
            .client
            .get(self.url(&format!("shipments/{tracking_ref}/tracking")))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(map_reqwest)?;
        let tracking: TrackingResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(map_reqwest)?;

        Ok(TrackingStatus {
            delivered: is_delivered_status(&tracking.current_status),
            raw_status: tracking.current_status,
        })
    }
}

#[derive(Debug, Default, Clone)]
pub struct MockCourier;

#[async_trait]
impl CourierGateway for MockCourier {
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<Shipment, CollaboratorError> {
        let awb = format!("MOCK{}", &Uuid::new_v4().simple().to_string()[..12]).to_uppercase();
        log::info!("Mock courier booked {} as {}", request.reference, awb);
        Ok(Shipment {
            tracking_ref: awb,
            label_url: None,
            courier_name: Some("Mock Courier".to_string()),
        })
    }

    async fn track_status(&self, _tracking_ref: &str) -> Result<TrackingStatus, CollaboratorError> {
        Ok(TrackingStatus {
            delivered: true,
            raw_status: "DELIVERED".to_string(),
        })
    }
}
