use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde_json::Value;
use uuid::Uuid;

use super::cart::Cart;
use super::errors::{CollaboratorError, DomainError};
use super::events::OrderEvent;
use super::order::{FulfillmentUpdate, ListResult, Order};
use super::product::Product;
use super::shipping::{Shipment, ShipmentRequest, TrackingStatus};

// ── Persistence (blocking) ───────────────────────────────────────────────────

pub trait ProductCatalog: Clone + Send + Sync + 'static {
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError>;
    fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError>;
}

pub trait CartRepository: Clone + Send + Sync + 'static {
    fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Cart>, DomainError>;
    /// Persist items and aggregates together. Fails with `Conflict` when the
    /// stored version no longer matches `cart.version`. Returns the saved
    /// cart with its new version.
    fn save(&self, cart: &Cart) -> Result<Cart, DomainError>;
    fn clear(&self, owner_id: Uuid) -> Result<(), DomainError>;
}

pub trait OrderRepository: Clone + Send + Sync + 'static {
    /// Insert the order, its items and an `OrderPlaced` event.
    fn create(&self, order: &Order) -> Result<(), DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError>;
    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    /// Paid, non-cancelled orders with a live `origin_to_hub` leg and no
    /// `hub_to_destination` leg.
    fn find_awaiting_forward(&self) -> Result<Vec<Order>, DomainError>;
    /// Store the payment fields of `order` and `event`. Fails with `Conflict`
    /// when the stored order is no longer at `order.version - 1`.
    fn update_payment(&self, order: &Order, event: OrderEvent) -> Result<(), DomainError>;
    /// Apply a fulfillment update atomically. Fails with `Conflict` when the
    /// stored order is no longer at `update.version - 1` or when a second leg
    /// of the same kind would be created.
    fn apply_fulfillment(&self, update: FulfillmentUpdate) -> Result<(), DomainError>;
}

// ── External collaborators ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub gateway_order_id: String,
    /// Amount in the currency's minor unit.
    pub amount_minor: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount: &BigDecimal,
        receipt: &str,
    ) -> Result<PaymentIntent, CollaboratorError>;

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool;
}

#[async_trait]
pub trait CourierGateway: Send + Sync {
    async fn create_shipment(&self, request: &ShipmentRequest)
        -> Result<Shipment, CollaboratorError>;
    async fn track_status(&self, tracking_ref: &str) -> Result<TrackingStatus, CollaboratorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    Buyer(Uuid),
    Seller(Uuid),
    Operations,
}

/// Fire-and-forget notifications. Callers log failures and carry on.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn notify(
        &self,
        recipient: Recipient,
        message: &str,
        metadata: &Value,
    ) -> Result<(), CollaboratorError>;
}
