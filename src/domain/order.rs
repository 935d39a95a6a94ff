use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::cart::ProtectionPlan;
use super::errors::DomainError;
use super::events::OrderEvent;
use super::pricing::CheckoutBreakdown;
use super::shipping::{derive_fulfillment_status, LegKind, LegStatus, Shipment, ShippingLeg};

// ── Statuses ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(DomainError::Internal(format!("unknown payment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl FulfillmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FulfillmentStatus::Pending => "pending",
            FulfillmentStatus::Processing => "processing",
            FulfillmentStatus::Shipped => "shipped",
            FulfillmentStatus::Delivered => "delivered",
            FulfillmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FulfillmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(FulfillmentStatus::Pending),
            "processing" => Ok(FulfillmentStatus::Processing),
            "shipped" => Ok(FulfillmentStatus::Shipped),
            "delivered" => Ok(FulfillmentStatus::Delivered),
            "cancelled" => Ok(FulfillmentStatus::Cancelled),
            other => Err(DomainError::Internal(format!(
                "unknown fulfillment status '{other}'"
            ))),
        }
    }
}

// ── Address ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub name: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl Address {
    pub fn validate(&self) -> Result<(), DomainError> {
        let required = [
            ("name", &self.name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("state", &self.state),
            ("country", &self.country),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(DomainError::InvalidInput(format!("address {field} is required")));
        }

        if self.postal_code.len() != 6 || !self.postal_code.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidInput(
                "postal code must be 6 digits".to_string(),
            ));
        }

        let digits = self.phone.strip_prefix('+').unwrap_or(&self.phone);
        if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidInput(
                "phone must be 10 to 15 digits".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Order ────────────────────────────────────────────────────────────────────

/// Frozen copy of a cart line taken at checkout.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub protection_plan: ProtectionPlan,
    pub line_total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: Address,
    pub breakdown: CheckoutBreakdown,
    pub total_amount: BigDecimal,
    pub payment_status: PaymentStatus,
    pub fulfillment_status: FulfillmentStatus,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub shipping_legs: Vec<ShippingLeg>,
    /// Number of changes applied since placement. Every mutating operation
    /// advances it by one; a write of version `n` requires the stored order
    /// to still be at `n - 1`.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fulfillment change to persist atomically: leg updates, at most one new
/// leg, the new order-level status and the events describing the change.
#[derive(Debug, Clone)]
pub struct FulfillmentUpdate {
    pub order_id: Uuid,
    /// Order version after this change.
    pub version: i32,
    pub updated_legs: Vec<ShippingLeg>,
    pub new_leg: Option<ShippingLeg>,
    pub fulfillment_status: FulfillmentStatus,
    pub events: Vec<OrderEvent>,
}

#[derive(Debug, Clone)]
pub struct ListResult {
    pub items: Vec<Order>,
    pub total: i64,
}

impl Order {
    pub fn place(
        buyer_id: Uuid,
        items: Vec<OrderItem>,
        shipping_address: Address,
        breakdown: CheckoutBreakdown,
        gateway_order_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            items,
            shipping_address,
            total_amount: breakdown.grand_total.clone(),
            breakdown,
            payment_status: PaymentStatus::Pending,
            fulfillment_status: FulfillmentStatus::Pending,
            gateway_order_id: Some(gateway_order_id),
            gateway_payment_id: None,
            shipping_legs: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn leg(&self, kind: LegKind) -> Option<&ShippingLeg> {
        self.shipping_legs.iter().find(|l| l.kind == kind)
    }

    pub fn is_cancelled(&self) -> bool {
        self.fulfillment_status == FulfillmentStatus::Cancelled
    }

    /// Distinct sellers in this order, in item order.
    pub fn seller_ids(&self) -> Vec<Uuid> {
        let mut sellers: Vec<Uuid> = Vec::new();
        for item in &self.items {
            if !sellers.contains(&item.seller_id) {
                sellers.push(item.seller_id);
            }
        }
        sellers
    }

    /// Record a verified payment. Returns `None` when the same payment was
    /// already recorded.
    pub fn capture_payment(
        &mut self,
        gateway_payment_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<OrderEvent>, DomainError> {
        match self.payment_status {
            PaymentStatus::Paid if self.gateway_payment_id.as_deref() == Some(gateway_payment_id) => {
                Ok(None)
            }
            PaymentStatus::Paid => Err(DomainError::Conflict(
                "order was already paid with a different payment".to_string(),
            )),
            PaymentStatus::Failed => Err(DomainError::PaymentVerification(
                "payment for this order already failed; start a new checkout".to_string(),
            )),
            PaymentStatus::Pending => {
                self.payment_status = PaymentStatus::Paid;
                self.gateway_payment_id = Some(gateway_payment_id.to_string());
                self.touch(now);
                Ok(Some(OrderEvent::PaymentCaptured {
                    gateway_payment_id: gateway_payment_id.to_string(),
                    amount: self.total_amount.clone(),
                }))
            }
        }
    }

    pub fn fail_payment(&mut self, now: DateTime<Utc>) -> Result<OrderEvent, DomainError> {
        if self.payment_status == PaymentStatus::Paid {
            return Err(DomainError::Conflict("order is already paid".to_string()));
        }
        self.payment_status = PaymentStatus::Failed;
        self.touch(now);
        Ok(OrderEvent::PaymentFailed {
            gateway_order_id: self.gateway_order_id.clone(),
        })
    }

    fn ensure_open_for_fulfillment(&self) -> Result<(), DomainError> {
        if self.payment_status != PaymentStatus::Paid {
            return Err(DomainError::InvariantViolation(
                "order payment has not been captured".to_string(),
            ));
        }
        if self.is_cancelled() {
            return Err(DomainError::InvariantViolation("order is cancelled".to_string()));
        }
        Ok(())
    }

    /// Check that a `kind` leg may be created now.
    pub fn ensure_can_begin_leg(&self, kind: LegKind) -> Result<(), DomainError> {
        self.ensure_open_for_fulfillment()?;
        if self.leg(kind).is_some() {
            return Err(DomainError::InvariantViolation(format!(
                "order already has a {kind} leg"
            )));
        }
        if kind == LegKind::HubToDestination {
            let origin_done = self
                .leg(LegKind::OriginToHub)
                .is_some_and(|l| l.status == LegStatus::Completed);
            if !origin_done {
                return Err(DomainError::InvariantViolation(
                    "hub_to_destination requires a completed origin_to_hub leg".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn begin_leg(
        &mut self,
        kind: LegKind,
        shipment: Shipment,
        now: DateTime<Utc>,
    ) -> Result<FulfillmentUpdate, DomainError> {
        self.ensure_can_begin_leg(kind)?;

        let leg = ShippingLeg::start(kind, shipment, now);
        self.shipping_legs.push(leg.clone());
        self.refresh_fulfillment(now);

        Ok(FulfillmentUpdate {
            order_id: self.id,
            version: self.version,
            updated_legs: Vec::new(),
            events: vec![OrderEvent::ShippingLegCreated {
                leg_kind: kind,
                tracking_ref: leg.tracking_ref.clone(),
            }],
            new_leg: Some(leg),
            fulfillment_status: self.fulfillment_status,
        })
    }

    pub fn transition_leg(
        &mut self,
        kind: LegKind,
        next: LegStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<FulfillmentUpdate, DomainError> {
        self.ensure_open_for_fulfillment()?;
        let leg = self.leg_mut(kind)?;
        leg.transition(next, note.clone(), now)?;
        let leg = leg.clone();
        self.refresh_fulfillment(now);

        Ok(FulfillmentUpdate {
            order_id: self.id,
            version: self.version,
            updated_legs: vec![leg],
            new_leg: None,
            fulfillment_status: self.fulfillment_status,
            events: vec![OrderEvent::ShippingLegUpdated {
                leg_kind: kind,
                status: next,
                note,
            }],
        })
    }

    /// True while the first leg is live and the second has not been created.
    pub fn awaiting_forward(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
            && !self.is_cancelled()
            && self.leg(LegKind::HubToDestination).is_none()
            && self
                .leg(LegKind::OriginToHub)
                .is_some_and(|l| l.status != LegStatus::Cancelled)
    }

    /// Complete the first leg (if it is not already) and start the second one
    /// with `shipment`.
    pub fn forward_to_destination(
        &mut self,
        shipment: Shipment,
        now: DateTime<Utc>,
    ) -> Result<FulfillmentUpdate, DomainError> {
        if !self.awaiting_forward() {
            return Err(DomainError::InvariantViolation(
                "order is not waiting to be forwarded".to_string(),
            ));
        }

        let mut updated_legs = Vec::new();
        let mut events = Vec::new();

        let origin = self.leg_mut(LegKind::OriginToHub)?;
        if origin.status != LegStatus::Completed {
            let note = Some("delivered to hub".to_string());
            origin.transition(LegStatus::Completed, note.clone(), now)?;
            updated_legs.push(origin.clone());
            events.push(OrderEvent::ShippingLegUpdated {
                leg_kind: LegKind::OriginToHub,
                status: LegStatus::Completed,
                note,
            });
        }

        let mut begun = self.begin_leg(LegKind::HubToDestination, shipment, now)?;
        events.append(&mut begun.events);

        Ok(FulfillmentUpdate {
            order_id: self.id,
            version: begun.version,
            updated_legs,
            new_leg: begun.new_leg,
            fulfillment_status: self.fulfillment_status,
            events,
        })
    }

    /// Cancel fulfillment. Allowed until the goods leave the hub.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<FulfillmentUpdate, DomainError> {
        if !matches!(
            self.fulfillment_status,
            FulfillmentStatus::Pending | FulfillmentStatus::Processing
        ) {
            return Err(DomainError::InvariantViolation(format!(
                "order cannot be cancelled once {}",
                self.fulfillment_status
            )));
        }

        let mut updated_legs = Vec::new();
        for leg in self.shipping_legs.iter_mut().filter(|l| !l.status.is_terminal()) {
            leg.transition(LegStatus::Cancelled, Some("order cancelled".to_string()), now)?;
            updated_legs.push(leg.clone());
        }
        self.fulfillment_status = FulfillmentStatus::Cancelled;
        self.touch(now);

        Ok(FulfillmentUpdate {
            order_id: self.id,
            version: self.version,
            events: vec![OrderEvent::OrderCancelled {
                cancelled_legs: updated_legs.len(),
            }],
            updated_legs,
            new_leg: None,
            fulfillment_status: self.fulfillment_status,
        })
    }

    fn leg_mut(&mut self, kind: LegKind) -> Result<&mut ShippingLeg, DomainError> {
        self.shipping_legs
            .iter_mut()
            .find(|l| l.kind == kind)
            .ok_or_else(|| DomainError::NotFound(format!("{kind} leg")))
    }

    fn refresh_fulfillment(&mut self, now: DateTime<Utc>) {
        self.fulfillment_status = derive_fulfillment_status(&self.shipping_legs);
        self.touch(now);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }
}
