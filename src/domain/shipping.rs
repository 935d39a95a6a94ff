//! Shipping legs and the per-leg state machine.
//!
//! Goods travel in two legs: the seller ships to the hub (`origin_to_hub`)
//! and the hub re-dispatches to the buyer (`hub_to_destination`).
//!
//! ```text
//!   pending ──► in_transit ──► completed
//!      │  └───────────────────────▲
//!      │             │
//!      └──► cancelled ◄┘
//! ```
//!
//! `completed` and `cancelled` are terminal.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::errors::DomainError;
use super::order::{Address, FulfillmentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LegKind {
    OriginToHub,
    HubToDestination,
}

impl LegKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegKind::OriginToHub => "origin_to_hub",
            LegKind::HubToDestination => "hub_to_destination",
        }
    }
}

impl fmt::Display for LegKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "origin_to_hub" => Ok(LegKind::OriginToHub),
            "hub_to_destination" => Ok(LegKind::HubToDestination),
            other => Err(DomainError::InvalidInput(format!("unknown leg kind '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LegStatus {
    Pending,
    InTransit,
    Completed,
    Cancelled,
}

impl LegStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegStatus::Pending => "pending",
            LegStatus::InTransit => "in_transit",
            LegStatus::Completed => "completed",
            LegStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LegStatus::Completed | LegStatus::Cancelled)
    }

    /// Forward-only. A single confirmation may move a leg straight from
    /// `pending` to `completed`.
    pub fn can_transition_to(&self, next: LegStatus) -> bool {
        use LegStatus::*;
        matches!(
            (self, next),
            (Pending, InTransit)
                | (Pending, Completed)
                | (Pending, Cancelled)
                | (InTransit, Completed)
                | (InTransit, Cancelled)
        )
    }
}

impl fmt::Display for LegStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LegStatus::Pending),
            "in_transit" => Ok(LegStatus::InTransit),
            "completed" => Ok(LegStatus::Completed),
            "cancelled" => Ok(LegStatus::Cancelled),
            other => Err(DomainError::InvalidInput(format!("unknown leg status '{other}'"))),
        }
    }
}

/// Physical parcel dimensions sent to the courier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    pub weight_grams: i32,
    pub length_cm: i32,
    pub breadth_cm: i32,
    pub height_cm: i32,
}

impl Parcel {
    /// Combine `(parcel, quantity)` pairs into one box: weights add up, each
    /// dimension takes the largest item.
    pub fn combine<'a>(parts: impl IntoIterator<Item = (&'a Parcel, i32)>) -> Parcel {
        parts
            .into_iter()
            .fold(Parcel::default(), |acc, (parcel, quantity)| Parcel {
                weight_grams: acc
                    .weight_grams
                    .saturating_add(parcel.weight_grams.saturating_mul(quantity)),
                length_cm: acc.length_cm.max(parcel.length_cm),
                breadth_cm: acc.breadth_cm.max(parcel.breadth_cm),
                height_cm: acc.height_cm.max(parcel.height_cm),
            })
    }
}

/// What the courier hands back when a shipment is booked.
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub tracking_ref: String,
    pub label_url: Option<String>,
    pub courier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    /// Our own reference for the shipment, `<order id>/<leg kind>`.
    pub reference: String,
    pub origin: Address,
    pub destination: Address,
    pub parcel: Parcel,
    pub declared_value: BigDecimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingStatus {
    pub delivered: bool,
    pub raw_status: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingLeg {
    pub id: Uuid,
    pub kind: LegKind,
    pub status: LegStatus,
    pub tracking_ref: String,
    pub label_url: Option<String>,
    pub courier_name: Option<String>,
    pub note: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl ShippingLeg {
    pub fn start(kind: LegKind, shipment: Shipment, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            status: LegStatus::Pending,
            tracking_ref: shipment.tracking_ref,
            label_url: shipment.label_url,
            courier_name: shipment.courier_name,
            note: None,
            started_at: now,
            completed_at: None,
            updated_at: now,
        }
    }

    pub fn transition(
        &mut self,
        next: LegStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvariantViolation(format!(
                "{} leg cannot move from {} to {}",
                self.kind, self.status, next
            )));
        }
        self.status = next;
        if next == LegStatus::Completed {
            self.completed_at = Some(now);
        }
        if note.is_some() {
            self.note = note;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Order-level fulfillment status implied by the legs.
pub fn derive_fulfillment_status(legs: &[ShippingLeg]) -> FulfillmentStatus {
    let status_of = |kind| legs.iter().find(|l| l.kind == kind).map(|l| l.status);

    match status_of(LegKind::HubToDestination) {
        Some(LegStatus::Completed) => FulfillmentStatus::Delivered,
        Some(LegStatus::InTransit) => FulfillmentStatus::Shipped,
        _ if status_of(LegKind::OriginToHub) == Some(LegStatus::Completed) => {
            FulfillmentStatus::Processing
        }
        _ => FulfillmentStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leg(kind: LegKind, status: LegStatus) -> ShippingLeg {
        let mut leg = ShippingLeg::start(
            kind,
            Shipment {
                tracking_ref: "AWB123".to_string(),
                label_url: None,
                courier_name: None,
            },
            Utc::now(),
        );
        leg.status = status;
        leg
    }

    #[test]
    fn forward_path_succeeds() {
        let mut l = leg(LegKind::OriginToHub, LegStatus::Pending);
        l.transition(LegStatus::InTransit, None, Utc::now()).expect("pending -> in_transit");
        assert!(l.completed_at.is_none());
        l.transition(LegStatus::Completed, Some("at hub".into()), Utc::now())
            .expect("in_transit -> completed");
        assert_eq!(l.status, LegStatus::Completed);
        assert!(l.completed_at.is_some());
        assert_eq!(l.note.as_deref(), Some("at hub"));
    }

    #[test]
    fn pending_may_complete_directly() {
        let mut l = leg(LegKind::OriginToHub, LegStatus::Pending);
        assert!(l.transition(LegStatus::Completed, None, Utc::now()).is_ok());
    }

    #[test]
    fn backward_and_terminal_transitions_are_rejected() {
        let mut done = leg(LegKind::OriginToHub, LegStatus::Completed);
        assert!(matches!(
            done.transition(LegStatus::InTransit, None, Utc::now()),
            Err(DomainError::InvariantViolation(_))
        ));
        assert_eq!(done.status, LegStatus::Completed);

        let mut cancelled = leg(LegKind::HubToDestination, LegStatus::Cancelled);
        assert!(cancelled.transition(LegStatus::Pending, None, Utc::now()).is_err());

        let mut moving = leg(LegKind::HubToDestination, LegStatus::InTransit);
        assert!(moving.transition(LegStatus::Pending, None, Utc::now()).is_err());
        assert!(moving.transition(LegStatus::InTransit, None, Utc::now()).is_err());
    }

    #[test]
    fn cancellation_only_from_open_states() {
        assert!(LegStatus::Pending.can_transition_to(LegStatus::Cancelled));
        assert!(LegStatus::InTransit.can_transition_to(LegStatus::Cancelled));
        assert!(!LegStatus::Completed.can_transition_to(LegStatus::Cancelled));
    }

    #[test]
    fn fulfillment_status_derivation() {
        use FulfillmentStatus::*;
        use LegKind::*;
        use LegStatus as S;

        assert_eq!(derive_fulfillment_status(&[]), Pending);
        assert_eq!(derive_fulfillment_status(&[leg(OriginToHub, S::InTransit)]), Pending);
        assert_eq!(derive_fulfillment_status(&[leg(OriginToHub, S::Completed)]), Processing);
        assert_eq!(
            derive_fulfillment_status(&[
                leg(OriginToHub, S::Completed),
                leg(HubToDestination, S::Pending)
            ]),
            Processing
        );
        assert_eq!(
            derive_fulfillment_status(&[
                leg(OriginToHub, S::Completed),
                leg(HubToDestination, S::InTransit)
            ]),
            Shipped
        );
        assert_eq!(
            derive_fulfillment_status(&[
                leg(OriginToHub, S::Completed),
                leg(HubToDestination, S::Completed)
            ]),
            Delivered
        );
    }

    #[test]
    fn parcel_combine_adds_weight_and_keeps_largest_dimensions() {
        let small = Parcel {
            weight_grams: 200,
            length_cm: 10,
            breadth_cm: 5,
            height_cm: 30,
        };
        let big = Parcel {
            weight_grams: 1500,
            length_cm: 40,
            breadth_cm: 20,
            height_cm: 10,
        };
        let combined = Parcel::combine([(&small, 2), (&big, 1)]);
        assert_eq!(
            combined,
            Parcel {
                weight_grams: 1900,
                length_cm: 40,
                breadth_cm: 20,
                height_cm: 30,
            }
        );
    }

    #[test]
    fn leg_kind_and_status_parse() {
        assert_eq!("origin_to_hub".parse::<LegKind>().ok(), Some(LegKind::OriginToHub));
        assert_eq!("in_transit".parse::<LegStatus>().ok(), Some(LegStatus::InTransit));
        assert!("delivered".parse::<LegStatus>().is_err());
    }
}
