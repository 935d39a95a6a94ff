use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use uuid::Uuid;

use super::shipping::{LegKind, LegStatus};

/// Order lifecycle events. They are written to the outbox table in the same
/// transaction as the state change they describe.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    OrderPlaced {
        buyer_id: Uuid,
        total_amount: BigDecimal,
        item_count: usize,
    },
    PaymentCaptured {
        gateway_payment_id: String,
        amount: BigDecimal,
    },
    PaymentFailed {
        gateway_order_id: Option<String>,
    },
    ShippingLegCreated {
        leg_kind: LegKind,
        tracking_ref: String,
    },
    ShippingLegUpdated {
        leg_kind: LegKind,
        status: LegStatus,
        note: Option<String>,
    },
    OrderCancelled {
        cancelled_legs: usize,
    },
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced { .. } => "OrderPlaced",
            OrderEvent::PaymentCaptured { .. } => "PaymentCaptured",
            OrderEvent::PaymentFailed { .. } => "PaymentFailed",
            OrderEvent::ShippingLegCreated { .. } => "ShippingLegCreated",
            OrderEvent::ShippingLegUpdated { .. } => "ShippingLegUpdated",
            OrderEvent::OrderCancelled { .. } => "OrderCancelled",
        }
    }

    pub fn payload(&self, order_id: Uuid) -> Value {
        let details = match self {
            OrderEvent::OrderPlaced {
                buyer_id,
                total_amount,
                item_count,
            } => json!({
                "buyer_id": buyer_id,
                "total_amount": total_amount.to_string(),
                "item_count": item_count,
            }),
            OrderEvent::PaymentCaptured {
                gateway_payment_id,
                amount,
            } => json!({
                "gateway_payment_id": gateway_payment_id,
                "amount": amount.to_string(),
            }),
            OrderEvent::PaymentFailed { gateway_order_id } => json!({
                "gateway_order_id": gateway_order_id,
            }),
            OrderEvent::ShippingLegCreated {
                leg_kind,
                tracking_ref,
            } => json!({
                "leg_kind": leg_kind.as_str(),
                "tracking_ref": tracking_ref,
            }),
            OrderEvent::ShippingLegUpdated {
                leg_kind,
                status,
                note,
            } => json!({
                "leg_kind": leg_kind.as_str(),
                "status": status.as_str(),
                "note": note,
            }),
            OrderEvent::OrderCancelled { cancelled_legs } => json!({
                "cancelled_legs": cancelled_legs,
            }),
        };

        json!({
            "order_id": order_id,
            "event_type": self.event_type(),
            "data": details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_order_id_and_type() {
        let order_id = Uuid::new_v4();
        let event = OrderEvent::ShippingLegUpdated {
            leg_kind: LegKind::OriginToHub,
            status: LegStatus::Completed,
            note: Some("delivered to hub".to_string()),
        };

        let payload = event.payload(order_id);

        assert_eq!(payload["order_id"], json!(order_id));
        assert_eq!(payload["event_type"], "ShippingLegUpdated");
        assert_eq!(payload["data"]["leg_kind"], "origin_to_hub");
        assert_eq!(payload["data"]["status"], "completed");
    }

    #[test]
    fn amounts_are_serialized_as_strings() {
        let event = OrderEvent::OrderPlaced {
            buyer_id: Uuid::new_v4(),
            total_amount: BigDecimal::from(2109),
            item_count: 1,
        };
        assert_eq!(event.payload(Uuid::new_v4())["data"]["total_amount"], "2109");
    }
}
