//! Shipment relay.
//!
//! Drives an order through its two shipping legs. Operators create the first
//! leg and record manual status changes; the monitor polls the courier for
//! first-leg delivery and books the second leg once the hub has the goods.
//!
//! The monitor keeps no state between cycles. Each cycle re-reads the orders
//! that are waiting to be forwarded, so a failed cycle is simply retried by
//! the next one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tokio::time::{interval, timeout, MissedTickBehavior};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{blocking, notify_quietly};
use crate::domain::errors::{CollaboratorError, DomainError};
use crate::domain::order::{Address, FulfillmentUpdate, Order};
use crate::domain::ports::{
    CourierGateway, NotificationChannel, OrderRepository, ProductCatalog, Recipient,
};
use crate::domain::shipping::{LegKind, LegStatus, Parcel, Shipment, ShipmentRequest};

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Warehouse every seller shipment passes through.
    pub hub_address: Address,
    /// Time between monitor cycles.
    pub interval: Duration,
    /// Upper bound on any single courier call.
    pub call_timeout: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct MonitorReport {
    pub checked: usize,
    pub forwarded: usize,
}

pub struct ShipmentRelay<O, P> {
    orders: O,
    catalog: P,
    courier: Arc<dyn CourierGateway>,
    notifier: Arc<dyn NotificationChannel>,
    config: RelayConfig,
}

impl<O: OrderRepository, P: ProductCatalog> ShipmentRelay<O, P> {
    pub fn new(
        orders: O,
        catalog: P,
        courier: Arc<dyn CourierGateway>,
        notifier: Arc<dyn NotificationChannel>,
        config: RelayConfig,
    ) -> Self {
        Self {
            orders,
            catalog,
            courier,
            notifier,
            config,
        }
    }

    /// Book the seller → hub shipment for a paid order.
    pub async fn dispatch_first_leg(
        &self,
        order_id: Uuid,
        pickup: Address,
    ) -> Result<Order, DomainError> {
        pickup.validate()?;
        let mut order = self.load(order_id).await?;
        order.ensure_can_begin_leg(LegKind::OriginToHub)?;

        let request = self
            .shipment_request(&order, LegKind::OriginToHub, pickup, self.config.hub_address.clone())
            .await?;
        let shipment = self.book(&request).await?;

        let update = order.begin_leg(LegKind::OriginToHub, shipment, Utc::now())?;
        self.persist(update).await?;

        log::info!("Order {} dispatched to hub", order.id);
        for seller in order.seller_ids() {
            self.notify(
                Recipient::Seller(seller),
                &order,
                format!("Pickup booked for order {}", order.id),
            )
            .await;
        }
        Ok(order)
    }

    /// Apply a manual leg status change. Completing the first leg here does
    /// not book the second one; only the monitor does that.
    pub async fn record_leg_transition(
        &self,
        order_id: Uuid,
        kind: LegKind,
        status: LegStatus,
        note: Option<String>,
    ) -> Result<Order, DomainError> {
        let mut order = self.load(order_id).await?;
        let update = order.transition_leg(kind, status, note, Utc::now())?;
        self.persist(update).await?;

        log::info!(
            "Order {} {} leg is now {} (order {})",
            order.id,
            kind,
            status,
            order.fulfillment_status
        );
        self.notify(
            Recipient::Buyer(order.buyer_id),
            &order,
            format!("Your order {} is {}", order.id, order.fulfillment_status),
        )
        .await;
        Ok(order)
    }

    pub async fn cancel_order(&self, order_id: Uuid) -> Result<Order, DomainError> {
        let mut order = self.load(order_id).await?;
        let update = order.cancel(Utc::now())?;
        self.persist(update).await?;

        log::info!("Order {} cancelled", order.id);
        self.notify(
            Recipient::Buyer(order.buyer_id),
            &order,
            format!("Your order {} was cancelled", order.id),
        )
        .await;
        Ok(order)
    }

    /// One monitor cycle. Per-order failures are logged and left for the
    /// next cycle.
    pub async fn monitor_and_forward(&self) -> Result<MonitorReport, DomainError> {
        let orders = self.orders.clone();
        let candidates = blocking(move || orders.find_awaiting_forward()).await?;

        let mut report = MonitorReport::default();
        for order in candidates {
            report.checked += 1;
            let order_id = order.id;
            match self.forward(order).await {
                Ok(true) => report.forwarded += 1,
                Ok(false) => {}
                Err(e) => log::warn!("Relay skipped order {}: {}", order_id, e),
            }
        }

        log::info!(
            "Relay cycle checked {} order(s), forwarded {}",
            report.checked,
            report.forwarded
        );
        Ok(report)
    }

    /// Run monitor cycles forever at the configured interval.
    pub async fn run(self: Arc<Self>) {
        log::info!(
            "Starting shipment relay monitor (every {:?})",
            self.config.interval
        );
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// One scheduled cycle. A failure is reported to operations and the next
    /// tick tries again.
    async fn run_cycle(&self) {
        if let Err(e) = self.monitor_and_forward().await {
            log::error!("Relay cycle failed: {}", e);
            notify_quietly(
                self.notifier.as_ref(),
                Recipient::Operations,
                &format!("Shipment relay cycle failed: {e}"),
                json!({ "error": e.to_string() }),
            )
            .await;
        }
    }

    /// Returns `Ok(true)` when the hub → buyer leg was created.
    async fn forward(&self, candidate: Order) -> Result<bool, DomainError> {
        let origin = candidate
            .leg(LegKind::OriginToHub)
            .ok_or_else(|| DomainError::not_found("origin_to_hub leg"))?;

        let tracking_ref = origin.tracking_ref.clone();
        let status = self
            .bounded(self.courier.track_status(&tracking_ref))
            .await?;
        if !status.delivered {
            log::debug!(
                "Order {} first leg {} not delivered yet ({})",
                candidate.id,
                tracking_ref,
                status.raw_status
            );
            return Ok(false);
        }

        // Re-read right before booking so a concurrent cycle that already
        // forwarded this order is noticed. Changes landing during the booking
        // itself are caught by the versioned write below.
        let mut order = self.load(candidate.id).await?;
        if !order.awaiting_forward() {
            return Ok(false);
        }

        let request = self
            .shipment_request(
                &order,
                LegKind::HubToDestination,
                self.config.hub_address.clone(),
                order.shipping_address.clone(),
            )
            .await?;
        let shipment = self.book(&request).await?;

        let update = order.forward_to_destination(shipment, Utc::now())?;
        match self.persist(update).await {
            Ok(()) => {}
            Err(DomainError::Conflict(msg)) => {
                log::warn!(
                    "Order {} changed while booking, shipment {} is orphaned: {}",
                    order.id,
                    request.reference,
                    msg
                );
                self.notify(
                    Recipient::Operations,
                    &order,
                    format!(
                        "Shipment {} for order {} was booked but not recorded; cancel it with the courier",
                        request.reference, order.id
                    ),
                )
                .await;
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        log::info!("Order {} forwarded from hub to buyer", order.id);
        self.notify(
            Recipient::Buyer(order.buyer_id),
            &order,
            format!("Your order {} has reached our hub and is being re-dispatched", order.id),
        )
        .await;
        Ok(true)
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, DomainError> {
        let orders = self.orders.clone();
        blocking(move || orders.find_by_id(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    async fn persist(&self, update: FulfillmentUpdate) -> Result<(), DomainError> {
        let orders = self.orders.clone();
        blocking(move || orders.apply_fulfillment(update)).await
    }

    async fn shipment_request(
        &self,
        order: &Order,
        kind: LegKind,
        origin: Address,
        destination: Address,
    ) -> Result<ShipmentRequest, DomainError> {
        let ids: Vec<Uuid> = order.items.iter().map(|i| i.product_id).collect();
        let catalog = self.catalog.clone();
        let products = blocking(move || catalog.get_products(&ids)).await?;

        let parts = order.items.iter().filter_map(|item| {
            products
                .iter()
                .find(|p| p.id == item.product_id)
                .map(|p| (&p.parcel, item.quantity))
        });

        Ok(ShipmentRequest {
            reference: format!("{}/{}", order.id, kind),
            origin,
            destination,
            parcel: Parcel::combine(parts),
            declared_value: order.breakdown.subtotal.clone(),
        })
    }

    async fn book(&self, request: &ShipmentRequest) -> Result<Shipment, DomainError> {
        Ok(self.bounded(self.courier.create_shipment(request)).await?)
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, CollaboratorError>>,
    ) -> Result<T, CollaboratorError> {
        timeout(self.config.call_timeout, call)
            .await
            .unwrap_or(Err(CollaboratorError::Timeout))
    }

    async fn notify(&self, recipient: Recipient, order: &Order, message: String) {
        let metadata = json!({
            "order_id": order.id,
            "fulfillment_status": order.fulfillment_status.as_str(),
        });
        notify_quietly(self.notifier.as_ref(), recipient, &message, metadata).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::application::fakes::{
        product, FakeCourier, InMemoryCatalog, InMemoryOrderRepository, RecordingNotifier,
    };
    use crate::domain::order::tests::{address, paid_order, placed_order};
    use crate::domain::order::FulfillmentStatus;
    use crate::domain::shipping::TrackingStatus;

    type Relay = ShipmentRelay<InMemoryOrderRepository, InMemoryCatalog>;

    struct Fixture {
        relay: Arc<Relay>,
        orders: InMemoryOrderRepository,
        courier: Arc<FakeCourier>,
        notifier: Arc<RecordingNotifier>,
    }

    fn fixture() -> Fixture {
        let orders = InMemoryOrderRepository::default();
        let catalog = InMemoryCatalog::default();
        let courier = Arc::new(FakeCourier::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let relay = ShipmentRelay::new(
            orders.clone(),
            catalog,
            courier.clone(),
            notifier.clone(),
            RelayConfig {
                hub_address: address(),
                interval: Duration::from_secs(900),
                call_timeout: Duration::from_secs(5),
            },
        );
        Fixture {
            relay: Arc::new(relay),
            orders,
            courier,
            notifier,
        }
    }

    /// Paid order with a dispatched first leg, stored in the fixture.
    async fn dispatched(f: &Fixture) -> Uuid {
        let order = paid_order();
        let id = order.id;
        f.orders.insert(order);
        f.relay
            .dispatch_first_leg(id, address())
            .await
            .expect("dispatch");
        id
    }

    #[tokio::test]
    async fn dispatch_creates_pending_origin_leg() {
        let f = fixture();
        let id = dispatched(&f).await;

        let order = f.orders.get(id);
        let leg = order.leg(LegKind::OriginToHub).expect("origin leg");
        assert_eq!(leg.status, LegStatus::Pending);
        assert_eq!(leg.tracking_ref, "AWB1");
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Pending);
        assert_eq!(f.orders.event_types(id), vec!["ShippingLegCreated"]);

        let request = &f.courier.requests.lock().unwrap()[0];
        assert_eq!(request.reference, format!("{id}/origin_to_hub"));
    }

    #[tokio::test]
    async fn dispatch_requires_paid_order() {
        let f = fixture();
        let order = placed_order();
        let id = order.id;
        f.orders.insert(order);

        let err = f.relay.dispatch_first_leg(id, address()).await.unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(f.courier.created(), 0);
    }

    #[tokio::test]
    async fn second_dispatch_is_rejected_without_booking() {
        let f = fixture();
        let id = dispatched(&f).await;

        let err = f.relay.dispatch_first_leg(id, address()).await.unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(f.courier.created(), 1);
        assert_eq!(f.orders.get(id).shipping_legs.len(), 1);
    }

    #[tokio::test]
    async fn dispatch_courier_failure_persists_nothing() {
        let f = fixture();
        let order = paid_order();
        let id = order.id;
        f.orders.insert(order);
        f.courier.fail_create.store(true, Ordering::SeqCst);

        let err = f.relay.dispatch_first_leg(id, address()).await.unwrap_err();

        assert!(matches!(err, DomainError::External(_)));
        assert!(f.orders.get(id).shipping_legs.is_empty());
    }

    #[tokio::test]
    async fn manual_completion_does_not_book_second_leg() {
        let f = fixture();
        let id = dispatched(&f).await;

        let order = f
            .relay
            .record_leg_transition(id, LegKind::OriginToHub, LegStatus::Completed, None)
            .await
            .expect("complete");

        assert_eq!(order.fulfillment_status, FulfillmentStatus::Processing);
        assert!(f.orders.get(id).leg(LegKind::HubToDestination).is_none());
        assert_eq!(f.courier.created(), 1);
    }

    #[tokio::test]
    async fn backward_transition_is_rejected() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.relay
            .record_leg_transition(id, LegKind::OriginToHub, LegStatus::Completed, None)
            .await
            .expect("complete");

        let err = f
            .relay
            .record_leg_transition(id, LegKind::OriginToHub, LegStatus::InTransit, None)
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(
            f.orders.get(id).leg(LegKind::OriginToHub).expect("leg").status,
            LegStatus::Completed
        );
    }

    #[tokio::test]
    async fn monitor_forwards_delivered_first_leg() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.relay
            .record_leg_transition(id, LegKind::OriginToHub, LegStatus::Completed, None)
            .await
            .expect("complete");
        f.courier.delivered.store(true, Ordering::SeqCst);

        let report = f.relay.monitor_and_forward().await.expect("cycle");

        assert_eq!(report, MonitorReport { checked: 1, forwarded: 1 });
        let order = f.orders.get(id);
        let hub = order.leg(LegKind::HubToDestination).expect("hub leg");
        assert_eq!(hub.status, LegStatus::Pending);
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Processing);

        let requests = f.courier.requests.lock().unwrap();
        assert_eq!(requests[1].destination, order.shipping_address);
        assert_eq!(requests[1].parcel, Parcel::default());
    }

    #[tokio::test]
    async fn monitor_completes_in_transit_first_leg() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.courier.delivered.store(true, Ordering::SeqCst);

        f.relay.monitor_and_forward().await.expect("cycle");

        let order = f.orders.get(id);
        let origin = order.leg(LegKind::OriginToHub).expect("origin");
        assert_eq!(origin.status, LegStatus::Completed);
        assert!(origin.completed_at.is_some());
        assert_eq!(
            f.orders.event_types(id),
            vec!["ShippingLegCreated", "ShippingLegUpdated", "ShippingLegCreated"]
        );
    }

    #[tokio::test]
    async fn monitor_waits_while_not_delivered() {
        let f = fixture();
        let id = dispatched(&f).await;

        let report = f.relay.monitor_and_forward().await.expect("cycle");

        assert_eq!(report, MonitorReport { checked: 1, forwarded: 0 });
        let order = f.orders.get(id);
        assert_eq!(
            order.leg(LegKind::OriginToHub).expect("origin").status,
            LegStatus::Pending
        );
        assert!(order.leg(LegKind::HubToDestination).is_none());
    }

    #[tokio::test]
    async fn monitor_is_idempotent() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.courier.delivered.store(true, Ordering::SeqCst);

        let first = f.relay.monitor_and_forward().await.expect("first");
        let second = f.relay.monitor_and_forward().await.expect("second");

        assert_eq!(first.forwarded, 1);
        assert_eq!(second, MonitorReport::default());
        let hub_legs = f
            .orders
            .get(id)
            .shipping_legs
            .iter()
            .filter(|l| l.kind == LegKind::HubToDestination)
            .count();
        assert_eq!(hub_legs, 1);
    }

    #[tokio::test]
    async fn overlapping_cycles_create_one_hub_leg() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.courier.delivered.store(true, Ordering::SeqCst);

        let (a, b) = futures::join!(f.relay.monitor_and_forward(), f.relay.monitor_and_forward());

        let forwarded = a.expect("a").forwarded + b.expect("b").forwarded;
        assert_eq!(forwarded, 1);
        let hub_legs = f
            .orders
            .get(id)
            .shipping_legs
            .iter()
            .filter(|l| l.kind == LegKind::HubToDestination)
            .count();
        assert_eq!(hub_legs, 1);
    }

    #[tokio::test]
    async fn courier_failure_leaves_order_untouched_until_next_cycle() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.courier.delivered.store(true, Ordering::SeqCst);
        f.courier.fail_create.store(true, Ordering::SeqCst);

        let report = f.relay.monitor_and_forward().await.expect("cycle");

        assert_eq!(report, MonitorReport { checked: 1, forwarded: 0 });
        let order = f.orders.get(id);
        assert_eq!(
            order.leg(LegKind::OriginToHub).expect("origin").status,
            LegStatus::Pending
        );
        assert!(order.leg(LegKind::HubToDestination).is_none());
        assert_eq!(order.fulfillment_status, FulfillmentStatus::Pending);

        f.courier.fail_create.store(false, Ordering::SeqCst);
        let retry = f.relay.monitor_and_forward().await.expect("retry");
        assert_eq!(retry.forwarded, 1);
    }

    #[tokio::test]
    async fn tracking_outage_is_retried_next_cycle() {
        let f = fixture();
        let first = dispatched(&f).await;
        f.courier.delivered.store(true, Ordering::SeqCst);
        f.courier.fail_track.store(true, Ordering::SeqCst);

        let report = f.relay.monitor_and_forward().await.expect("cycle");
        assert_eq!(report, MonitorReport { checked: 1, forwarded: 0 });

        f.courier.fail_track.store(false, Ordering::SeqCst);
        let second = dispatched(&f).await;
        let report = f.relay.monitor_and_forward().await.expect("cycle");
        assert_eq!(report, MonitorReport { checked: 2, forwarded: 2 });
        for id in [first, second] {
            assert!(f.orders.get(id).leg(LegKind::HubToDestination).is_some());
        }
    }

    #[tokio::test]
    async fn order_gone_before_reread_is_skipped() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.courier.delivered.store(true, Ordering::SeqCst);

        let mut ghost = f.orders.get(id);
        ghost.id = Uuid::new_v4();
        let err = f.relay.forward(ghost).await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
        assert_eq!(f.courier.created(), 1);
    }

    /// Cancels the order through the repository while its hub leg is being
    /// booked.
    struct CancelledWhileBooking {
        inner: FakeCourier,
        orders: InMemoryOrderRepository,
    }

    #[async_trait::async_trait]
    impl CourierGateway for CancelledWhileBooking {
        async fn create_shipment(
            &self,
            request: &ShipmentRequest,
        ) -> Result<Shipment, CollaboratorError> {
            if let Some(id) = request.reference.strip_suffix("/hub_to_destination") {
                let mut order = self.orders.get(id.parse().expect("order id"));
                let update = order.cancel(Utc::now()).expect("cancel");
                self.orders.apply_fulfillment(update).expect("cancel persisted");
            }
            self.inner.create_shipment(request).await
        }

        async fn track_status(
            &self,
            tracking_ref: &str,
        ) -> Result<TrackingStatus, CollaboratorError> {
            self.inner.track_status(tracking_ref).await
        }
    }

    #[tokio::test]
    async fn cancellation_during_booking_is_not_overwritten() {
        let orders = InMemoryOrderRepository::default();
        let courier = CancelledWhileBooking {
            inner: FakeCourier::default(),
            orders: orders.clone(),
        };
        courier.inner.delivered.store(true, Ordering::SeqCst);
        let notifier = Arc::new(RecordingNotifier::default());
        let relay = ShipmentRelay::new(
            orders.clone(),
            InMemoryCatalog::default(),
            Arc::new(courier),
            notifier.clone(),
            RelayConfig {
                hub_address: address(),
                interval: Duration::from_secs(900),
                call_timeout: Duration::from_secs(5),
            },
        );
        let order = paid_order();
        let id = order.id;
        orders.insert(order);
        relay.dispatch_first_leg(id, address()).await.expect("dispatch");

        let report = relay.monitor_and_forward().await.expect("cycle");

        assert_eq!(report, MonitorReport { checked: 1, forwarded: 0 });
        let stored = orders.get(id);
        assert_eq!(stored.fulfillment_status, FulfillmentStatus::Cancelled);
        assert!(stored.leg(LegKind::HubToDestination).is_none());
        assert_eq!(
            stored.leg(LegKind::OriginToHub).expect("origin").status,
            LegStatus::Cancelled
        );
        assert_eq!(
            orders.event_types(id),
            vec!["ShippingLegCreated", "OrderCancelled"]
        );
        assert!(notifier
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|(to, msg)| *to == Recipient::Operations && msg.contains("hub_to_destination")));

        // The next cycle leaves the cancelled order alone.
        let report = relay.monitor_and_forward().await.expect("cycle");
        assert_eq!(report, MonitorReport::default());
    }

    #[tokio::test]
    async fn failed_cycle_is_reported_to_operations() {
        let f = fixture();
        f.orders.unavailable.store(true, Ordering::SeqCst);

        f.relay.run_cycle().await;

        let sent = f.notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, Recipient::Operations);
        assert!(sent[0].1.contains("database unavailable"));
    }

    #[tokio::test]
    async fn successful_cycle_stays_quiet() {
        let f = fixture();
        dispatched(&f).await;
        let before = f.notifier.sent.lock().unwrap().len();

        f.relay.run_cycle().await;

        assert_eq!(f.notifier.sent.lock().unwrap().len(), before);
    }

    #[tokio::test]
    async fn cancelled_orders_are_not_monitored() {
        let f = fixture();
        let id = dispatched(&f).await;
        f.relay.cancel_order(id).await.expect("cancel");
        f.courier.delivered.store(true, Ordering::SeqCst);

        let report = f.relay.monitor_and_forward().await.expect("cycle");

        assert_eq!(report, MonitorReport::default());
        assert_eq!(f.orders.get(id).fulfillment_status, FulfillmentStatus::Cancelled);
    }

    #[tokio::test]
    async fn notification_failures_are_swallowed() {
        let f = fixture();
        f.notifier.fail.store(true, Ordering::SeqCst);
        let id = dispatched(&f).await;

        let order = f
            .relay
            .record_leg_transition(id, LegKind::OriginToHub, LegStatus::InTransit, None)
            .await
            .expect("transition");

        assert_eq!(
            order.leg(LegKind::OriginToHub).expect("leg").status,
            LegStatus::InTransit
        );
        assert!(f.notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parcel_is_built_from_catalog() {
        let orders = InMemoryOrderRepository::default();
        let catalog = InMemoryCatalog::default();
        let courier = Arc::new(FakeCourier::default());
        let relay = ShipmentRelay::new(
            orders.clone(),
            catalog.clone(),
            courier.clone(),
            Arc::new(RecordingNotifier::default()),
            RelayConfig {
                hub_address: address(),
                interval: Duration::from_secs(900),
                call_timeout: Duration::from_secs(5),
            },
        );
        let mut order = paid_order();
        let item = product(1000, 5);
        order.items[0].product_id = item.id;
        catalog.insert(item);
        let id = order.id;
        orders.insert(order);

        relay.dispatch_first_leg(id, address()).await.expect("dispatch");

        let parcel = courier.requests.lock().unwrap()[0].parcel.clone();
        assert_eq!(parcel.weight_grams, 2400);
        assert_eq!(parcel.length_cm, 40);
    }
}
