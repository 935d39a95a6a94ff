//! In-memory ports used by the application-layer tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::cart::Cart;
use crate::domain::errors::{CollaboratorError, DomainError};
use crate::domain::events::OrderEvent;
use crate::domain::order::{FulfillmentUpdate, ListResult, Order};
use crate::domain::ports::{
    CartRepository, CourierGateway, NotificationChannel, OrderRepository, PaymentGateway,
    PaymentIntent, ProductCatalog, Recipient,
};
use crate::domain::product::Product;
use crate::domain::shipping::{Parcel, Shipment, ShipmentRequest, TrackingStatus};

pub(crate) fn product(price: i64, stock: i32) -> Product {
    Product {
        id: Uuid::new_v4(),
        seller_id: Uuid::new_v4(),
        title: "Turntable".to_string(),
        price: BigDecimal::from(price),
        stock,
        parcel: Parcel {
            weight_grams: 1200,
            length_cm: 40,
            breadth_cm: 30,
            height_cm: 15,
        },
    }
}

// ── Repositories ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub(crate) struct InMemoryCatalog {
    products: Arc<Mutex<HashMap<Uuid, Product>>>,
}

impl InMemoryCatalog {
    pub(crate) fn insert(&self, product: Product) {
        self.products.lock().unwrap().insert(product.id, product);
    }
}

impl ProductCatalog for InMemoryCatalog {
    fn get_product(&self, id: Uuid) -> Result<Option<Product>, DomainError> {
        Ok(self.products.lock().unwrap().get(&id).cloned())
    }

    fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>, DomainError> {
        let products = self.products.lock().unwrap();
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryCartRepository {
    carts: Arc<Mutex<HashMap<Uuid, Cart>>>,
}

impl CartRepository for InMemoryCartRepository {
    fn find_by_owner(&self, owner_id: Uuid) -> Result<Option<Cart>, DomainError> {
        Ok(self.carts.lock().unwrap().get(&owner_id).cloned())
    }

    fn save(&self, cart: &Cart) -> Result<Cart, DomainError> {
        let mut carts = self.carts.lock().unwrap();
        let stored_version = carts.get(&cart.owner_id).map_or(0, |c| c.version);
        if stored_version != cart.version {
            return Err(DomainError::Conflict("cart was modified concurrently".to_string()));
        }
        let mut saved = cart.clone();
        saved.version += 1;
        carts.insert(cart.owner_id, saved.clone());
        Ok(saved)
    }

    fn clear(&self, owner_id: Uuid) -> Result<(), DomainError> {
        if let Some(cart) = self.carts.lock().unwrap().get_mut(&owner_id) {
            cart.clear();
            cart.version += 1;
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub(crate) struct InMemoryOrderRepository {
    orders: Arc<Mutex<HashMap<Uuid, Order>>>,
    events: Arc<Mutex<Vec<(Uuid, OrderEvent)>>>,
    pub(crate) unavailable: Arc<AtomicBool>,
}

fn stored_at(
    orders: &mut HashMap<Uuid, Order>,
    id: Uuid,
    version: i32,
) -> Result<&mut Order, DomainError> {
    let stored = orders
        .get_mut(&id)
        .ok_or_else(|| DomainError::not_found("Order"))?;
    if stored.version != version - 1 {
        return Err(DomainError::Conflict("order was modified concurrently".to_string()));
    }
    Ok(stored)
}

impl InMemoryOrderRepository {
    pub(crate) fn insert(&self, order: Order) {
        self.orders.lock().unwrap().insert(order.id, order);
    }

    pub(crate) fn get(&self, id: Uuid) -> Order {
        self.orders.lock().unwrap().get(&id).cloned().expect("order exists")
    }

    pub(crate) fn len(&self) -> usize {
        self.orders.lock().unwrap().len()
    }

    pub(crate) fn event_types(&self, id: Uuid) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(order_id, _)| *order_id == id)
            .map(|(_, e)| e.event_type())
            .collect()
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create(&self, order: &Order) -> Result<(), DomainError> {
        self.events.lock().unwrap().push((
            order.id,
            OrderEvent::OrderPlaced {
                buyer_id: order.buyer_id,
                total_amount: order.total_amount.clone(),
                item_count: order.items.len(),
            },
        ));
        self.insert(order.clone());
        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, DomainError> {
        Ok(self.orders.lock().unwrap().get(&id).cloned())
    }

    fn list(&self, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut all: Vec<Order> = self.orders.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = all.len() as i64;
        let items = all
            .into_iter()
            .skip(((page - 1) * limit) as usize)
            .take(limit as usize)
            .collect();
        Ok(ListResult { items, total })
    }

    fn find_awaiting_forward(&self) -> Result<Vec<Order>, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::Internal("database unavailable".to_string()));
        }
        Ok(self
            .orders
            .lock()
            .unwrap()
            .values()
            .filter(|o| o.awaiting_forward())
            .cloned()
            .collect())
    }

    fn update_payment(&self, order: &Order, event: OrderEvent) -> Result<(), DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let stored = stored_at(&mut orders, order.id, order.version)?;
        stored.payment_status = order.payment_status;
        stored.gateway_payment_id = order.gateway_payment_id.clone();
        stored.version = order.version;
        stored.updated_at = order.updated_at;
        self.events.lock().unwrap().push((order.id, event));
        Ok(())
    }

    fn apply_fulfillment(&self, update: FulfillmentUpdate) -> Result<(), DomainError> {
        let mut orders = self.orders.lock().unwrap();
        let stored = stored_at(&mut orders, update.order_id, update.version)?;

        if let Some(leg) = &update.new_leg {
            if stored.leg(leg.kind).is_some() {
                return Err(DomainError::Conflict(format!("{} leg already exists", leg.kind)));
            }
        }
        for leg in &update.updated_legs {
            if let Some(existing) = stored.shipping_legs.iter_mut().find(|l| l.id == leg.id) {
                *existing = leg.clone();
            }
        }
        if let Some(leg) = update.new_leg {
            stored.shipping_legs.push(leg);
        }
        stored.fulfillment_status = update.fulfillment_status;
        stored.version = update.version;

        let mut events = self.events.lock().unwrap();
        events.extend(update.events.into_iter().map(|e| (update.order_id, e)));
        Ok(())
    }
}

// ── Collaborators ────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct FakePayments {
    pub(crate) fail_intent: AtomicBool,
    issued: AtomicUsize,
}

impl FakePayments {
    pub(crate) fn sign(gateway_order_id: &str, gateway_payment_id: &str) -> String {
        format!("{gateway_order_id}|{gateway_payment_id}|signed")
    }
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_payment_intent(
        &self,
        amount: &BigDecimal,
        _receipt: &str,
    ) -> Result<PaymentIntent, CollaboratorError> {
        if self.fail_intent.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("gateway down".to_string()));
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentIntent {
            gateway_order_id: format!("order_gw_{n}"),
            amount_minor: (amount * &BigDecimal::from(100)).to_i64().unwrap_or_default(),
            currency: "INR".to_string(),
        })
    }

    fn verify_signature(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> bool {
        signature == Self::sign(gateway_order_id, gateway_payment_id)
    }
}

#[derive(Default)]
pub(crate) struct FakeCourier {
    pub(crate) delivered: AtomicBool,
    pub(crate) fail_create: AtomicBool,
    pub(crate) fail_track: AtomicBool,
    pub(crate) requests: Mutex<Vec<ShipmentRequest>>,
}

impl FakeCourier {
    pub(crate) fn created(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl CourierGateway for FakeCourier {
    async fn create_shipment(
        &self,
        request: &ShipmentRequest,
    ) -> Result<Shipment, CollaboratorError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("courier down".to_string()));
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        Ok(Shipment {
            tracking_ref: format!("AWB{}", requests.len()),
            label_url: None,
            courier_name: Some("Fake Courier".to_string()),
        })
    }

    async fn track_status(&self, _tracking_ref: &str) -> Result<TrackingStatus, CollaboratorError> {
        if self.fail_track.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Timeout);
        }
        let delivered = self.delivered.load(Ordering::SeqCst);
        Ok(TrackingStatus {
            delivered,
            raw_status: if delivered { "DELIVERED" } else { "IN TRANSIT" }.to_string(),
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    pub(crate) fail: AtomicBool,
    pub(crate) sent: Mutex<Vec<(Recipient, String)>>,
}

#[async_trait]
impl NotificationChannel for RecordingNotifier {
    async fn notify(
        &self,
        recipient: Recipient,
        message: &str,
        _metadata: &Value,
    ) -> Result<(), CollaboratorError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("bot offline".to_string()));
        }
        self.sent.lock().unwrap().push((recipient, message.to_string()));
        Ok(())
    }
}
