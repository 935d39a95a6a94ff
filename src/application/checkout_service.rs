use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::{blocking, notify_quietly};
use crate::domain::errors::DomainError;
use crate::domain::events::OrderEvent;
use crate::domain::order::{Address, Order, OrderItem};
use crate::domain::ports::{
    CartRepository, NotificationChannel, OrderRepository, PaymentGateway, PaymentIntent,
    ProductCatalog, Recipient,
};
use crate::domain::pricing::{checkout_breakdown, PricingConfig};

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub order: Order,
    pub payment: PaymentIntent,
}

#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub order_id: Uuid,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

pub struct CheckoutService<C, O, P> {
    carts: C,
    orders: O,
    catalog: P,
    payments: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn NotificationChannel>,
    pricing: PricingConfig,
}

impl<C, O, P> CheckoutService<C, O, P>
where
    C: CartRepository,
    O: OrderRepository,
    P: ProductCatalog,
{
    pub fn new(
        carts: C,
        orders: O,
        catalog: P,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn NotificationChannel>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            carts,
            orders,
            catalog,
            payments,
            notifier,
            pricing,
        }
    }

    /// Snapshot the buyer's cart into a pending order and open a payment
    /// intent for its total. The cart itself is left untouched.
    pub async fn checkout(
        &self,
        buyer_id: Uuid,
        shipping_address: Address,
    ) -> Result<CheckoutSession, DomainError> {
        shipping_address.validate()?;

        let carts = self.carts.clone();
        let cart = blocking(move || carts.find_by_owner(buyer_id))
            .await?
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DomainError::InvalidInput("cart is empty".to_string()))?;

        let ids: Vec<Uuid> = cart.items().iter().map(|i| i.product_id).collect();
        let catalog = self.catalog.clone();
        let products: HashMap<Uuid, _> = blocking(move || catalog.get_products(&ids))
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let mut items = Vec::with_capacity(cart.items().len());
        for line in cart.items() {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| DomainError::not_found("Product"))?;
            product.ensure_in_stock(line.quantity)?;
            items.push(OrderItem {
                product_id: line.product_id,
                seller_id: product.seller_id,
                title: product.title.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price.clone(),
                protection_plan: line.protection_plan.clone(),
                line_total: line.line_total().clone(),
            });
        }

        let breakdown = checkout_breakdown(cart.totals(), &self.pricing);
        let receipt = format!("cart-{}", cart.id.simple());
        let payment = self
            .payments
            .create_payment_intent(&breakdown.grand_total, &receipt)
            .await?;

        let order = Order::place(
            buyer_id,
            items,
            shipping_address,
            breakdown,
            payment.gateway_order_id.clone(),
            Utc::now(),
        );
        let orders = self.orders.clone();
        let to_insert = order.clone();
        blocking(move || orders.create(&to_insert)).await?;

        log::info!(
            "Order {} placed by {} for {} (gateway order {})",
            order.id,
            buyer_id,
            order.total_amount,
            payment.gateway_order_id
        );

        Ok(CheckoutSession { order, payment })
    }

    /// Verify the gateway signature. A match marks the order paid and empties
    /// the buyer's cart; a mismatch marks it failed.
    pub async fn verify_payment(
        &self,
        confirmation: PaymentConfirmation,
    ) -> Result<Order, DomainError> {
        let mut order = self.load(confirmation.order_id).await?;

        let signature_ok = order.gateway_order_id.as_deref()
            == Some(confirmation.gateway_order_id.as_str())
            && self.payments.verify_signature(
                &confirmation.gateway_order_id,
                &confirmation.gateway_payment_id,
                &confirmation.signature,
            );

        if !signature_ok {
            log::warn!("Payment signature mismatch for order {}", order.id);
            let event = order.fail_payment(Utc::now()).map_err(|_| {
                DomainError::PaymentVerification("signature mismatch".to_string())
            })?;
            // A concurrent writer already settled the payment; the mismatch
            // is still reported but leaves the stored order alone.
            match self.persist_payment(&order, event).await {
                Ok(()) | Err(DomainError::Conflict(_)) => {}
                Err(e) => return Err(e),
            }
            return Err(DomainError::PaymentVerification(
                "signature mismatch".to_string(),
            ));
        }

        let Some(event) = order.capture_payment(&confirmation.gateway_payment_id, Utc::now())?
        else {
            return Ok(order);
        };
        self.persist_payment(&order, event).await?;

        let carts = self.carts.clone();
        let buyer_id = order.buyer_id;
        if let Err(e) = blocking(move || carts.clear(buyer_id)).await {
            log::error!("Failed to empty cart of {} after payment: {}", buyer_id, e);
        }

        let metadata = json!({
            "order_id": order.id,
            "amount": order.total_amount.to_string(),
        });
        notify_quietly(
            self.notifier.as_ref(),
            Recipient::Buyer(order.buyer_id),
            &format!("Payment received for order {}", order.id),
            metadata.clone(),
        )
        .await;
        for seller in order.seller_ids() {
            notify_quietly(
                self.notifier.as_ref(),
                Recipient::Seller(seller),
                &format!("New paid order {} is ready to dispatch", order.id),
                metadata.clone(),
            )
            .await;
        }

        log::info!("Payment captured for order {}", order.id);
        Ok(order)
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, DomainError> {
        let orders = self.orders.clone();
        blocking(move || orders.find_by_id(order_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    async fn persist_payment(&self, order: &Order, event: OrderEvent) -> Result<(), DomainError> {
        let orders = self.orders.clone();
        let order = order.clone();
        blocking(move || orders.update_payment(&order, event)).await
    }
}
