//! The cart aggregate. Every mutation re-prices the cart before returning, so
//! the stored aggregates always match the stored items.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::pricing::{self, CartTotals};
use super::product::Product;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtectionPlan {
    pub selected: bool,
    pub price: BigDecimal,
}

impl ProtectionPlan {
    pub fn none() -> Self {
        Self {
            selected: false,
            price: BigDecimal::from(0),
        }
    }

    pub fn selected(price: BigDecimal) -> Self {
        Self {
            selected: true,
            price,
        }
    }
}

/// A buyer's protection-plan request. A missing price means "use the default
/// price for this item".
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionChoice {
    pub selected: bool,
    pub price: Option<BigDecimal>,
}

impl ProtectionChoice {
    pub fn resolve(&self, unit_price: &BigDecimal) -> Result<ProtectionPlan, DomainError> {
        if !self.selected {
            return Ok(ProtectionPlan::none());
        }
        let price = match &self.price {
            Some(price) if *price < BigDecimal::from(0) => {
                return Err(DomainError::InvalidInput(
                    "protection plan price must not be negative".to_string(),
                ))
            }
            Some(price) => price.clone(),
            None => pricing::default_protection_price(unit_price),
        };
        Ok(ProtectionPlan::selected(price))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CartItem {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Price at the time the product was first added.
    pub unit_price: BigDecimal,
    pub protection_plan: ProtectionPlan,
    line_total: BigDecimal,
}

impl CartItem {
    pub fn new(
        product_id: Uuid,
        quantity: i32,
        unit_price: BigDecimal,
        protection_plan: ProtectionPlan,
    ) -> Self {
        let item = Self {
            product_id,
            quantity,
            unit_price,
            protection_plan,
            line_total: BigDecimal::from(0),
        };
        let line_total = pricing::line_total(&item);
        item.with_line_total(line_total)
    }

    pub fn line_total(&self) -> &BigDecimal {
        &self.line_total
    }

    pub(crate) fn with_line_total(mut self, line_total: BigDecimal) -> Self {
        self.line_total = line_total;
        self
    }
}

pub fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
    if quantity < 1 {
        return Err(DomainError::InvalidInput(
            "quantity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Cart {
    pub id: Uuid,
    pub owner_id: Uuid,
    /// Optimistic-concurrency token; 0 for a cart that was never saved.
    pub version: i32,
    pub updated_at: DateTime<Utc>,
    items: Vec<CartItem>,
    totals: CartTotals,
}

impl Cart {
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            version: 0,
            updated_at: Utc::now(),
            items: Vec::new(),
            totals: CartTotals::default(),
        }
    }

    /// Rebuild a cart from stored items. Aggregates are recomputed rather
    /// than trusted.
    pub fn restore(
        id: Uuid,
        owner_id: Uuid,
        version: i32,
        updated_at: DateTime<Utc>,
        items: Vec<CartItem>,
    ) -> Self {
        let mut cart = Self {
            id,
            owner_id,
            version,
            updated_at,
            items,
            totals: CartTotals::default(),
        };
        cart.reprice();
        cart
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn totals(&self) -> &CartTotals {
        &self.totals
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, product_id: Uuid) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    /// Add `quantity` units of `product`, merging with an existing line.
    pub fn add_item(
        &mut self,
        product: &Product,
        quantity: i32,
        protection: Option<&ProtectionChoice>,
    ) -> Result<(), DomainError> {
        validate_quantity(quantity)?;

        match self.items.iter_mut().find(|i| i.product_id == product.id) {
            Some(existing) => {
                let merged = existing
                    .quantity
                    .checked_add(quantity)
                    .ok_or_else(|| DomainError::InvalidInput("quantity is too large".to_string()))?;
                product.ensure_in_stock(merged)?;
                if let Some(choice) = protection {
                    existing.protection_plan = choice.resolve(&existing.unit_price)?;
                }
                existing.quantity = merged;
            }
            None => {
                product.ensure_in_stock(quantity)?;
                let plan = match protection {
                    Some(choice) => choice.resolve(&product.price)?,
                    None => ProtectionPlan::none(),
                };
                self.items.push(CartItem::new(
                    product.id,
                    quantity,
                    product.price.clone(),
                    plan,
                ));
            }
        }

        self.changed();
        Ok(())
    }

    pub fn update_quantity(&mut self, product: &Product, quantity: i32) -> Result<(), DomainError> {
        validate_quantity(quantity)?;
        let line = self.line_mut(product.id)?;
        product.ensure_in_stock(quantity)?;
        line.quantity = quantity;
        self.changed();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), DomainError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before {
            return Err(DomainError::not_found("Cart item"));
        }
        self.changed();
        Ok(())
    }

    pub fn set_protection(
        &mut self,
        product_id: Uuid,
        choice: &ProtectionChoice,
    ) -> Result<(), DomainError> {
        let line = self.line_mut(product_id)?;
        line.protection_plan = choice.resolve(&line.unit_price)?;
        self.changed();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.changed();
    }

    fn line_mut(&mut self, product_id: Uuid) -> Result<&mut CartItem, DomainError> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or_else(|| DomainError::not_found("Cart item"))
    }

    fn reprice(&mut self) {
        let priced = pricing::recompute(&self.items);
        self.items = priced.items;
        self.totals = priced.totals;
    }

    fn changed(&mut self) {
        self.reprice();
        self.updated_at = Utc::now();
    }
}
