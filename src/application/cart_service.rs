use uuid::Uuid;

use crate::domain::cart::{validate_quantity, Cart, ProtectionChoice};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CartRepository, ProductCatalog};
use crate::domain::pricing::{checkout_breakdown, BuyerBreakdown, PricingConfig};
use crate::domain::product::Product;

/// Cart mutations. Each one loads the cart, applies the change (which
/// re-prices the cart) and saves items and aggregates together.
pub struct CartService<C, P> {
    carts: C,
    catalog: P,
    pricing: PricingConfig,
}

impl<C: CartRepository, P: ProductCatalog> CartService<C, P> {
    pub fn new(carts: C, catalog: P, pricing: PricingConfig) -> Self {
        Self {
            carts,
            catalog,
            pricing,
        }
    }

    /// The owner's cart, or an empty unsaved one.
    pub fn get_cart(&self, owner_id: Uuid) -> Result<Cart, DomainError> {
        Ok(self
            .carts
            .find_by_owner(owner_id)?
            .unwrap_or_else(|| Cart::new(owner_id)))
    }

    pub fn add_item(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        protection: Option<ProtectionChoice>,
    ) -> Result<Cart, DomainError> {
        validate_quantity(quantity)?;
        let product = self.product(product_id)?;
        let mut cart = self.get_cart(owner_id)?;
        cart.add_item(&product, quantity, protection.as_ref())?;
        self.carts.save(&cart)
    }

    pub fn update_quantity(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Cart, DomainError> {
        validate_quantity(quantity)?;
        let mut cart = self.existing_cart(owner_id)?;
        let product = self.product(product_id)?;
        cart.update_quantity(&product, quantity)?;
        self.carts.save(&cart)
    }

    pub fn remove_item(&self, owner_id: Uuid, product_id: Uuid) -> Result<Cart, DomainError> {
        let mut cart = self.existing_cart(owner_id)?;
        cart.remove_item(product_id)?;
        self.carts.save(&cart)
    }

    pub fn set_protection(
        &self,
        owner_id: Uuid,
        product_id: Uuid,
        choice: ProtectionChoice,
    ) -> Result<Cart, DomainError> {
        let mut cart = self.existing_cart(owner_id)?;
        cart.set_protection(product_id, &choice)?;
        self.carts.save(&cart)
    }

    pub fn clear(&self, owner_id: Uuid) -> Result<(), DomainError> {
        self.carts.clear(owner_id)
    }

    /// Buyer-visible checkout breakdown for the current cart.
    pub fn summary(&self, owner_id: Uuid) -> Result<BuyerBreakdown, DomainError> {
        let cart = self.get_cart(owner_id)?;
        Ok(checkout_breakdown(cart.totals(), &self.pricing).buyer_view())
    }

    fn existing_cart(&self, owner_id: Uuid) -> Result<Cart, DomainError> {
        self.carts
            .find_by_owner(owner_id)?
            .ok_or_else(|| DomainError::not_found("Cart"))
    }

    fn product(&self, product_id: Uuid) -> Result<Product, DomainError> {
        self.catalog
            .get_product(product_id)?
            .ok_or_else(|| DomainError::not_found("Product"))
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::application::fakes::{product, InMemoryCartRepository, InMemoryCatalog};

    fn service() -> (CartService<InMemoryCartRepository, InMemoryCatalog>, InMemoryCatalog) {
        let catalog = InMemoryCatalog::default();
        let service = CartService::new(
            InMemoryCartRepository::default(),
            catalog.clone(),
            PricingConfig::default(),
        );
        (service, catalog)
    }

    #[test]
    fn empty_cart_for_new_owner() {
        let (service, _) = service();
        let cart = service.get_cart(Uuid::new_v4()).expect("cart");
        assert!(cart.is_empty());
        assert_eq!(cart.version, 0);
    }

    #[test]
    fn add_item_persists_and_bumps_version() {
        let (service, catalog) = service();
        let item = product(1000, 5);
        catalog.insert(item.clone());
        let owner = Uuid::new_v4();

        let cart = service.add_item(owner, item.id, 2, None).expect("add");
        assert_eq!(cart.version, 1);

        let stored = service.get_cart(owner).expect("stored");
        assert_eq!(stored.totals().subtotal, BigDecimal::from(2000));
        assert_eq!(stored.totals().total_item_count, 2);
    }

    #[test]
    fn zero_quantity_is_rejected_before_lookup() {
        let (service, _) = service();
        let err = service
            .add_item(Uuid::new_v4(), Uuid::new_v4(), 0, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn unknown_product_is_not_found() {
        let (service, _) = service();
        let err = service
            .add_item(Uuid::new_v4(), Uuid::new_v4(), 1, None)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(ref e) if e == "Product"));
    }

    #[test]
    fn mutations_on_missing_cart_are_not_found() {
        let (service, _) = service();
        let owner = Uuid::new_v4();
        assert!(matches!(
            service.remove_item(owner, Uuid::new_v4()),
            Err(DomainError::NotFound(ref e)) if e == "Cart"
        ));
        assert!(matches!(
            service.update_quantity(owner, Uuid::new_v4(), 1),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn stale_cart_write_is_rejected() {
        let catalog = InMemoryCatalog::default();
        let carts = InMemoryCartRepository::default();
        let service = CartService::new(carts.clone(), catalog.clone(), PricingConfig::default());
        let item = product(100, 10);
        catalog.insert(item.clone());
        let owner = Uuid::new_v4();

        service.add_item(owner, item.id, 1, None).expect("add");
        let stale = carts.find_by_owner(owner).expect("find").expect("cart");
        service.update_quantity(owner, item.id, 3).expect("update");

        assert!(matches!(carts.save(&stale), Err(DomainError::Conflict(_))));
        assert_eq!(
            service.get_cart(owner).expect("cart").totals().total_item_count,
            3
        );
    }

    #[test]
    fn summary_matches_protected_scenario() {
        let (service, catalog) = service();
        let item = product(1000, 5);
        catalog.insert(item.clone());
        let owner = Uuid::new_v4();

        service.add_item(owner, item.id, 2, None).expect("add");
        assert_eq!(
            service.summary(owner).expect("summary").grand_total,
            BigDecimal::from(2109)
        );

        service
            .set_protection(
                owner,
                item.id,
                ProtectionChoice {
                    selected: true,
                    price: None,
                },
            )
            .expect("protect");
        let summary = service.summary(owner).expect("summary");
        assert_eq!(summary.protection_plan_total, BigDecimal::from(998));
        assert_eq!(summary.gst, BigDecimal::from(108));
        assert_eq!(summary.grand_total, BigDecimal::from(3107));
    }

    #[test]
    fn clear_empties_the_cart() {
        let (service, catalog) = service();
        let item = product(10, 5);
        catalog.insert(item.clone());
        let owner = Uuid::new_v4();
        service.add_item(owner, item.id, 1, None).expect("add");

        service.clear(owner).expect("clear");

        assert!(service.get_cart(owner).expect("cart").is_empty());
    }
}
