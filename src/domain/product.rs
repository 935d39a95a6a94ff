use bigdecimal::BigDecimal;
use uuid::Uuid;

use super::errors::DomainError;
use super::shipping::Parcel;

/// Catalog view of a listed product, as seen by the cart and the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub parcel: Parcel,
}

impl Product {
    pub fn ensure_in_stock(&self, quantity: i32) -> Result<(), DomainError> {
        if quantity > self.stock {
            return Err(DomainError::InvalidInput(format!(
                "only {} unit(s) of '{}' in stock",
                self.stock.max(0),
                self.title
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32) -> Product {
        Product {
            id: Uuid::new_v4(),
            seller_id: Uuid::new_v4(),
            title: "Desk lamp".to_string(),
            price: BigDecimal::from(750),
            stock,
            parcel: Parcel::default(),
        }
    }

    #[test]
    fn quantity_within_stock_is_accepted() {
        assert!(product(3).ensure_in_stock(3).is_ok());
    }

    #[test]
    fn quantity_above_stock_is_rejected() {
        let err = product(2).ensure_in_stock(3).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(ref m) if m.contains("only 2 unit(s)")));
    }
}
