pub mod cart_repo;
pub mod courier;
pub mod models;
pub mod notifier;
pub mod order_repo;
pub mod payment;
pub mod product_catalog;

#[cfg(test)]
pub(crate) mod test_db;

use crate::domain::errors::CollaboratorError;

pub(crate) fn map_reqwest(e: reqwest::Error) -> CollaboratorError {
    if e.is_timeout() {
        CollaboratorError::Timeout
    } else {
        CollaboratorError::Unavailable(e.to_string())
    }
}
