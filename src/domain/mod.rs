pub mod cart;
pub mod errors;
pub mod events;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod product;
pub mod shipping;
