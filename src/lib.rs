pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::error::Error;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::checkout_service::CheckoutService;
use application::order_service::OrderService;
use application::shipment_relay::{RelayConfig, ShipmentRelay};
use domain::ports::{CourierGateway, NotificationChannel, PaymentGateway};
use domain::pricing::PricingConfig;
use infrastructure::cart_repo::DieselCartRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::product_catalog::DieselProductCatalog;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type Carts = CartService<DieselCartRepository, DieselProductCatalog>;
pub type Checkout = CheckoutService<DieselCartRepository, DieselOrderRepository, DieselProductCatalog>;
pub type Orders = OrderService<DieselOrderRepository>;
pub type Relay = ShipmentRelay<DieselOrderRepository, DieselProductCatalog>;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    if !applied.is_empty() {
        log::info!("Applied {} migration(s)", applied.len());
    }
    Ok(())
}

/// Everything the HTTP layer and the relay monitor share.
#[derive(Clone)]
pub struct AppState {
    pub carts: Arc<Carts>,
    pub checkout: Arc<Checkout>,
    pub orders: Arc<Orders>,
    pub relay: Arc<Relay>,
    pub pricing: PricingConfig,
}

impl AppState {
    /// Wire the Diesel repositories and the given collaborators into the
    /// services.
    pub fn new(
        pool: DbPool,
        pricing: PricingConfig,
        relay: RelayConfig,
        payments: Arc<dyn PaymentGateway>,
        courier: Arc<dyn CourierGateway>,
        notifier: Arc<dyn NotificationChannel>,
    ) -> Self {
        let carts = DieselCartRepository::new(pool.clone());
        let orders = DieselOrderRepository::new(pool.clone());
        let catalog = DieselProductCatalog::new(pool);

        Self {
            carts: Arc::new(CartService::new(
                carts.clone(),
                catalog.clone(),
                pricing.clone(),
            )),
            checkout: Arc::new(CheckoutService::new(
                carts,
                orders.clone(),
                catalog.clone(),
                payments,
                notifier.clone(),
                pricing.clone(),
            )),
            orders: Arc::new(OrderService::new(orders.clone())),
            relay: Arc::new(ShipmentRelay::new(orders, catalog, courier, notifier, relay)),
            pricing,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::carts::get_cart,
        handlers::carts::clear_cart,
        handlers::carts::cart_summary,
        handlers::carts::add_item,
        handlers::carts::update_quantity,
        handlers::carts::remove_item,
        handlers::carts::set_protection,
        handlers::checkout::checkout,
        handlers::checkout::verify_payment,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::get_shipping,
        handlers::relay::dispatch_first_leg,
        handlers::relay::record_leg_transition,
        handlers::relay::cancel_order,
        handlers::relay::run_monitor,
        handlers::pricing::listing_fee_quote,
    ),
    tags(
        (name = "carts", description = "Buyer carts and pricing"),
        (name = "checkout", description = "Checkout and payment capture"),
        (name = "orders", description = "Order lookup"),
        (name = "shipping", description = "Two-leg shipment relay"),
        (name = "pricing", description = "Listing fee quotes"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server. The relay monitor is not started here.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(state.carts.clone()))
            .app_data(web::Data::from(state.checkout.clone()))
            .app_data(web::Data::from(state.orders.clone()))
            .app_data(web::Data::from(state.relay.clone()))
            .app_data(web::Data::new(state.pricing.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/carts/{owner_id}")
                    .route("", web::get().to(handlers::carts::get_cart))
                    .route("", web::delete().to(handlers::carts::clear_cart))
                    .route("/summary", web::get().to(handlers::carts::cart_summary))
                    .route("/items", web::post().to(handlers::carts::add_item))
                    .route(
                        "/items/{product_id}",
                        web::patch().to(handlers::carts::update_quantity),
                    )
                    .route(
                        "/items/{product_id}",
                        web::delete().to(handlers::carts::remove_item),
                    )
                    .route(
                        "/items/{product_id}/protection",
                        web::put().to(handlers::carts::set_protection),
                    ),
            )
            .service(
                web::scope("/checkout")
                    .route("", web::post().to(handlers::checkout::checkout))
                    .route("/verify", web::post().to(handlers::checkout::verify_payment)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/cancel", web::post().to(handlers::relay::cancel_order))
                    .route("/{id}/shipping", web::get().to(handlers::orders::get_shipping))
                    .route(
                        "/{id}/shipping/dispatch",
                        web::post().to(handlers::relay::dispatch_first_leg),
                    )
                    .route(
                        "/{id}/shipping/{leg_kind}",
                        web::put().to(handlers::relay::record_leg_transition),
                    ),
            )
            .route("/relay/run", web::post().to(handlers::relay::run_monitor))
            .route(
                "/pricing/listing-fee",
                web::get().to(handlers::pricing::listing_fee_quote),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
