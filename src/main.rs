use std::io;
use std::sync::Arc;

use dotenvy::dotenv;
use marketplace_service::application::shipment_relay::RelayConfig;
use marketplace_service::config::AppConfig;
use marketplace_service::domain::ports::{CourierGateway, NotificationChannel};
use marketplace_service::infrastructure::courier::{HttpCourier, MockCourier};
use marketplace_service::infrastructure::notifier::{LogNotifier, TelegramNotifier};
use marketplace_service::infrastructure::payment::HttpPaymentGateway;
use marketplace_service::{build_server, create_pool, run_migrations, AppState};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(io::Error::other)?;

    let pool = create_pool(&config.database_url).map_err(io::Error::other)?;
    run_migrations(&pool).map_err(io::Error::other)?;

    let payments = Arc::new(HttpPaymentGateway::new(config.payment.clone()).map_err(io::Error::other)?);

    let courier: Arc<dyn CourierGateway> = match config.courier.clone() {
        Some(courier) => Arc::new(HttpCourier::new(courier).map_err(io::Error::other)?),
        None => {
            log::warn!("COURIER_BASE_URL not set, shipments are booked against the mock courier");
            Arc::new(MockCourier)
        }
    };

    let notifier: Arc<dyn NotificationChannel> = match config.telegram.clone() {
        Some(telegram) => Arc::new(
            TelegramNotifier::new(telegram.bot_token, telegram.chat_id, config.call_timeout)
                .map_err(io::Error::other)?,
        ),
        None => Arc::new(LogNotifier),
    };

    let state = AppState::new(
        pool,
        config.pricing.clone(),
        RelayConfig {
            hub_address: config.hub_address.clone(),
            interval: config.relay_interval,
            call_timeout: config.call_timeout,
        },
        payments,
        courier,
        notifier,
    );

    actix_web::rt::spawn(state.relay.clone().run());

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    build_server(state, &config.host, config.port)?.await
}
