use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use thiserror::Error;

use crate::domain::order::Address;
use crate::domain::pricing::{FeePolicy, PricingConfig};
use crate::infrastructure::courier::CourierConfig;
use crate::infrastructure::payment::PaymentConfig;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pricing: PricingConfig,
    pub relay_interval: Duration,
    pub call_timeout: Duration,
    pub hub_address: Address,
    pub payment: PaymentConfig,
    /// `None` runs against the mock courier.
    pub courier: Option<CourierConfig>,
    /// `None` logs notifications instead of sending them.
    pub telegram: Option<TelegramConfig>,
}

fn default_hub_address() -> Address {
    Address {
        name: "Relay Hub".to_string(),
        phone: "+918000000000".to_string(),
        line1: "Warehouse 4, Industrial Area Phase 2".to_string(),
        line2: None,
        city: "Bengaluru".to_string(),
        state: "Karnataka".to_string(),
        postal_code: "560058".to_string(),
        country: "India".to_string(),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let mut pricing = PricingConfig::default();
        if let Some(v) = get("SHIPPING_CHARGE") {
            pricing.shipping_charge = parse("SHIPPING_CHARGE", &v)?;
        }
        if let Some(v) = get("GST_RATE") {
            pricing.gst_rate = parse::<BigDecimal>("GST_RATE", &v)?;
        }
        if let Some(v) = get("CHECKOUT_FEE_TIERS") {
            pricing.checkout_fee = parse::<FeePolicy>("CHECKOUT_FEE_TIERS", &v)?;
        }
        if let Some(v) = get("LISTING_FEE_TIERS") {
            pricing.listing_fee = parse::<FeePolicy>("LISTING_FEE_TIERS", &v)?;
        }

        let call_timeout = Duration::from_secs(match get("EXTERNAL_CALL_TIMEOUT_SECS") {
            Some(v) => parse("EXTERNAL_CALL_TIMEOUT_SECS", &v)?,
            None => 20,
        });
        let relay_interval = Duration::from_secs(match get("RELAY_INTERVAL_SECS") {
            Some(v) => parse("RELAY_INTERVAL_SECS", &v)?,
            None => 900,
        });
        if relay_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "RELAY_INTERVAL_SECS",
                reason: "must be greater than zero".to_string(),
            });
        }

        let hub_address = match get("HUB_ADDRESS") {
            Some(v) => {
                let address: Address =
                    serde_json::from_str(&v).map_err(|e| ConfigError::Invalid {
                        key: "HUB_ADDRESS",
                        reason: e.to_string(),
                    })?;
                address.validate().map_err(|e| ConfigError::Invalid {
                    key: "HUB_ADDRESS",
                    reason: e.to_string(),
                })?;
                address
            }
            None => default_hub_address(),
        };

        let payment = PaymentConfig {
            base_url: get("PAYMENT_BASE_URL")
                .unwrap_or_else(|| "https://api.razorpay.com/v1".to_string()),
            key_id: require("PAYMENT_KEY_ID")?,
            key_secret: require("PAYMENT_KEY_SECRET")?,
            currency: get("PAYMENT_CURRENCY").unwrap_or_else(|| "INR".to_string()),
            timeout: call_timeout,
        };

        let courier = match get("COURIER_BASE_URL") {
            Some(base_url) => Some(CourierConfig {
                base_url,
                api_token: require("COURIER_API_TOKEN")?,
                timeout: call_timeout,
            }),
            None => None,
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig { bot_token, chat_id }),
            (Some(_), None) => return Err(ConfigError::Missing("TELEGRAM_CHAT_ID")),
            _ => None,
        };

        Ok(Self {
            database_url: require("DATABASE_URL")?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: match get("PORT") {
                Some(v) => parse("PORT", &v)?,
                None => 8080,
            },
            pricing,
            relay_interval,
            call_timeout,
            hub_address,
            payment,
            courier,
            telegram,
        })
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
