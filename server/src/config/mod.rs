use std::env;
use std::str::FromStr;
use std::time::Duration;

use chrono::FixedOffset;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::SecurityHeadersLayer;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_url: String,
    pub app_port: u16,
    pub app_base_url: String,
    pub app_timeout: Duration,
    pub utc_offset: FixedOffset,
    pub order_expire: chrono::Duration,
    pub service_charge_percentage: Decimal,
    pub tax_percentage: Decimal,
    pub midtrans_base_url: String,
    pub midtrans_server_key: String,
    pub cors_allowed_origins: String,
    /// How often the deferred task worker looks for due tasks.
    pub scheduler_poll_interval: Duration,
    /// Enables HSTS.
    pub is_production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let utc_offset_hours: i32 = parse(&lookup, "APP_UTC_OFFSET_HOURS", 7)?;
        let utc_offset = FixedOffset::east_opt(utc_offset_hours * 3600).ok_or(ConfigError::Invalid {
            key: "APP_UTC_OFFSET_HOURS",
            value: utc_offset_hours.to_string(),
        })?;

        Ok(Self {
            database_url: text("DATABASE_URL", "postgres://localhost/tm_order"),
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            redis_url: text("REDIS_URL", "redis://127.0.0.1:6379"),
            app_port: parse(&lookup, "APP_PORT", 3001)?,
            app_base_url: text("APP_BASE_URL", "http://localhost:3001"),
            app_timeout: Duration::from_secs(parse(&lookup, "APP_TIMEOUT_SECS", 10)?),
            utc_offset,
            order_expire: chrono::Duration::minutes(parse(&lookup, "ORDER_EXPIRE_MINUTES", 15)?),
            service_charge_percentage: parse(
                &lookup,
                "ORDER_SERVICE_CHARGE_PERCENTAGE",
                Decimal::from(5),
            )?,
            tax_percentage: parse(&lookup, "ORDER_TAX_PERCENTAGE", Decimal::from(10))?,
            midtrans_base_url: text("MIDTRANS_BASE_URL", "https://api.sandbox.midtrans.com"),
            midtrans_server_key: text("MIDTRANS_SERVER_KEY", ""),
            cors_allowed_origins: text("CORS_ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS),
            scheduler_poll_interval: Duration::from_millis(parse(
                &lookup,
                "SCHEDULER_POLL_INTERVAL_MS",
                1000,
            )?),
            is_production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
        })
    }
}

fn parse<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
