//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_API_URL` - Base URL of the e-commerce REST API
//!
//! ## Optional
//! - `STOREFRONT_API_TOKEN` - Bearer token sent with every request
//! - `STOREFRONT_CURRENCY` - Currency code (default: NGN)
//! - `STOREFRONT_MIN_CARD_CHARGE` - Smallest total accepted for card payment (default: 1.00)
//! - `STOREFRONT_STATE_DIR` - Directory for persisted cart and filters (default: .storefront)
//! - `STOREFRONT_CACHE_TTL_SECS` - Lifetime of cached GET responses (default: 300)
//! - `STOREFRONT_HTTP_TIMEOUT_SECS` - Request timeout (default: none)
//! - `STOREFRONT_OFFERS_PATH` - JSON file with the discount offer catalog

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::value_objects::DEFAULT_CURRENCY;

const DEFAULT_STATE_DIR: &str = ".storefront";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Clone)]
pub struct StorefrontConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub currency: String,
    pub min_card_charge: Decimal,
    pub state_dir: PathBuf,
    pub cache_ttl: Duration,
    pub http_timeout: Option<Duration>,
    pub offers_path: Option<PathBuf>,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field("api_url", &self.api_url)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("currency", &self.currency)
            .field("min_card_charge", &self.min_card_charge)
            .field("state_dir", &self.state_dir)
            .field("cache_ttl", &self.cache_ttl)
            .field("http_timeout", &self.http_timeout)
            .field("offers_path", &self.offers_path)
            .finish()
    }
}

impl StorefrontConfig {
    /// Config with defaults for everything but the API location.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_token: None,
            currency: DEFAULT_CURRENCY.to_string(),
            min_card_charge: Decimal::ONE,
            state_dir: PathBuf::from(DEFAULT_STATE_DIR),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            http_timeout: None,
            offers_path: None,
        }
    }

    /// Load configuration from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = get("STOREFRONT_API_URL").ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_API_URL".into()))?;
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidEnvVar("STOREFRONT_API_URL".into(), "must be an http(s) URL".into()));
        }

        let mut config = Self::new(api_url);
        config.api_token = get("STOREFRONT_API_TOKEN").filter(|t| !t.is_empty());
        if let Some(currency) = get("STOREFRONT_CURRENCY") {
            config.currency = currency.to_uppercase();
        }
        if let Some(min) = parse::<Decimal>(&get, "STOREFRONT_MIN_CARD_CHARGE")? {
            config.min_card_charge = min;
        }
        if let Some(dir) = get("STOREFRONT_STATE_DIR") {
            config.state_dir = PathBuf::from(dir);
        }
        if let Some(secs) = parse::<u64>(&get, "STOREFRONT_CACHE_TTL_SECS")? {
            config.cache_ttl = Duration::from_secs(secs);
        }
        config.http_timeout = parse::<u64>(&get, "STOREFRONT_HTTP_TIMEOUT_SECS")?.map(Duration::from_secs);
        config.offers_path = get("STOREFRONT_OFFERS_PATH").map(PathBuf::from);
        Ok(config)
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())))
        .transpose()
}
