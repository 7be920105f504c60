use std::time::Duration;

use log::*;
use synq_common::Secret;

pub const DEFAULT_API_VERSION: &str = "2024-10";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Process-wide settings shared by every call the gateway makes, regardless of which store it targets.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_version: String,
    /// Upper bound for a single remote call, including connection setup and reading the body.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { api_version: DEFAULT_API_VERSION.to_string(), timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS) }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_version = std::env::var("SYNQ_SHOPIFY_API_VERSION").unwrap_or_else(|_| {
            warn!("🪛️ SYNQ_SHOPIFY_API_VERSION not set, using {DEFAULT_API_VERSION} as default");
            DEFAULT_API_VERSION.to_string()
        });
        let timeout = std::env::var("SYNQ_SHOPIFY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SYNQ_SHOPIFY_TIMEOUT_SECS value '{s}'. {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Self { api_version, timeout: Duration::from_secs(timeout) }
    }
}

/// The credentials of one installed store, taken from its Session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCredentials {
    /// The shop domain, e.g. `my-shop.myshopify.com`
    pub shop: String,
    pub access_token: Secret<String>,
}

impl StoreCredentials {
    pub fn new<S: Into<String>, T: Into<String>>(shop: S, access_token: T) -> Self {
        Self { shop: shop.into(), access_token: Secret::new(access_token.into()) }
    }
}
