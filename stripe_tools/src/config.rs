use std::time::Duration;

use log::*;
use synq_common::Secret;

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub api_base: String,
    pub secret_key: Secret<String>,
    /// The signing secret of the webhook endpoint, used to verify `Stripe-Signature` headers.
    pub webhook_secret: Secret<String>,
    pub timeout: Duration,
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            secret_key: Secret::default(),
            webhook_secret: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl StripeConfig {
    pub fn new_from_env_or_default() -> Self {
        let secret_key = std::env::var("SYNQ_STRIPE_SECRET_KEY").map(Secret::new).unwrap_or_else(|_| {
            warn!("🪛️ SYNQ_STRIPE_SECRET_KEY is not set. Supplier payouts will fail until it is configured.");
            Secret::default()
        });
        let webhook_secret = std::env::var("SYNQ_STRIPE_WEBHOOK_SECRET").map(Secret::new).unwrap_or_else(|_| {
            warn!("🪛️ SYNQ_STRIPE_WEBHOOK_SECRET is not set. Stripe webhooks will be rejected.");
            Secret::default()
        });
        let timeout = std::env::var("SYNQ_STRIPE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("🪛️ Invalid SYNQ_STRIPE_TIMEOUT_SECS value '{s}'. {e}. Using the default."))
                    .ok()
            })
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let api_base = std::env::var("SYNQ_STRIPE_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        Self { api_base, secret_key, webhook_secret, timeout: Duration::from_secs(timeout) }
    }
}
