use std::env;

use log::*;
use store_gateway::GatewayConfig;
use stripe_tools::{StripeConfig, DEFAULT_SIGNATURE_TOLERANCE_SECS};
use synq_common::{parse_boolean_flag, Secret};
use synqsell_engine::EngineConfig;

const DEFAULT_SYNQ_HOST: &str = "127.0.0.1";
const DEFAULT_SYNQ_PORT: u16 = 8360;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Webhook verification settings for Shopify deliveries
    pub shopify_config: ShopifyConfig,
    /// Signing secret of the message queue that posts event batches
    pub queue_config: QueueConfig,
    /// Settings for outbound calls to store Admin APIs
    pub gateway_config: GatewayConfig,
    pub stripe_config: StripeConfig,
    pub engine_config: EngineConfig,
}

#[derive(Clone, Debug)]
pub struct ShopifyConfig {
    /// The app's API secret. Shopify signs every webhook body with it.
    pub api_secret: Secret<String>,
    /// If false, the HMAC header of incoming webhooks is not checked. **DANGER**
    pub hmac_checks: bool,
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self { api_secret: Secret::default(), hmac_checks: true }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SYNQ_HOST.to_string(),
            port: DEFAULT_SYNQ_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            shopify_config: ShopifyConfig::default(),
            queue_config: QueueConfig::default(),
            gateway_config: GatewayConfig::default(),
            stripe_config: StripeConfig::default(),
            engine_config: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SYNQ_HOST").ok().unwrap_or_else(|| DEFAULT_SYNQ_HOST.into());
        let port = env::var("SYNQ_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SYNQ_PORT. {e} Using the default, {DEFAULT_SYNQ_PORT}, \
                         instead."
                    );
                    DEFAULT_SYNQ_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SYNQ_PORT);
        let database_url = env::var("SYNQ_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SYNQ_DATABASE_URL is not set. Please set it to the URL for the SynqSell database.");
            String::default()
        });
        let max_connections = env::var("SYNQ_DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| {
                s.parse::<u32>().map_err(|e| warn!("🪛️ Invalid SYNQ_DATABASE_MAX_CONNECTIONS value '{s}'. {e}")).ok()
            })
            .unwrap_or(DEFAULT_MAX_CONNECTIONS);
        Self {
            host,
            port,
            database_url,
            max_connections,
            shopify_config: ShopifyConfig::from_env_or_defaults(),
            queue_config: QueueConfig::from_env_or_defaults(),
            gateway_config: GatewayConfig::new_from_env_or_default(),
            stripe_config: StripeConfig::new_from_env_or_default(),
            engine_config: EngineConfig::new_from_env_or_default(),
        }
    }
}

impl ShopifyConfig {
    pub fn from_env_or_defaults() -> Self {
        let api_secret = env::var("SYNQ_SHOPIFY_API_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ SYNQ_SHOPIFY_API_SECRET is not set. Please set it to the API secret of the SynqSell Shopify app."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("SYNQ_SHOPIFY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Shopify HMAC checks are DISABLED. Anyone can post events to this server. 🚨️");
        }
        Self { api_secret: Secret::new(api_secret), hmac_checks }
    }
}

/// Batches posted to `/events/batch` must carry a base64 HMAC-SHA256 of the body, keyed with this secret, in the
/// `X-Synq-Hmac-Sha256` header. With no secret configured, every batch is refused.
#[derive(Clone, Debug, Default)]
pub struct QueueConfig {
    pub secret: Secret<String>,
}

impl QueueConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret = env::var("SYNQ_QUEUE_SECRET").ok().unwrap_or_else(|| {
            warn!("🪛️ SYNQ_QUEUE_SECRET is not set. Event batches will be refused.");
            String::default()
        });
        Self { secret: Secret::new(secret) }
    }
}

/// What the Stripe webhook route needs to verify a delivery.
#[derive(Clone, Debug)]
pub struct StripeWebhookConfig {
    pub secret: Secret<String>,
    /// Maximum age of a signature, in seconds
    pub tolerance_secs: i64,
}

impl StripeWebhookConfig {
    pub fn from_config(config: &StripeConfig) -> Self {
        Self { secret: config.webhook_secret.clone(), tolerance_secs: DEFAULT_SIGNATURE_TOLERANCE_SECS }
    }
}
