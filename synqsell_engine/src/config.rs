use std::time::Duration;

use log::*;
use synq_common::DEFAULT_CURRENCY_CODE;

use crate::retry::RetryPolicy;

pub const DEFAULT_PLATFORM_FEE_BPS: i64 = 300;

/// Settings that shape how the engine reconciles events. Store and payment credentials live with their clients.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// The platform's cut of every retailer payment, in basis points
    pub platform_fee_bps: i64,
    /// Applied to every remote call a handler makes
    pub retry: RetryPolicy,
    /// Used when a store does not report a currency
    pub default_currency: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_fee_bps: DEFAULT_PLATFORM_FEE_BPS,
            retry: RetryPolicy::default(),
            default_currency: DEFAULT_CURRENCY_CODE.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new_from_env_or_default() -> Self {
        let defaults = Self::default();
        let platform_fee_bps = parse_env("SYNQ_PLATFORM_FEE_BPS").unwrap_or(defaults.platform_fee_bps);
        let mut retry = defaults.retry;
        if let Some(max) = parse_env::<u32>("SYNQ_RETRY_MAX") {
            retry = retry.with_max_retries(max);
        }
        if let Some(ms) = parse_env::<u64>("SYNQ_RETRY_INITIAL_DELAY_MS") {
            retry = retry.with_initial_delay(Duration::from_millis(ms));
        }
        let default_currency = std::env::var("SYNQ_DEFAULT_CURRENCY").unwrap_or_else(|_| {
            info!("🪛️ SYNQ_DEFAULT_CURRENCY is not set. Using {DEFAULT_CURRENCY_CODE}");
            DEFAULT_CURRENCY_CODE.to_string()
        });
        Self { platform_fee_bps, retry, default_currency }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_platform_fee_bps(mut self, bps: i64) -> Self {
        self.platform_fee_bps = bps;
        self
    }
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let value = std::env::var(key).ok()?;
    value.parse::<T>().map_err(|e| warn!("🪛️ Invalid {key} value '{value}'. {e}. Using the default.")).ok()
}
