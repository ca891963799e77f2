//! Checkout Configuration
//!
//! Read from environment variables (after `.env` is loaded by the binary).

use std::time::Duration;

use anyhow::Context;

use crate::error::{CheckoutError, Result};
use crate::gateway::SimulatedGateway;
use crate::locale::Locale;

/// Simulated payment latency in milliseconds
pub const LATENCY_ENV: &str = "CHECKOUT_PROCESSING_LATENCY_MS";

/// Initial site locale (`en` or `ar`)
pub const LOCALE_ENV: &str = "CHECKOUT_DEFAULT_LOCALE";

/// Seconds an untouched checkout is kept before it is closed and forgotten
pub const IDLE_TTL_ENV: &str = "CHECKOUT_IDLE_TTL_SECS";

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutConfig {
    /// How long the simulated payment call takes
    pub processing_latency: Duration,

    /// Locale the site starts in
    pub default_locale: Locale,

    /// How long an abandoned checkout lives before eviction
    pub idle_ttl: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            processing_latency: SimulatedGateway::DEFAULT_LATENCY,
            default_locale: Locale::En,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }
}

impl CheckoutConfig {
    /// Create from environment variables, falling back to defaults when unset
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(LATENCY_ENV) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{LATENCY_ENV} must be a whole number of milliseconds, got {raw:?}"))?;
            config.processing_latency = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup(LOCALE_ENV) {
            config.default_locale = raw.trim().parse()?;
        }

        if let Some(raw) = lookup(IDLE_TTL_ENV) {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{IDLE_TTL_ENV} must be a whole number of seconds, got {raw:?}"))?;
            if secs == 0 {
                return Err(CheckoutError::Config(format!("{IDLE_TTL_ENV} must be greater than zero")));
            }
            config.idle_ttl = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Gateway matching this configuration
    pub const fn gateway(&self) -> SimulatedGateway {
        SimulatedGateway::with_latency(self.processing_latency)
    }
}
