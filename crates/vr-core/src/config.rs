//! Runtime tuning for the mock backend and controller

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Core configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Simulated latency of list and create calls
    pub latency: Duration,
    /// Simulated latency of login
    pub login_latency: Duration,
    /// Quiet period before a search term is applied
    pub search_debounce: Duration,
    /// How long a success notice stays visible
    pub notice_ttl: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(100),
            login_latency: Duration::from_millis(500),
            search_debounce: Duration::from_millis(300),
            notice_ttl: Duration::from_secs(3),
        }
    }
}

impl CoreConfig {
    /// Zero latency, for tests and scripted use.
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            login_latency: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Defaults overridden by `VR_LATENCY_MS`, `VR_LOGIN_LATENCY_MS`,
    /// `VR_DEBOUNCE_MS` and `VR_NOTICE_TTL_MS`.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let mut config = Self::default();
        let millis = |key: &str| -> CoreResult<Option<Duration>> {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<u64>()
                        .map(Duration::from_millis)
                        .map_err(|e| CoreError::Config(format!("{}='{}': {}", key, raw, e)))
                })
                .transpose()
        };

        if let Some(d) = millis("VR_LATENCY_MS")? {
            config.latency = d;
        }
        if let Some(d) = millis("VR_LOGIN_LATENCY_MS")? {
            config.login_latency = d;
        }
        if let Some(d) = millis("VR_DEBOUNCE_MS")? {
            config.search_debounce = d;
        }
        if let Some(d) = millis("VR_NOTICE_TTL_MS")? {
            config.notice_ttl = d;
        }
        Ok(config)
    }
}
