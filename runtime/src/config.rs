//! Engine configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Default number of notifications submitted to the push channel at once
pub const DEFAULT_DISPATCH_CONCURRENCY: usize = 16;

/// Default `tracing` filter directive
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Lottery engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed seed for the draw RNG; `None` seeds from OS entropy
    pub draw_seed: Option<u64>,
    /// Waitlist limit applied on join to events that have none of their own
    pub default_waitlist_limit: Option<u32>,
    /// Maximum notifications in flight per dispatch (at least 1)
    pub dispatch_concurrency: usize,
    /// `tracing` filter directive (e.g. `info`, `waitlist_lottery_runtime=debug`)
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            draw_seed: None,
            default_waitlist_limit: None,
            dispatch_concurrency: DEFAULT_DISPATCH_CONCURRENCY,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory, if present, is loaded first.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `LOTTERY_DRAW_SEED` | unset (entropy) |
    /// | `LOTTERY_DEFAULT_WAITLIST_LIMIT` | unset (unbounded) |
    /// | `LOTTERY_DISPATCH_CONCURRENCY` | 16 |
    /// | `RUST_LOG` | `info` |
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            draw_seed: lookup("LOTTERY_DRAW_SEED").and_then(|s| s.trim().parse().ok()),
            default_waitlist_limit: lookup("LOTTERY_DEFAULT_WAITLIST_LIMIT")
                .and_then(|s| s.trim().parse().ok()),
            dispatch_concurrency: lookup("LOTTERY_DISPATCH_CONCURRENCY")
                .and_then(|s| s.trim().parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_DISPATCH_CONCURRENCY),
            log_level: lookup("RUST_LOG")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }

    /// Use a fixed draw seed
    #[must_use]
    pub const fn with_draw_seed(mut self, seed: u64) -> Self {
        self.draw_seed = Some(seed);
        self
    }

    /// Set the default waitlist limit
    #[must_use]
    pub const fn with_default_waitlist_limit(mut self, limit: u32) -> Self {
        self.default_waitlist_limit = Some(limit);
        self
    }

    /// Set the dispatch concurrency (values below 1 are raised to 1)
    #[must_use]
    pub fn with_dispatch_concurrency(mut self, concurrency: usize) -> Self {
        self.dispatch_concurrency = concurrency.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.dispatch_concurrency, 16);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_values_are_parsed() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("LOTTERY_DRAW_SEED", "42"),
            ("LOTTERY_DEFAULT_WAITLIST_LIMIT", " 100 "),
            ("LOTTERY_DISPATCH_CONCURRENCY", "4"),
            ("RUST_LOG", "debug"),
        ]));
        assert_eq!(config.draw_seed, Some(42));
        assert_eq!(config.default_waitlist_limit, Some(100));
        assert_eq!(config.dispatch_concurrency, 4);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("LOTTERY_DRAW_SEED", "not-a-number"),
            ("LOTTERY_DISPATCH_CONCURRENCY", "0"),
            ("RUST_LOG", "  "),
        ]));
        assert_eq!(config.draw_seed, None);
        assert_eq!(config.dispatch_concurrency, DEFAULT_DISPATCH_CONCURRENCY);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn test_builders() {
        let config = EngineConfig::default()
            .with_draw_seed(7)
            .with_default_waitlist_limit(3)
            .with_dispatch_concurrency(0);
        assert_eq!(config.draw_seed, Some(7));
        assert_eq!(config.default_waitlist_limit, Some(3));
        assert_eq!(config.dispatch_concurrency, 1);
    }
}
