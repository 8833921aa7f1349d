//! Aggregator configuration from environment variables

use std::env;
use std::time::Duration;

/// Five minutes, in the same unit as sample timestamps
pub const DEFAULT_WINDOW_MS: i64 = 5 * 60 * 1000;

/// What happens when two samples arrive in the same millisecond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollisionPolicy {
    /// Every sample is kept as its own entry
    #[default]
    Retain,
    /// The later sample replaces the earlier one (legacy behavior)
    Overwrite,
}

impl CollisionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionPolicy::Retain => "retain",
            CollisionPolicy::Overwrite => "overwrite",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Some(CollisionPolicy::Retain),
            "overwrite" => Some(CollisionPolicy::Overwrite),
            _ => None,
        }
    }
}

/// Configuration for a windowed aggregator
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Trailing window length in milliseconds
    pub window_ms: i64,

    /// Same-millisecond collision policy
    pub collision_policy: CollisionPolicy,

    /// Background prune interval in milliseconds (0 = never prune)
    pub prune_interval_ms: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            collision_policy: CollisionPolicy::Retain,
            prune_interval_ms: 0,
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `MEAN_WINDOW_MS` (default: 300000)
    /// - `MEAN_COLLISION_POLICY` (`retain` or `overwrite`, default: retain)
    /// - `MEAN_PRUNE_INTERVAL_MS` (default: 0, pruning disabled)
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// Malformed values fall back to their defaults with a warning.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let window_ms = match lookup("MEAN_WINDOW_MS") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    log::warn!("Ignoring malformed MEAN_WINDOW_MS={:?}", raw);
                    defaults.window_ms
                }
            },
            None => defaults.window_ms,
        };

        let collision_policy = match lookup("MEAN_COLLISION_POLICY") {
            Some(raw) => CollisionPolicy::from_str(&raw).unwrap_or_else(|| {
                log::warn!("Ignoring malformed MEAN_COLLISION_POLICY={:?}", raw);
                defaults.collision_policy
            }),
            None => defaults.collision_policy,
        };

        let prune_interval_ms = match lookup("MEAN_PRUNE_INTERVAL_MS") {
            Some(raw) => raw.trim().parse::<u64>().unwrap_or_else(|_| {
                log::warn!("Ignoring malformed MEAN_PRUNE_INTERVAL_MS={:?}", raw);
                defaults.prune_interval_ms
            }),
            None => defaults.prune_interval_ms,
        };

        Self {
            window_ms,
            collision_policy,
            prune_interval_ms,
        }
    }

    /// Prune interval, or `None` when pruning is disabled
    pub fn prune_interval(&self) -> Option<Duration> {
        if self.prune_interval_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.prune_interval_ms))
        }
    }
}
