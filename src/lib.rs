//! # windowed-mean
//!
//! Rolling mean of an integer sample stream over a trailing time window.
//!
//! ## Architecture
//!
//! ```text
//! producers ──accept(v)──► SampleStore (BTreeMap keyed by (ts_ms, seq), RwLock)
//!                                 ▲
//! consumers ──mean()──► spawn_blocking ── tail scan from now - window ──► MeanHandle
//!                                 ▲
//!                  pruner (optional) ── prune_before(now - window)
//! ```
//!
//! - Samples are stamped with wall-clock milliseconds on arrival
//! - `mean()` never blocks the caller; the scan runs on the runtime's blocking pool
//! - Empty windows yield 0.0
//! - Expired samples stay in memory unless pruning is enabled
//!
//! ## Module Organization
//!
//! - `aggregator` - `WindowedAggregator` and the deferred `MeanHandle`
//! - `store` - concurrent ordered sample container
//! - `pruner` - background eviction task
//! - `config` - environment-driven configuration
//! - `error` - errors surfaced through `MeanHandle`

pub mod aggregator;
pub mod config;
pub mod error;
pub mod pruner;
pub mod store;

pub use aggregator::{current_timestamp_ms, MeanHandle, WindowedAggregator};
pub use config::{AggregatorConfig, CollisionPolicy, DEFAULT_WINDOW_MS};
pub use error::{AggregatorError, Result};
pub use pruner::{PrunerHandle, MIN_PRUNE_INTERVAL};
pub use store::{SampleKey, SampleStore, WindowTotals};
