//! Player Ranking Engine
//!
//! Ranks a tournament field from historical round data. Rounds are blended
//! into per-player averages, extended with Birdie Chances Created, adjusted
//! by recent form, and z-scored against the field within weighted metric
//! groups. Sparse players fall back to baselines from their recent finishes.

pub mod aggregator;
pub mod averager;
pub mod bcc;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod group_stats;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod past_performance;
pub mod ranker;
pub mod scorer;
pub mod trend;

pub use cache::GroupStatsCache;
pub use config::RankingConfig;
pub use engine::{RankingEngine, RankingReport, RunSummary};
pub use error::{RankingError, Result};
pub use metrics::{MetricCatalog, MetricKey};
pub use models::*;
pub use scorer::ScoringProfile;
