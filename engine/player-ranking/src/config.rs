//! Ranking configuration
//!
//! Loaded from TOML with environment overrides; metric and group weights are
//! sanitized and renormalized before use.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::error::{RankingError, Result};
use crate::metrics::{MetricCatalog, MetricKey};

/// Default weight substituted for malformed weight cells
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Configuration for a ranking run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Historical averaging parameters
    pub averaging: AveragingConfig,

    /// Trend estimation parameters
    pub trend: TrendConfig,

    /// Distance-bucket weights for the course being played
    pub course_setup: CourseSetup,

    /// Past-performance multiplier configuration
    pub past_performance: PastPerformanceConfig,

    /// Similar / specialized event classification
    pub events: EventListConfig,

    /// Scorer profile
    pub scoring: ScoringConfig,

    /// Group-statistics cache
    pub cache: CacheConfig,

    /// Metric groups and their weights
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AveragingConfig {
    /// Minimum rounds a bucket needs before it yields an average
    pub min_samples: usize,

    /// Exponential recency decay per round
    pub decay_lambda: f64,

    /// Sample count at which the context bucket gets its full blend weight
    pub plenty_samples: usize,

    /// Full blend weight for the similar-context bucket
    pub similar_weight: f64,

    /// Full blend weight for specialized-context putting
    pub putting_specialized_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Number of most recent rounds considered
    pub window: usize,

    /// Rounds in the window that must carry a scoring value
    pub min_rounds: usize,

    /// Recency decay for the regression weights
    pub decay_lambda: f64,

    /// Slopes below this magnitude are treated as flat
    pub threshold: f64,

    /// How strongly a trend moves the blended average
    pub influence: f64,
}

/// Share of approach shots expected from each distance bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourseSetup {
    pub under_100: f64,
    pub from_100_to_150: f64,
    pub from_150_to_200: f64,
    pub over_200: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PastPerformanceConfig {
    /// Apply the past-performance multiplier
    pub enabled: bool,

    /// Interpolation weight toward the raw multiplier (0 = no effect)
    pub weight: f64,

    /// Event being ranked; excluded from past-performance lookups
    pub current_event_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventListConfig {
    /// Events played on courses similar to the current one
    pub similar: Vec<String>,

    /// Events that share the current course's specialized traits (e.g. greens)
    pub specialized: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Apply coverage dampening and the sparse-data tiers
    pub apply_coverage_dampening: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Group statistics older than this are recomputed
    pub max_age_days: i64,
}

/// A weight as written in configuration; numbers or numeric strings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawWeight {
    Number(f64),
    Text(String),
}

impl RawWeight {
    /// Finite non-negative value, otherwise the default
    pub fn sanitize(&self, context: &str) -> f64 {
        let parsed = match self {
            RawWeight::Number(n) => Some(*n),
            RawWeight::Text(s) => s.trim().parse::<f64>().ok(),
        };
        match parsed {
            Some(w) if w.is_finite() && w >= 0.0 => w,
            _ => {
                warn!(
                    "Invalid weight {:?} for {}, using default {}",
                    self, context, DEFAULT_WEIGHT
                );
                DEFAULT_WEIGHT
            }
        }
    }
}

impl From<f64> for RawWeight {
    fn from(value: f64) -> Self {
        RawWeight::Number(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    pub weight: RawWeight,
    pub metrics: Vec<GroupMetricConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMetricConfig {
    /// Canonical metric name, e.g. "SG Putting"
    pub name: String,
    pub weight: RawWeight,
}

/// A metric inside a resolved group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupMetric {
    pub name: String,
    /// Position in the final (post-BCC) metric vector
    pub index: usize,
    pub key: MetricKey,
    /// Share of the group; sums to 1 within a group
    pub weight: f64,
}

/// A resolved metric group
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGroup {
    pub name: String,
    pub metrics: Vec<GroupMetric>,
    /// Share of the overall score; sums to 1 across groups
    pub weight: f64,
}

impl MetricGroup {
    /// Sanitize, resolve, and renormalize the configured groups
    pub fn resolve_all(
        groups: &[GroupConfig],
        catalog: &MetricCatalog,
    ) -> Result<Vec<MetricGroup>> {
        if groups.is_empty() {
            return Err(RankingError::EmptyMetricGroups);
        }

        let mut resolved = Vec::with_capacity(groups.len());
        for group in groups {
            if group.metrics.is_empty() {
                return Err(RankingError::EmptyGroup(group.name.clone()));
            }

            let mut metrics = Vec::with_capacity(group.metrics.len());
            for metric in &group.metrics {
                let index = catalog
                    .index_of(&metric.name)
                    .ok_or_else(|| RankingError::UnknownMetric(metric.name.clone()))?;
                let key = catalog
                    .key(index)
                    .ok_or_else(|| RankingError::UnknownMetric(metric.name.clone()))?;
                let context = format!("{} / {}", group.name, metric.name);
                metrics.push(GroupMetric {
                    name: metric.name.clone(),
                    index,
                    key,
                    weight: metric.weight.sanitize(&context),
                });
            }

            let shares = normalize_weights(&metrics.iter().map(|m| m.weight).collect::<Vec<_>>());
            for (metric, share) in metrics.iter_mut().zip(shares) {
                metric.weight = share;
            }

            resolved.push(MetricGroup {
                name: group.name.clone(),
                metrics,
                weight: group.weight.sanitize(&group.name),
            });
        }

        let shares = normalize_weights(&resolved.iter().map(|g| g.weight).collect::<Vec<_>>());
        for (group, share) in resolved.iter_mut().zip(shares) {
            group.weight = share;
        }

        Ok(resolved)
    }
}

/// Scale weights to sum to 1; an all-zero set becomes equal shares
pub fn normalize_weights(weights: &[f64]) -> Vec<f64> {
    if weights.is_empty() {
        return Vec::new();
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        let share = 1.0 / weights.len() as f64;
        return vec![share; weights.len()];
    }
    weights.iter().map(|w| w / total).collect()
}

impl CourseSetup {
    /// Bucket weights in [`crate::metrics::DistanceBucket`] order, renormalized to 1
    pub fn normalized(&self) -> [f64; 4] {
        let raw = [self.under_100, self.from_100_to_150, self.from_150_to_200, self.over_200]
            .map(|w| if w.is_finite() && w >= 0.0 { w } else { 0.0 });
        let shares = normalize_weights(&raw);
        [shares[0], shares[1], shares[2], shares[3]]
    }
}

impl Default for CourseSetup {
    fn default() -> Self {
        Self { under_100: 0.15, from_100_to_150: 0.35, from_150_to_200: 0.35, over_200: 0.15 }
    }
}

impl Default for AveragingConfig {
    fn default() -> Self {
        Self {
            min_samples: 2,
            decay_lambda: 0.2,
            plenty_samples: 20,
            similar_weight: 0.6,
            putting_specialized_weight: 0.75,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self { window: 24, min_rounds: 15, decay_lambda: 0.2, threshold: 0.005, influence: 0.3 }
    }
}

impl Default for PastPerformanceConfig {
    fn default() -> Self {
        Self { enabled: true, weight: 0.3, current_event_id: None }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { apply_coverage_dampening: true }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_age_days: 7 }
    }
}

fn group(name: &str, weight: f64, metrics: &[(&str, f64)]) -> GroupConfig {
    GroupConfig {
        name: name.to_string(),
        weight: RawWeight::Number(weight),
        metrics: metrics
            .iter()
            .map(|(n, w)| GroupMetricConfig { name: n.to_string(), weight: RawWeight::Number(*w) })
            .collect(),
    }
}

fn approach_group(name: &str, weight: f64, bucket: &str) -> GroupConfig {
    let names: Vec<(String, f64)> = ["FW", "Rough"]
        .iter()
        .flat_map(|lie| {
            let lie_share = if *lie == "FW" { 0.6 } else { 0.4 };
            [("GIR", 0.3), ("SG", 0.4), ("Prox", 0.3)]
                .into_iter()
                .map(move |(stat, w)| (format!("Approach {bucket} {lie} {stat}"), w * lie_share))
        })
        .collect();
    GroupConfig {
        name: name.to_string(),
        weight: RawWeight::Number(weight),
        metrics: names
            .into_iter()
            .map(|(n, w)| GroupMetricConfig { name: n, weight: RawWeight::Number(w) })
            .collect(),
    }
}

/// Calibrated default group table
pub fn default_groups() -> Vec<GroupConfig> {
    vec![
        group(
            "Driving Performance",
            0.15,
            &[("Driving Distance", 0.3), ("Driving Accuracy", 0.3), ("SG OTT", 0.4)],
        ),
        approach_group("Approach - Short (<100)", 0.08, "<100"),
        approach_group("Approach - Mid (100-150)", 0.12, "100-150"),
        approach_group("Approach - Long (150-200)", 0.12, "150-200"),
        approach_group("Approach - Very Long (>200)", 0.08, ">200"),
        group("Putting", 0.12, &[("SG Putting", 1.0)]),
        group("Around the Green", 0.08, &[("SG Around Green", 0.6), ("Scrambling", 0.4)]),
        group(
            "Ball Striking",
            0.10,
            &[
                ("SG T2G", 0.4),
                ("SG Approach", 0.3),
                ("Greens in Regulation", 0.15),
                ("Great Shots", 0.1),
                ("Poor Shots", 0.05),
            ],
        ),
        group(
            "Scoring",
            0.10,
            &[
                ("Scoring Average", 0.3),
                ("Birdies or Better", 0.2),
                ("Birdie Chances Created", 0.3),
                ("SG Total", 0.2),
            ],
        ),
        group("Course Management", 0.05, &[("Fairway Proximity", 0.5), ("Rough Proximity", 0.5)]),
    ]
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            averaging: AveragingConfig::default(),
            trend: TrendConfig::default(),
            course_setup: CourseSetup::default(),
            past_performance: PastPerformanceConfig::default(),
            events: EventListConfig::default(),
            scoring: ScoringConfig::default(),
            cache: CacheConfig::default(),
            groups: default_groups(),
        }
    }
}

impl RankingConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        if !path.as_ref().exists() {
            return Err(RankingError::MissingConfiguration(path.as_ref().display().to_string()));
        }
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: RankingConfig = toml::from_str(&content)?;
        info!("Loaded ranking configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override selected settings from environment variables
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(event) = std::env::var("RANKING_CURRENT_EVENT") {
            self.past_performance.current_event_id = Some(event);
        }

        if let Ok(enabled) = std::env::var("RANKING_PAST_PERFORMANCE_ENABLED") {
            match enabled.parse() {
                Ok(v) => self.past_performance.enabled = v,
                Err(_) => warn!("Ignoring RANKING_PAST_PERFORMANCE_ENABLED={}", enabled),
            }
        }

        if let Ok(weight) = std::env::var("RANKING_PAST_PERFORMANCE_WEIGHT") {
            match weight.parse() {
                Ok(v) => self.past_performance.weight = v,
                Err(_) => warn!("Ignoring RANKING_PAST_PERFORMANCE_WEIGHT={}", weight),
            }
        }

        if let Ok(min_samples) = std::env::var("RANKING_MIN_SAMPLES") {
            match min_samples.parse() {
                Ok(v) => self.averaging.min_samples = v,
                Err(_) => warn!("Ignoring RANKING_MIN_SAMPLES={}", min_samples),
            }
        }

        if let Ok(lambda) = std::env::var("RANKING_DECAY_LAMBDA") {
            match lambda.parse() {
                Ok(v) => self.averaging.decay_lambda = v,
                Err(_) => warn!("Ignoring RANKING_DECAY_LAMBDA={}", lambda),
            }
        }

        self
    }

    /// Resolve the configured groups against the metric catalog
    pub fn metric_groups(&self, catalog: &MetricCatalog) -> Result<Vec<MetricGroup>> {
        MetricGroup::resolve_all(&self.groups, catalog)
    }

    pub fn cache_max_age(&self) -> chrono::Duration {
        chrono::Duration::days(self.cache.max_age_days.max(0))
    }
}
