//! Field-wide group statistics
//!
//! Mean and sample standard deviation per configured metric, taken over the
//! transformed values of the current field. Zero is treated as "no data"
//! and excluded. Metrics with no usable samples fall back to calibrated
//! baselines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::MetricGroup;
use crate::metrics::{ApproachStat, Lie, MetricKey, MetricVector, RoundMetric};

/// Floor for every standard deviation
pub const STD_DEV_EPSILON: f64 = 1e-3;

/// Calibrated mean and standard deviation in transformed units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub mean: f64,
    pub std_dev: f64,
}

const fn b(mean: f64, std_dev: f64) -> Baseline {
    Baseline { mean, std_dev }
}

/// Calibrated baseline for a metric, if one exists
pub fn baseline(key: MetricKey) -> Option<Baseline> {
    match key {
        MetricKey::Round(metric) => Some(match metric {
            RoundMetric::SgTotal => b(0.25, 0.85),
            RoundMetric::DrivingDistance => b(295.0, 9.0),
            RoundMetric::DrivingAccuracy => b(0.60, 0.06),
            RoundMetric::SgT2g => b(0.20, 0.70),
            RoundMetric::SgApproach => b(0.10, 0.45),
            RoundMetric::SgAroundGreen => b(0.03, 0.30),
            RoundMetric::SgOffTee => b(0.08, 0.35),
            RoundMetric::SgPutting => b(0.03, 0.40),
            RoundMetric::GreensInRegulation => b(0.66, 0.04),
            RoundMetric::Scrambling => b(0.58, 0.05),
            RoundMetric::GreatShots => b(5.5, 1.2),
            // ceiling 20, typical 8 poor shots
            RoundMetric::PoorShots => b(12.0, 1.5),
            // ceiling 74, typical 70.8
            RoundMetric::ScoringAverage => b(3.2, 0.7),
            RoundMetric::BirdiesOrBetter => b(0.22, 0.03),
            // ceiling 60, typical 30 / 42 feet
            RoundMetric::FairwayProximity => b(30.0, 4.0),
            RoundMetric::RoughProximity => b(18.0, 5.0),
        }),
        MetricKey::BirdieChancesCreated => Some(b(0.6, 0.3)),
        MetricKey::Approach(metric) => {
            let bucket = metric.bucket as usize;
            match (metric.stat, metric.lie) {
                (ApproachStat::Gir, Lie::Fairway) => {
                    Some(b([0.85, 0.78, 0.66, 0.50][bucket], 0.06))
                }
                (ApproachStat::Gir, Lie::Rough) => Some(b([0.65, 0.55, 0.45, 0.30][bucket], 0.06)),
                (ApproachStat::StrokesGained, _) => Some(b(0.0, 0.6)),
                // ceiling 60 minus typical proximity
                (ApproachStat::Proximity, Lie::Fairway) => {
                    Some(b([45.0, 38.0, 28.0, 15.0][bucket], 4.0))
                }
                (ApproachStat::Proximity, Lie::Rough) => {
                    Some(b([35.0, 25.0, 15.0, 5.0][bucket], 4.0))
                }
            }
        }
    }
}

/// Where a metric's statistics came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatsSource {
    Field,
    Baseline,
    /// No samples and no baseline: every player scores z = 0
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    pub mean: f64,
    pub std_dev: f64,
    pub samples: usize,
    pub source: StatsSource,
}

/// group name -> metric name -> stats
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub groups: BTreeMap<String, BTreeMap<String, MetricStats>>,
}

impl GroupStats {
    pub fn get(&self, group: &str, metric: &str) -> Option<&MetricStats> {
        self.groups.get(group).and_then(|g| g.get(metric))
    }

    /// Number of metric entries resting on baselines or neutral stats
    pub fn fallback_count(&self) -> usize {
        self.groups
            .values()
            .flat_map(|g| g.values())
            .filter(|s| s.source != StatsSource::Field)
            .count()
    }
}

/// Mean and Bessel-corrected standard deviation
pub fn mean_and_std(values: &[f64]) -> Option<(f64, Option<f64>)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return Some((mean, None));
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, Some(variance.sqrt())))
}

pub struct GroupStatsCalculator;

impl GroupStatsCalculator {
    /// Statistics for one metric slot across the field
    pub fn metric_stats(key: MetricKey, index: usize, field: &[&MetricVector]) -> MetricStats {
        let values: Vec<f64> = field
            .iter()
            .map(|v| v.get(index))
            .filter(|raw| raw.is_finite() && *raw != 0.0)
            .map(|raw| key.transform(raw))
            .collect();

        let fallback = baseline(key);
        match mean_and_std(&values) {
            Some((mean, std_dev)) => {
                let std_dev = std_dev
                    .or_else(|| fallback.map(|b| b.std_dev))
                    .unwrap_or(STD_DEV_EPSILON)
                    .max(STD_DEV_EPSILON);
                MetricStats { mean, std_dev, samples: values.len(), source: StatsSource::Field }
            }
            None => match fallback {
                Some(b) => {
                    debug!("No field samples for {}, using baseline", key);
                    MetricStats {
                        mean: b.mean,
                        std_dev: b.std_dev.max(STD_DEV_EPSILON),
                        samples: 0,
                        source: StatsSource::Baseline,
                    }
                }
                None => {
                    warn!("No field samples or baseline for {}", key);
                    MetricStats {
                        mean: 0.0,
                        std_dev: STD_DEV_EPSILON,
                        samples: 0,
                        source: StatsSource::Neutral,
                    }
                }
            },
        }
    }

    /// Statistics for every configured group over the whole field
    pub fn compute(groups: &[MetricGroup], field: &[&MetricVector]) -> GroupStats {
        let mut stats = GroupStats::default();
        for group in groups {
            let entry = stats.groups.entry(group.name.clone()).or_default();
            for metric in &group.metrics {
                let metric_stats = Self::metric_stats(metric.key, metric.index, field);
                entry.insert(metric.name.clone(), metric_stats);
            }
        }
        stats
    }
}
