//! Historical averaging
//!
//! Per metric and per bucket, an exponentially recency-weighted average is
//! taken over rounds that carry a value. Buckets are then blended in priority
//! order: specialized putting, similar context, general history, and finally
//! a pooled retry across all buckets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::AveragingConfig;
use crate::metrics::{ApproachMetric, PreBccVector, RoundMetric};
use crate::models::{PlayerRecord, RoundRecord};

/// Where a blended average came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AverageSource {
    SpecializedBlend,
    SpecializedOnly,
    SimilarBlend,
    SimilarOnly,
    Historical,
    Pooled,
    Missing,
}

impl AverageSource {
    pub fn has_data(&self) -> bool {
        !matches!(self, AverageSource::Missing)
    }
}

/// Recency-weighted average of one bucket
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketAverage {
    pub value: f64,
    pub samples: usize,
}

/// Blended value for one metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricAverage {
    pub value: f64,
    pub source: AverageSource,
}

/// Real-data accounting for a player's metric slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DataCoverage {
    pub present: usize,
    pub total: usize,
}

impl DataCoverage {
    pub fn record(&mut self, has_data: bool) {
        self.total += 1;
        if has_data {
            self.present += 1;
        }
    }

    /// Fraction of slots backed by real data, in [0, 1]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.present as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

/// Averages for every round metric plus the coverage ledger
#[derive(Debug, Clone)]
pub struct PlayerAverages {
    pub metrics: BTreeMap<RoundMetric, MetricAverage>,
    pub coverage: DataCoverage,
}

impl PlayerAverages {
    pub fn value(&self, metric: RoundMetric) -> f64 {
        self.metrics.get(&metric).map(|m| m.value).unwrap_or(0.0)
    }
}

/// Weighted mean with weight e^(-λ·i) over values ordered newest first
pub fn recency_weighted_average(values: &[f64], lambda: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let (weighted, total) = values.iter().enumerate().fold((0.0, 0.0), |(sum, w_sum), (i, v)| {
        let w = (-lambda * i as f64).exp();
        (sum + w * v, w_sum + w)
    });
    if total <= 0.0 {
        return None;
    }
    Some(weighted / total)
}

/// Blend weight for a context bucket with `samples` rounds.
///
/// 0.8 x base at or below `min_samples`, the full base at or above `plenty`,
/// linear in between.
pub fn dynamic_weight(base: f64, samples: usize, min_samples: usize, plenty: usize) -> f64 {
    let floor = 0.8 * base;
    if samples <= min_samples || plenty <= min_samples {
        return if samples >= plenty { base } else { floor };
    }
    if samples >= plenty {
        return base;
    }
    let t = (samples - min_samples) as f64 / (plenty - min_samples) as f64;
    floor + (base - floor) * t
}

pub struct HistoricalAverager<'a> {
    config: &'a AveragingConfig,
}

impl<'a> HistoricalAverager<'a> {
    pub fn new(config: &'a AveragingConfig) -> Self {
        Self { config }
    }

    /// Average of one bucket, or `None` below the minimum sample size
    pub fn bucket_average(
        &self,
        rounds: &[RoundRecord],
        metric: RoundMetric,
    ) -> Option<BucketAverage> {
        let values: Vec<f64> = rounds.iter().filter_map(|r| r.value(metric)).collect();
        if values.len() < self.config.min_samples.max(1) {
            return None;
        }
        recency_weighted_average(&values, self.config.decay_lambda)
            .map(|value| BucketAverage { value, samples: values.len() })
    }

    fn blend(&self, context: BucketAverage, historical: Option<BucketAverage>, base: f64) -> f64 {
        match historical {
            Some(hist) => {
                let w = dynamic_weight(
                    base,
                    context.samples,
                    self.config.min_samples,
                    self.config.plenty_samples,
                );
                w * context.value + (1.0 - w) * hist.value
            }
            None => context.value,
        }
    }

    pub fn average_metric(&self, player: &PlayerRecord, metric: RoundMetric) -> MetricAverage {
        let historical = self.bucket_average(&player.historical_rounds, metric);

        if metric.is_putting() {
            if let Some(specialized) = self.bucket_average(&player.specialized_rounds, metric) {
                let value =
                    self.blend(specialized, historical, self.config.putting_specialized_weight);
                let source = if historical.is_some() {
                    AverageSource::SpecializedBlend
                } else {
                    AverageSource::SpecializedOnly
                };
                return MetricAverage { value, source };
            }
        }

        if let Some(similar) = self.bucket_average(&player.similar_rounds, metric) {
            let value = self.blend(similar, historical, self.config.similar_weight);
            let source = if historical.is_some() {
                AverageSource::SimilarBlend
            } else {
                AverageSource::SimilarOnly
            };
            return MetricAverage { value, source };
        }

        if let Some(hist) = historical {
            return MetricAverage { value: hist.value, source: AverageSource::Historical };
        }

        let mut pooled: Vec<RoundRecord> = player
            .historical_rounds
            .iter()
            .chain(&player.similar_rounds)
            .chain(&player.specialized_rounds)
            .cloned()
            .collect();
        crate::aggregator::sort_rounds(&mut pooled);
        if let Some(avg) = self.bucket_average(&pooled, metric) {
            return MetricAverage { value: avg.value, source: AverageSource::Pooled };
        }

        MetricAverage { value: 0.0, source: AverageSource::Missing }
    }

    /// Average every round metric for a player
    pub fn average_player(&self, player: &PlayerRecord) -> PlayerAverages {
        let mut metrics = BTreeMap::new();
        let mut coverage = DataCoverage::default();
        for metric in RoundMetric::ALL {
            let avg = self.average_metric(player, metric);
            coverage.record(avg.source.has_data());
            metrics.insert(metric, avg);
        }
        debug!(
            "Averaged {} for {}: {}/{} metrics with data",
            player.id, player.name, coverage.present, coverage.total
        );
        PlayerAverages { metrics, coverage }
    }
}

/// Lay out round averages and approach values in pre-BCC order.
///
/// Approach slots count toward coverage when the approach table holds a
/// non-zero value for them.
pub fn build_pre_bcc_vector(
    player: &PlayerRecord,
    averages: &PlayerAverages,
) -> (PreBccVector, DataCoverage) {
    let mut vector = PreBccVector::zeroed();
    let mut coverage = averages.coverage;

    for metric in RoundMetric::ALL {
        vector.0[metric.pre_index()] = averages.value(metric);
    }
    for metric in ApproachMetric::all() {
        let value = player.approach_value(metric).unwrap_or(0.0);
        coverage.record(value != 0.0);
        vector.0[metric.pre_index()] = value;
    }

    (vector, coverage)
}
