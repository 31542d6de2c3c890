//! Recent-form trend estimation
//!
//! Recency-weighted regression slope per round metric over the latest
//! general-historical rounds, smoothed and thresholded.

use std::collections::BTreeMap;

use crate::config::TrendConfig;
use crate::metrics::{Direction, IndexRemap, MetricVector, RoundMetric};
use crate::models::RoundRecord;

/// Values a metric needs inside the window before a slope is fitted
const MIN_POINTS: usize = 3;
const SMOOTHING_WINDOW: usize = 3;

/// Improvement-oriented slope per round metric (positive = getting better)
pub type TrendVector = BTreeMap<RoundMetric, f64>;

pub fn flat_trends() -> TrendVector {
    RoundMetric::ALL.iter().map(|m| (*m, 0.0)).collect()
}

/// Centered moving average; the edges average whatever neighbours exist
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || values.len() < 2 {
        return values.to_vec();
    }
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(values.len());
            let slice = &values[start..end];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Weighted least-squares slope of `values` against their position.
///
/// Values are oldest first; the newest point has weight 1 and each step back
/// is discounted by e^(-λ).
pub fn weighted_slope(values: &[f64], lambda: f64) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let weights: Vec<f64> = (0..n).map(|i| (-lambda * (n - 1 - i) as f64).exp()).collect();
    let w_sum: f64 = weights.iter().sum();
    let x_mean = weights.iter().enumerate().map(|(i, w)| w * i as f64).sum::<f64>() / w_sum;
    let y_mean = weights.iter().zip(values).map(|(w, y)| w * y).sum::<f64>() / w_sum;

    let mut cov = 0.0;
    let mut var = 0.0;
    for (i, (w, y)) in weights.iter().zip(values).enumerate() {
        let dx = i as f64 - x_mean;
        cov += w * dx * (y - y_mean);
        var += w * dx * dx;
    }
    if var <= 0.0 {
        return 0.0;
    }
    let slope = cov / var;
    if slope.is_finite() {
        slope
    } else {
        0.0
    }
}

pub struct TrendEstimator<'a> {
    config: &'a TrendConfig,
}

impl<'a> TrendEstimator<'a> {
    pub fn new(config: &'a TrendConfig) -> Self {
        Self { config }
    }

    /// Estimate trends from general-historical rounds (newest first)
    pub fn estimate(&self, rounds: &[RoundRecord]) -> TrendVector {
        let window = &rounds[..rounds.len().min(self.config.window)];
        let scored = window
            .iter()
            .filter(|r| r.value(RoundMetric::ScoringAverage).is_some_and(|v| v != 0.0))
            .count();
        if scored < self.config.min_rounds {
            return flat_trends();
        }

        let chronological: Vec<&RoundRecord> = window.iter().rev().collect();
        RoundMetric::ALL
            .iter()
            .map(|metric| {
                let values: Vec<f64> =
                    chronological.iter().filter_map(|r| r.value(*metric)).collect();
                (*metric, self.metric_trend(*metric, &values))
            })
            .collect()
    }

    fn metric_trend(&self, metric: RoundMetric, values: &[f64]) -> f64 {
        if values.len() < MIN_POINTS {
            return 0.0;
        }
        let smoothed = moving_average(values, SMOOTHING_WINDOW);
        let slope = weighted_slope(&smoothed, self.config.decay_lambda);
        if slope.abs() < self.config.threshold {
            return 0.0;
        }
        match metric.direction() {
            Direction::HigherIsBetter => slope,
            Direction::LowerIsBetter { .. } => -slope,
        }
    }
}

/// Nudge present averages by their trend, scaled by `influence`
pub fn apply_trends(
    vector: &mut MetricVector,
    trends: &TrendVector,
    remap: &IndexRemap,
    influence: f64,
) {
    for (metric, improvement) in trends {
        if *improvement == 0.0 {
            continue;
        }
        let index = remap.post_index(metric.pre_index());
        let Some(value) = vector.0.get_mut(index) else {
            continue;
        };
        if *value == 0.0 {
            continue;
        }
        let adjustment = improvement * influence;
        match metric.direction() {
            Direction::HigherIsBetter => *value += adjustment,
            Direction::LowerIsBetter { .. } => *value -= adjustment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{PreBccVector, BCC_INSERT_INDEX};
    use chrono::NaiveDate;

    /// Rounds newest first; `sg(i)` and `score(i)` take the chronological index
    fn history(
        n: usize,
        sg: impl Fn(usize) -> f64,
        score: impl Fn(usize) -> f64,
    ) -> Vec<RoundRecord> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut out: Vec<RoundRecord> = (0..n)
            .map(|i| {
                let mut metrics = BTreeMap::new();
                metrics.insert(RoundMetric::SgTotal, sg(i));
                metrics.insert(RoundMetric::ScoringAverage, score(i));
                RoundRecord {
                    date: start + chrono::Duration::days(i as i64),
                    event_id: "e".into(),
                    year: 2024,
                    round_num: 1,
                    metrics,
                }
            })
            .collect();
        out.reverse();
        out
    }

    #[test]
    fn test_moving_average_edges() {
        let smoothed = moving_average(&[1.0, 2.0, 3.0, 10.0], 3);
        assert_eq!(smoothed, vec![1.5, 2.0, 5.0, 6.5]);
    }

    #[test]
    fn test_slope_of_line_is_exact() {
        let line: Vec<f64> = (0..10).map(|i| 2.0 + 0.5 * i as f64).collect();
        assert!((weighted_slope(&line, 0.2) - 0.5).abs() < 1e-9);
        assert!(weighted_slope(&[4.0; 6], 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_too_few_scored_rounds_gives_flat_vector() {
        let config = TrendConfig::default();
        let rounds = history(14, |i| i as f64, |_| 70.0);
        let trends = TrendEstimator::new(&config).estimate(&rounds);
        assert_eq!(trends.len(), RoundMetric::ALL.len());
        assert!(trends.values().all(|v| *v == 0.0));
    }

    #[test]
    fn test_improving_player() {
        let config = TrendConfig::default();
        let rounds = history(20, |i| 0.1 * i as f64, |i| 72.0 - 0.1 * i as f64);
        let trends = TrendEstimator::new(&config).estimate(&rounds);
        // Edge smoothing flattens the line slightly
        assert!((trends[&RoundMetric::SgTotal] - 0.1).abs() < 0.01);
        // Scoring average falls, which is an improvement
        assert!((trends[&RoundMetric::ScoringAverage] - 0.1).abs() < 0.01);
        assert_eq!(trends[&RoundMetric::SgPutting], 0.0);
    }

    #[test]
    fn test_small_slopes_are_clamped() {
        let config = TrendConfig::default();
        let rounds = history(20, |i| 0.001 * i as f64, |_| 70.0);
        let trends = TrendEstimator::new(&config).estimate(&rounds);
        assert_eq!(trends[&RoundMetric::SgTotal], 0.0);
    }

    #[test]
    fn test_apply_trends_respects_direction() {
        let mut pre = PreBccVector::zeroed();
        pre.0[RoundMetric::SgTotal.pre_index()] = 1.0;
        pre.0[RoundMetric::ScoringAverage.pre_index()] = 71.0;
        let (mut vector, remap) = crate::metrics::insert_at(&pre, BCC_INSERT_INDEX, 0.0);

        let mut trends = flat_trends();
        trends.insert(RoundMetric::SgTotal, 0.1);
        trends.insert(RoundMetric::ScoringAverage, 0.2);
        trends.insert(RoundMetric::SgPutting, 0.5);
        apply_trends(&mut vector, &trends, &remap, 0.5);

        let at = |metric: RoundMetric| vector.get(remap.post_index(metric.pre_index()));
        assert!((at(RoundMetric::SgTotal) - 1.05).abs() < 1e-12);
        assert!((at(RoundMetric::ScoringAverage) - 70.9).abs() < 1e-12);
        // Missing values stay missing
        assert_eq!(vector.get(remap.post_index(RoundMetric::SgPutting.pre_index())), 0.0);
    }
}
