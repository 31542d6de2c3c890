//! Player scoring
//!
//! Turns a final metric vector into per-metric z-scores, group scores, a
//! weighted score and WAR, then applies the sparse-data policy and the
//! past-performance multiplier.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::config::{MetricGroup, PastPerformanceConfig, ScoringConfig};
use crate::group_stats::{GroupStats, MetricStats};
use crate::metrics::{MetricKey, MetricVector};
use crate::models::{PlayerRecord, PlayerScore, ScoreTier};
use crate::past_performance::{has_recent_top10, recent_finish_baseline, PastPerformance};
use crate::trend::TrendVector;

/// Coverage below this replaces the score with the recent-finish baseline
pub const SPARSE_COVERAGE: f64 = 0.50;
/// Coverage at or above this is scored normally
pub const NORMAL_COVERAGE: f64 = 0.70;

const DAMPENING_EXPONENT: f64 = 0.35;
const SCORING_Z_THRESHOLD: f64 = 2.0;
const SCORING_Z_EXPONENT: f64 = 0.75;

const NORMAL_SCALE_FLOOR: f64 = 0.49;

const LOW_CONFIDENCE: f64 = 0.85;
const LOW_CONFIDENCE_SCORE_CAP: f64 = 0.15;
const LOW_CONFIDENCE_MULTIPLIER_CAP: f64 = 0.3;

/// Which variant of the scorer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringProfile {
    /// Coverage dampening and the sparse-data tiers apply
    Dampened,
    /// Score is weighted score times confidence; no tiers
    Undampened,
}

impl ScoringProfile {
    pub fn from_config(config: &ScoringConfig) -> Self {
        if config.apply_coverage_dampening {
            ScoringProfile::Dampened
        } else {
            ScoringProfile::Undampened
        }
    }
}

/// 0.5 + 0.5·sqrt(coverage), bounded to [0.5, 1]
pub fn confidence_factor(coverage: f64) -> f64 {
    let coverage = if coverage.is_finite() { coverage.clamp(0.0, 1.0) } else { 0.0 };
    0.5 + 0.5 * coverage.sqrt()
}

/// Multiplier applied to every z-score of a sparse player
pub fn coverage_dampening(coverage: f64) -> f64 {
    coverage.clamp(0.0, 1.0).powf(DAMPENING_EXPONENT)
}

/// Normal-tier multiplier: 0.49 at 0.70 coverage rising to 1.0 at full coverage
pub fn normal_scaling(coverage: f64) -> f64 {
    let progress = ((coverage - NORMAL_COVERAGE) / (1.0 - NORMAL_COVERAGE)).clamp(0.0, 1.0);
    NORMAL_SCALE_FLOOR + (1.0 - NORMAL_SCALE_FLOOR) * progress.sqrt()
}

/// Hard ceiling for the moderate tier, stricter as coverage drops
pub fn moderate_ceiling(coverage: f64, recent_top10: bool) -> f64 {
    let (low, high) = if recent_top10 { (1.00, 1.20) } else { (0.95, 1.15) };
    let progress =
        ((coverage - SPARSE_COVERAGE) / (NORMAL_COVERAGE - SPARSE_COVERAGE)).clamp(0.0, 1.0);
    low + (high - low) * progress
}

/// z-score of a raw value against field statistics
///
/// Lower-is-better metrics are transformed first, so a higher z is always
/// better. Scoring-family outliers past |z| = 2 are stretched superlinearly.
pub fn z_score(key: MetricKey, raw: f64, stats: &MetricStats) -> f64 {
    let raw = if raw.is_finite() { raw } else { 0.0 };
    let mut z = (key.transform(raw) - stats.mean) / stats.std_dev;
    if key.is_scoring_family() && z.abs() > SCORING_Z_THRESHOLD {
        z *= (z.abs() / SCORING_Z_THRESHOLD).powf(SCORING_Z_EXPONENT);
    }
    if z.is_finite() {
        z
    } else {
        0.0
    }
}

/// z-scores for one player, grouped as configured
#[derive(Debug, Clone, Default)]
pub struct PlayerZScores {
    /// group name -> (metric weight, z) for metrics with statistics
    pub groups: BTreeMap<String, Vec<(f64, f64)>>,
}

/// Per-player output of the z-score pass, before tiers
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedScore {
    pub group_scores: BTreeMap<String, f64>,
    pub weighted_score: f64,
}

fn finite_or_zero(value: f64, what: &str, player_id: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        warn!("Non-finite {} for {}, using 0", what, player_id);
        0.0
    }
}

/// Scores players against a fixed set of group statistics
pub struct Scorer<'a> {
    profile: ScoringProfile,
    groups: &'a [MetricGroup],
    stats: &'a GroupStats,
    past_performance: PastPerformance<'a>,
}

impl<'a> Scorer<'a> {
    pub fn new(
        profile: ScoringProfile,
        groups: &'a [MetricGroup],
        stats: &'a GroupStats,
        past_performance: &'a PastPerformanceConfig,
    ) -> Self {
        Self {
            profile,
            groups,
            stats,
            past_performance: PastPerformance::new(past_performance),
        }
    }

    /// Per-metric z-scores; metrics without statistics are skipped
    pub fn z_scores(&self, vector: &MetricVector) -> PlayerZScores {
        let mut out = PlayerZScores::default();
        for group in self.groups {
            let entry = out.groups.entry(group.name.clone()).or_default();
            for metric in &group.metrics {
                let Some(stats) = self.stats.get(&group.name, &metric.name) else {
                    continue;
                };
                entry.push((metric.weight, z_score(metric.key, vector.get(metric.index), stats)));
            }
        }
        out
    }

    /// Weighted mean of member z-scores per group, then across groups.
    /// Every z-score is multiplied by `dampening` first.
    pub fn weighted_score(&self, z: &PlayerZScores, dampening: f64) -> WeightedScore {
        let mut group_scores = BTreeMap::new();
        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for group in self.groups {
            let Some(members) = z.groups.get(&group.name).filter(|m| !m.is_empty()) else {
                continue;
            };
            let member_weight: f64 = members.iter().map(|(w, _)| w).sum();
            let score = if member_weight > 0.0 {
                members.iter().map(|(w, z)| w * z * dampening).sum::<f64>() / member_weight
            } else {
                0.0
            };
            group_scores.insert(group.name.clone(), score);
            total += group.weight * score;
            weight_sum += group.weight;
        }
        let weighted_score = if weight_sum > 0.0 { total / weight_sum } else { 0.0 };
        WeightedScore { group_scores, weighted_score }
    }

    /// Σ group weight · metric weight · sign(z)·ln(1+|z|) over undampened z
    pub fn war(&self, z: &PlayerZScores) -> f64 {
        self.groups
            .iter()
            .filter_map(|group| z.groups.get(&group.name).map(|members| (group.weight, members)))
            .flat_map(|(group_weight, members)| {
                members.iter().map(move |(w, z)| group_weight * w * z.signum() * z.abs().ln_1p())
            })
            .sum()
    }

    /// Score one player. `coverage` is the fraction of real metric slots.
    pub fn score(
        &self,
        player: &PlayerRecord,
        vector: &MetricVector,
        coverage: f64,
        trends: &TrendVector,
    ) -> PlayerScore {
        let coverage = if coverage.is_finite() { coverage.clamp(0.0, 1.0) } else { 0.0 };
        let confidence = confidence_factor(coverage);
        let recent = self.past_performance.recent_events(player);
        let recent_top10 = has_recent_top10(&recent);

        let z = self.z_scores(vector);
        let war = finite_or_zero(self.war(&z), "WAR", &player.id);

        let dampened = self.profile == ScoringProfile::Dampened && coverage < NORMAL_COVERAGE;
        let dampening = if dampened { coverage_dampening(coverage) } else { 1.0 };
        let weighted = self.weighted_score(&z, dampening);
        let weighted_score = finite_or_zero(weighted.weighted_score, "weighted score", &player.id);
        let calculated = weighted_score * confidence;

        let (mut refined, tier) = match self.profile {
            ScoringProfile::Undampened => (calculated, ScoreTier::Undampened),
            ScoringProfile::Dampened if coverage < SPARSE_COVERAGE => {
                (recent_finish_baseline(&recent), ScoreTier::BaselineReplaced)
            }
            ScoringProfile::Dampened if coverage < NORMAL_COVERAGE => {
                let ceiling = moderate_ceiling(coverage, recent_top10);
                if recent_top10 {
                    (calculated.min(ceiling), ScoreTier::ModerateCapped)
                } else {
                    let floor = recent_finish_baseline(&recent);
                    (calculated.min(ceiling).max(floor), ScoreTier::ModerateClamped)
                }
            }
            ScoringProfile::Dampened => (calculated * normal_scaling(coverage), ScoreTier::Normal),
        };

        let mut multiplier =
            finite_or_zero(self.past_performance.multiplier(player), "multiplier", &player.id);

        if confidence < LOW_CONFIDENCE && !recent_top10 && !tier.is_baseline_replacement() {
            debug!("Low-confidence cap for {} (confidence {:.3})", player.id, confidence);
            refined = refined.min(LOW_CONFIDENCE_SCORE_CAP);
            multiplier = multiplier.min(LOW_CONFIDENCE_MULTIPLIER_CAP);
        }

        let refined = finite_or_zero(refined, "refined score", &player.id);
        let final_score = finite_or_zero(refined * multiplier, "final score", &player.id);

        debug!(
            "Scored {}: weighted {:.3}, {:?} {:.3}, multiplier {:.3}, final {:.3}, WAR {:.3}",
            player.id, weighted_score, tier, refined, multiplier, final_score, war
        );

        PlayerScore {
            id: player.id.clone(),
            name: player.name.clone(),
            group_scores: weighted.group_scores,
            weighted_score,
            refined_weighted_score: refined,
            past_performance_multiplier: multiplier,
            final_score,
            war,
            data_coverage: coverage,
            confidence_factor: confidence,
            tier,
            trends: trends.iter().map(|(m, v)| (m.name().to_string(), *v)).collect(),
            metrics: vector.0.clone(),
            rank: 0,
        }
    }
}
