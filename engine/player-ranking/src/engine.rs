//! Ranking pipeline
//!
//! Aggregate, average, build the metric vector, estimate trends, compute
//! field statistics, score, rank. Field statistics need every player's
//! final vector, so each phase completes for the whole field before the
//! next one starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::aggregator::{EventContext, PlayerAggregator};
use crate::averager::{build_pre_bcc_vector, HistoricalAverager};
use crate::bcc::insert_bcc;
use crate::cache::{field_fingerprint, GroupStatsCache};
use crate::config::{MetricGroup, RankingConfig};
use crate::error::{RankingError, Result};
use crate::group_stats::{GroupStats, GroupStatsCalculator};
use crate::metrics::{MetricCatalog, MetricVector};
use crate::models::{ApproachRow, PlayerRecord, PlayerScore, RosterEntry, RoundRow, ScoreTier};
use crate::ranker::rank_players;
use crate::scorer::{Scorer, ScoringProfile};
use crate::trend::{apply_trends, TrendEstimator, TrendVector};

/// A player after averaging, BCC insertion and trend adjustment
#[derive(Debug, Clone)]
pub struct ProcessedPlayer {
    pub record: PlayerRecord,
    pub vector: MetricVector,
    pub coverage: f64,
    pub trends: TrendVector,
}

/// Counts describing one ranking run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub field_size: usize,
    /// Roster players with no rounds in any bucket
    pub players_without_rounds: usize,
    pub baseline_replaced: usize,
    pub moderate_tier: usize,
    /// Group metrics resting on calibrated baselines or neutral stats
    pub stats_fallbacks: usize,
    pub stats_from_cache: bool,
}

/// Ordered scores plus a summary of the run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub players: Vec<PlayerScore>,
    pub summary: RunSummary,
}

pub struct RankingEngine {
    config: RankingConfig,
    catalog: MetricCatalog,
    groups: Vec<MetricGroup>,
    context: EventContext,
}

impl RankingEngine {
    /// Validate the configuration and resolve metric groups
    pub fn new(config: RankingConfig) -> Result<Self> {
        validate(&config)?;
        let catalog = MetricCatalog::standard();
        let groups = config.metric_groups(&catalog)?;
        let context = EventContext::new(&config.events.similar, &config.events.specialized);

        info!(
            "Created ranking engine: {} groups, {} metrics, profile {:?}",
            groups.len(),
            catalog.len(),
            ScoringProfile::from_config(&config.scoring)
        );

        Ok(Self { config, catalog, groups, context })
    }

    pub fn config(&self) -> &RankingConfig {
        &self.config
    }

    pub fn groups(&self) -> &[MetricGroup] {
        &self.groups
    }

    /// Rank a field, computing group statistics from scratch
    pub fn rank(
        &self,
        roster: &[RosterEntry],
        rounds: &[RoundRow],
        approach: &[ApproachRow],
    ) -> Result<RankingReport> {
        let processed = self.process_field(roster, rounds, approach)?;
        let stats = self.group_stats(&processed);
        Ok(self.score_field(processed, &stats, false))
    }

    /// Rank a field, reusing group statistics from `cache` when fresh
    pub fn rank_with_cache(
        &self,
        roster: &[RosterEntry],
        rounds: &[RoundRow],
        approach: &[ApproachRow],
        cache: &mut GroupStatsCache,
        now: DateTime<Utc>,
    ) -> Result<RankingReport> {
        let processed = self.process_field(roster, rounds, approach)?;

        let ids: Vec<&str> = processed.iter().map(|p| p.record.id.as_str()).collect();
        let key = field_fingerprint(
            self.config.past_performance.current_event_id.as_deref(),
            &ids,
            &self.groups,
        );
        let from_cache = cache.get(&key, now).is_some();
        let stats = cache.get_or_compute(&key, now, || self.group_stats(&processed));

        Ok(self.score_field(processed, &stats, from_cache))
    }

    /// Aggregation through trend adjustment for every roster player
    pub fn process_field(
        &self,
        roster: &[RosterEntry],
        rounds: &[RoundRow],
        approach: &[ApproachRow],
    ) -> Result<Vec<ProcessedPlayer>> {
        let players = PlayerAggregator::new(&self.context).aggregate(roster, rounds, approach)?;
        debug!("Aggregation used {} round rows and {} approach rows", rounds.len(), approach.len());

        let averager = HistoricalAverager::new(&self.config.averaging);
        let estimator = TrendEstimator::new(&self.config.trend);

        let processed: Vec<ProcessedPlayer> = players
            .into_values()
            .map(|record| {
                let averages = averager.average_player(&record);
                let (pre, coverage) = build_pre_bcc_vector(&record, &averages);
                let (mut vector, remap) = insert_bcc(&pre, &self.config.course_setup);
                let trends = estimator.estimate(&record.historical_rounds);
                apply_trends(&mut vector, &trends, &remap, self.config.trend.influence);

                debug!(
                    "Processed {}: coverage {}/{}, {} rounds",
                    record.id,
                    coverage.present,
                    coverage.total,
                    record.total_rounds()
                );
                ProcessedPlayer { coverage: coverage.fraction(), record, vector, trends }
            })
            .collect();

        info!("Built metric vectors for {} players", processed.len());
        Ok(processed)
    }

    /// Field statistics over every processed vector
    pub fn group_stats(&self, processed: &[ProcessedPlayer]) -> GroupStats {
        let vectors: Vec<&MetricVector> = processed.iter().map(|p| &p.vector).collect();
        let stats = GroupStatsCalculator::compute(&self.groups, &vectors);
        info!(
            "Computed group stats over {} players ({} metrics on fallbacks)",
            vectors.len(),
            stats.fallback_count()
        );
        stats
    }

    /// Score and rank a processed field against fixed statistics
    pub fn score_field(
        &self,
        processed: Vec<ProcessedPlayer>,
        stats: &GroupStats,
        stats_from_cache: bool,
    ) -> RankingReport {
        let profile = ScoringProfile::from_config(&self.config.scoring);
        let scorer = Scorer::new(profile, &self.groups, stats, &self.config.past_performance);

        let mut summary = RunSummary {
            field_size: processed.len(),
            stats_fallbacks: stats.fallback_count(),
            stats_from_cache,
            ..Default::default()
        };

        let scores: Vec<PlayerScore> = processed
            .iter()
            .map(|p| {
                if p.record.total_rounds() == 0 {
                    summary.players_without_rounds += 1;
                }
                let score = scorer.score(&p.record, &p.vector, p.coverage, &p.trends);
                match score.tier {
                    ScoreTier::BaselineReplaced => summary.baseline_replaced += 1,
                    ScoreTier::ModerateCapped | ScoreTier::ModerateClamped => {
                        summary.moderate_tier += 1
                    }
                    ScoreTier::Normal | ScoreTier::Undampened => {}
                }
                score
            })
            .collect();

        let players = rank_players(scores);
        info!(
            "Ranked {} players ({} baseline, {} moderate)",
            summary.field_size, summary.baseline_replaced, summary.moderate_tier
        );

        RankingReport { players, summary }
    }

    /// Metric catalog used for vector layout
    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }
}

fn validate(config: &RankingConfig) -> Result<()> {
    let averaging = &config.averaging;
    if !averaging.decay_lambda.is_finite() || averaging.decay_lambda < 0.0 {
        return Err(RankingError::InvalidConfig(format!(
            "averaging.decay_lambda must be non-negative, got {}",
            averaging.decay_lambda
        )));
    }
    if averaging.plenty_samples < averaging.min_samples {
        return Err(RankingError::InvalidConfig(format!(
            "averaging.plenty_samples ({}) is below min_samples ({})",
            averaging.plenty_samples, averaging.min_samples
        )));
    }
    for (name, weight) in [
        ("averaging.similar_weight", averaging.similar_weight),
        ("averaging.putting_specialized_weight", averaging.putting_specialized_weight),
        ("past_performance.weight", config.past_performance.weight),
    ] {
        if !(0.0..=1.0).contains(&weight) {
            return Err(RankingError::InvalidConfig(format!(
                "{name} must be within [0, 1], got {weight}"
            )));
        }
    }
    if config.trend.window == 0 || !config.trend.decay_lambda.is_finite() {
        return Err(RankingError::InvalidConfig("trend window and decay must be usable".into()));
    }
    Ok(())
}

/// Scores keyed by competitor id
pub fn scores_by_id(report: &RankingReport) -> BTreeMap<&str, &PlayerScore> {
    report.players.iter().map(|p| (p.id.as_str(), p)).collect()
}
