//! Input rows, per-player records and scored output

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::metrics::{ApproachMetric, RoundMetric};

/// Position value the round table uses for withdrawals and missed cuts
pub const MISSED_CUT_SENTINEL: u32 = 100;

/// Unparsed cell as it arrives from the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Null,
}

impl RawValue {
    /// Blank text and nulls count as an empty cell
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Number(_) => false,
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Field entry for the event being ranked
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub competitor_id: String,
    pub name: String,
}

/// One row of the historical round table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundRow {
    pub competitor_id: String,
    pub event_id: String,
    pub year: i32,
    pub round_num: u32,
    pub date: NaiveDate,
    /// Finishing position as printed, e.g. "T5", "CUT", "WD"
    #[serde(default)]
    pub position_text: String,
    /// Raw metric cells keyed by round-table column name
    #[serde(default)]
    pub metrics: BTreeMap<String, RawValue>,
}

/// One row of the approach-skill table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachRow {
    pub competitor_id: String,
    /// Raw cells keyed by `{lie}_{bucket}_{stat}`
    #[serde(default)]
    pub values: BTreeMap<String, RawValue>,
}

/// A normalized round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub date: NaiveDate,
    pub event_id: String,
    pub year: i32,
    pub round_num: u32,
    pub metrics: BTreeMap<RoundMetric, f64>,
}

impl RoundRecord {
    /// Present, finite value for a metric
    pub fn value(&self, metric: RoundMetric) -> Option<f64> {
        self.metrics.get(&metric).copied().filter(|v| v.is_finite())
    }
}

/// One visit of a player to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub year: i32,
    /// `None` for missed cuts and withdrawals
    pub position: Option<u32>,
    pub is_similar_context: bool,
    pub is_specialized_context: bool,
    /// Latest round date seen for this visit
    pub last_played: NaiveDate,
    pub rounds: Vec<RoundRecord>,
}

impl EventRecord {
    pub fn finished_within(&self, places: u32) -> bool {
        matches!(self.position, Some(p) if p <= places)
    }
}

/// Everything known about one competitor for a single ranking run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: String,
    pub name: String,
    /// Keyed by `id-eventId-year`
    pub events: BTreeMap<String, EventRecord>,
    pub historical_rounds: Vec<RoundRecord>,
    pub similar_rounds: Vec<RoundRecord>,
    pub specialized_rounds: Vec<RoundRecord>,
    /// category (e.g. `fairway_100_150`) -> stat (e.g. `gir`) -> value
    pub approach_metrics: BTreeMap<String, BTreeMap<String, f64>>,
}

impl PlayerRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), ..Default::default() }
    }

    pub fn event_key(id: &str, event_id: &str, year: i32) -> String {
        format!("{id}-{event_id}-{year}")
    }

    pub fn approach_value(&self, metric: ApproachMetric) -> Option<f64> {
        self.approach_metrics
            .get(&metric.category())
            .and_then(|stats| stats.get(metric.stat.field()))
            .copied()
            .filter(|v| v.is_finite())
    }

    /// Most recent events first, excluding the event being ranked
    pub fn recent_events(&self, current_event_id: Option<&str>, limit: usize) -> Vec<&EventRecord> {
        let mut events: Vec<&EventRecord> = self
            .events
            .values()
            .filter(|e| current_event_id.map_or(true, |current| e.event_id != current))
            .collect();
        events.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| b.last_played.cmp(&a.last_played))
                .then_with(|| a.event_id.cmp(&b.event_id))
        });
        events.truncate(limit);
        events
    }

    pub fn total_rounds(&self) -> usize {
        self.historical_rounds.len() + self.similar_rounds.len() + self.specialized_rounds.len()
    }
}

/// Which branch of the sparse-data policy produced a player's score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreTier {
    /// Coverage >= 0.70, scaled normally
    Normal,
    /// 0.50 <= coverage < 0.70 with a recent top-10, capped only
    ModerateCapped,
    /// 0.50 <= coverage < 0.70 without a recent top-10, floored and capped
    ModerateClamped,
    /// Coverage < 0.50, replaced by the recent-finish baseline
    BaselineReplaced,
    /// Coverage dampening disabled
    Undampened,
}

impl ScoreTier {
    pub fn is_baseline_replacement(&self) -> bool {
        matches!(self, ScoreTier::BaselineReplaced)
    }
}

/// Scored output for one competitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub id: String,
    pub name: String,
    pub group_scores: BTreeMap<String, f64>,
    /// Group-weighted z-score before any confidence handling
    pub weighted_score: f64,
    /// Score after the sparse-data policy; the primary ranking key
    pub refined_weighted_score: f64,
    pub past_performance_multiplier: f64,
    /// Refined score times the past-performance multiplier
    pub final_score: f64,
    pub war: f64,
    pub data_coverage: f64,
    pub confidence_factor: f64,
    pub tier: ScoreTier,
    /// Improvement-oriented slope per round metric
    pub trends: BTreeMap<String, f64>,
    /// Final metric vector (post-BCC layout, raw units)
    pub metrics: Vec<f64>,
    pub rank: u32,
}
