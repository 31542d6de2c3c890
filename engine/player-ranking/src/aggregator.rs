//! Player aggregation
//!
//! Groups normalized rounds per competitor into the three mutually exclusive
//! buckets (general historical, similar-context, specialized-context) and
//! builds the per-event finish ledger.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, info, warn};

use crate::error::{RankingError, Result};
use crate::metrics::ApproachMetric;
use crate::models::{ApproachRow, EventRecord, PlayerRecord, RosterEntry, RoundRecord, RoundRow};
use crate::normalizer::{normalize_approach_metric, normalize_round, parse_position};

/// Which bucket a round is stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Historical,
    Similar,
    Specialized,
}

/// Event-id sets used to classify rounds
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub similar: BTreeSet<String>,
    pub specialized: BTreeSet<String>,
}

impl EventContext {
    pub fn new<I, J, S, T>(similar: I, specialized: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            similar: similar.into_iter().map(Into::into).collect(),
            specialized: specialized.into_iter().map(Into::into).collect(),
        }
    }

    /// Specialized takes precedence when an event is in both sets
    pub fn bucket_for(&self, event_id: &str) -> Bucket {
        if self.specialized.contains(event_id) {
            Bucket::Specialized
        } else if self.similar.contains(event_id) {
            Bucket::Similar
        } else {
            Bucket::Historical
        }
    }
}

/// Builds one [`PlayerRecord`] per roster entry
pub struct PlayerAggregator<'a> {
    context: &'a EventContext,
}

impl<'a> PlayerAggregator<'a> {
    pub fn new(context: &'a EventContext) -> Self {
        Self { context }
    }

    /// Aggregate the round and approach tables for the roster.
    ///
    /// Roster players without history still get an (empty) entry; rows for
    /// competitors outside the roster are ignored.
    pub fn aggregate(
        &self,
        roster: &[RosterEntry],
        rounds: &[RoundRow],
        approach: &[ApproachRow],
    ) -> Result<BTreeMap<String, PlayerRecord>> {
        if roster.is_empty() {
            return Err(RankingError::EmptyRoster);
        }

        let mut players: BTreeMap<String, PlayerRecord> = roster
            .iter()
            .map(|entry| {
                (entry.competitor_id.clone(), PlayerRecord::new(&entry.competitor_id, &entry.name))
            })
            .collect();

        let mut positioned: HashSet<String> = HashSet::new();
        let mut ignored = 0usize;

        for row in rounds {
            let Some(player) = players.get_mut(&row.competitor_id) else {
                ignored += 1;
                continue;
            };

            let round = normalize_round(row);
            let key = PlayerRecord::event_key(&player.id, &row.event_id, row.year);

            let event = player.events.entry(key.clone()).or_insert_with(|| EventRecord {
                event_id: row.event_id.clone(),
                year: row.year,
                position: None,
                is_similar_context: self.context.similar.contains(&row.event_id),
                is_specialized_context: self.context.specialized.contains(&row.event_id),
                last_played: row.date,
                rounds: Vec::new(),
            });

            // First printed position for the visit wins
            if !row.position_text.trim().is_empty() && positioned.insert(key) {
                event.position = parse_position(&row.position_text);
            }
            if row.date > event.last_played {
                event.last_played = row.date;
            }
            event.rounds.push(round.clone());

            match self.context.bucket_for(&row.event_id) {
                Bucket::Specialized => player.specialized_rounds.push(round),
                Bucket::Similar => player.similar_rounds.push(round),
                Bucket::Historical => player.historical_rounds.push(round),
            }
        }

        if ignored > 0 {
            warn!("Ignored {} round rows for competitors outside the roster", ignored);
        }

        for row in approach {
            let Some(player) = players.get_mut(&row.competitor_id) else {
                continue;
            };
            for (field, raw) in &row.values {
                let Some(metric) = ApproachMetric::from_field(field) else {
                    debug!("Unknown approach column '{}'", field);
                    continue;
                };
                if raw.is_blank() {
                    continue;
                }
                let value = normalize_approach_metric(metric, raw);
                player
                    .approach_metrics
                    .entry(metric.category())
                    .or_default()
                    .insert(metric.stat.field().to_string(), value);
            }
        }

        // Sort once after ingestion
        for player in players.values_mut() {
            sort_rounds(&mut player.historical_rounds);
            sort_rounds(&mut player.similar_rounds);
            sort_rounds(&mut player.specialized_rounds);
            for event in player.events.values_mut() {
                sort_rounds(&mut event.rounds);
            }
        }

        info!(
            "Aggregated {} players ({} with history)",
            players.len(),
            players.values().filter(|p| p.total_rounds() > 0).count()
        );

        Ok(players)
    }
}

/// Date descending, then round number descending
pub fn sort_rounds(rounds: &mut [RoundRecord]) {
    rounds.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.round_num.cmp(&a.round_num)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawValue;
    use chrono::NaiveDate;

    fn row(player: &str, event: &str, day: u32, round_num: u32, pos: &str) -> RoundRow {
        let mut metrics = BTreeMap::new();
        metrics.insert("sg_total".to_string(), RawValue::Number(day as f64 / 10.0));
        RoundRow {
            competitor_id: player.into(),
            event_id: event.into(),
            year: 2024,
            round_num,
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            position_text: pos.into(),
            metrics,
        }
    }

    fn roster() -> Vec<RosterEntry> {
        vec![
            RosterEntry { competitor_id: "a".into(), name: "Player A".into() },
            RosterEntry { competitor_id: "b".into(), name: "Player B".into() },
        ]
    }

    #[test]
    fn test_empty_roster_is_an_error() {
        let context = EventContext::default();
        let result = PlayerAggregator::new(&context).aggregate(&[], &[], &[]);
        assert!(matches!(result, Err(RankingError::EmptyRoster)));
    }

    #[test]
    fn test_buckets_are_exclusive_and_specialized_wins() {
        let context = EventContext::new(["sim", "both"], ["putt", "both"]);
        let rows = vec![
            row("a", "gen", 1, 1, "T10"),
            row("a", "sim", 2, 1, "5"),
            row("a", "putt", 3, 1, "CUT"),
            row("a", "both", 4, 1, "1"),
        ];
        let players = PlayerAggregator::new(&context).aggregate(&roster(), &rows, &[]).unwrap();
        let a = &players["a"];
        assert_eq!(a.historical_rounds.len(), 1);
        assert_eq!(a.similar_rounds.len(), 1);
        assert_eq!(a.specialized_rounds.len(), 2);
        assert_eq!(a.total_rounds(), 4);

        let both = &a.events["a-both-2024"];
        assert!(both.is_similar_context && both.is_specialized_context);
        assert_eq!(both.position, Some(1));
        assert_eq!(a.events["a-putt-2024"].position, None);
    }

    #[test]
    fn test_rounds_sorted_date_then_round_descending() {
        let context = EventContext::default();
        let rows = vec![
            row("a", "gen", 1, 1, ""),
            row("a", "gen", 5, 3, ""),
            row("a", "gen", 5, 4, ""),
            row("a", "gen", 3, 2, ""),
        ];
        let players = PlayerAggregator::new(&context).aggregate(&roster(), &rows, &[]).unwrap();
        let order: Vec<(u32, u32)> = players["a"]
            .historical_rounds
            .iter()
            .map(|r| (chrono::Datelike::day(&r.date), r.round_num))
            .collect();
        assert_eq!(order, vec![(5, 4), (5, 3), (3, 2), (1, 1)]);
        assert_eq!(players["a"].events["a-gen-2024"].last_played.to_string(), "2024-03-05");
    }

    #[test]
    fn test_roster_controls_membership() {
        let context = EventContext::default();
        let rows = vec![row("zzz", "gen", 1, 1, "1")];
        let players = PlayerAggregator::new(&context).aggregate(&roster(), &rows, &[]).unwrap();
        assert_eq!(players.len(), 2);
        assert!(players["b"].events.is_empty());
        assert!(!players.contains_key("zzz"));
    }

    #[test]
    fn test_approach_table_is_normalized() {
        let context = EventContext::default();
        let mut values = BTreeMap::new();
        values.insert("fairway_150_200_gir".to_string(), RawValue::Number(66.0));
        values.insert("fairway_150_200_sg".to_string(), RawValue::Number(0.02));
        values.insert("rough_over_200_proximity".to_string(), RawValue::from(""));
        let approach = vec![ApproachRow { competitor_id: "a".into(), values }];
        let players =
            PlayerAggregator::new(&context).aggregate(&roster(), &[], &approach).unwrap();
        let stats = &players["a"].approach_metrics["fairway_150_200"];
        assert!((stats["gir"] - 0.66).abs() < 1e-12);
        assert!((stats["sg"] - 0.36).abs() < 1e-12);
        assert!(!players["a"].approach_metrics.contains_key("rough_over_200"));
    }
}
