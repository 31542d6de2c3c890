//! Past-performance multiplier and recent-finish baselines

use tracing::{debug, warn};

use crate::config::PastPerformanceConfig;
use crate::models::{EventRecord, PlayerRecord};

/// Number of recent non-current events considered
pub const RECENT_EVENT_LIMIT: usize = 10;

const MULTIPLIER_MIN: f64 = 0.3;
const MULTIPLIER_MAX: f64 = 3.0;
const BOOST_EXPONENT: f64 = 1.2;

/// Recent-finish baselines for sparse-data players
pub const BASELINE_TOP_10: f64 = 1.20;
pub const BASELINE_TOP_20: f64 = 0.75;
pub const BASELINE_NO_TOP_20: f64 = 0.30;
pub const BASELINE_NO_EVENTS: f64 = 0.20;

/// Score for a finishing position; `None` is a missed cut or withdrawal
pub fn position_score(position: Option<u32>) -> f64 {
    match position {
        None => -0.2,
        Some(1) => 1.5,
        Some(2..=5) => 1.0,
        Some(6..=10) => 0.7,
        Some(11..=20) => 0.4,
        Some(21..=40) => 0.15,
        Some(_) => 0.0,
    }
}

pub fn has_recent_top10(events: &[&EventRecord]) -> bool {
    events.iter().any(|e| e.finished_within(10))
}

/// Baseline score derived from the best recent finish
pub fn recent_finish_baseline(events: &[&EventRecord]) -> f64 {
    if events.is_empty() {
        BASELINE_NO_EVENTS
    } else if has_recent_top10(events) {
        BASELINE_TOP_10
    } else if events.iter().any(|e| e.finished_within(20)) {
        BASELINE_TOP_20
    } else {
        BASELINE_NO_TOP_20
    }
}

/// Convert an averaged position score into a raw multiplier
pub fn convert_score(score: f64) -> f64 {
    let raw = if score < 0.0 { 1.0 + score } else { 1.0 + score.powf(BOOST_EXPONENT) };
    raw.clamp(MULTIPLIER_MIN, MULTIPLIER_MAX)
}

/// Past-performance calculator
pub struct PastPerformance<'a> {
    config: &'a PastPerformanceConfig,
}

impl<'a> PastPerformance<'a> {
    pub fn new(config: &'a PastPerformanceConfig) -> Self {
        Self { config }
    }

    pub fn current_event_id(&self) -> Option<&str> {
        self.config.current_event_id.as_deref()
    }

    /// The player's most recent events, excluding the current one
    pub fn recent_events<'p>(&self, player: &'p PlayerRecord) -> Vec<&'p EventRecord> {
        player.recent_events(self.current_event_id(), RECENT_EVENT_LIMIT)
    }

    /// Recency-weighted position score; most recent event weighs 1, then halves
    pub fn weighted_position_score(events: &[&EventRecord]) -> Option<f64> {
        if events.is_empty() {
            return None;
        }
        let mut weight = 1.0;
        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for event in events {
            total += weight * position_score(event.position);
            weight_sum += weight;
            weight *= 0.5;
        }
        Some(total / weight_sum)
    }

    /// Multiplier applied to the tier score
    pub fn multiplier(&self, player: &PlayerRecord) -> f64 {
        if !self.config.enabled {
            return 1.0;
        }
        let events = self.recent_events(player);
        let Some(score) = Self::weighted_position_score(&events) else {
            return 1.0;
        };

        let raw = convert_score(score);
        let multiplier = 1.0 + (raw - 1.0) * self.config.weight;
        if !multiplier.is_finite() {
            warn!("Non-finite past-performance multiplier for {}, using 0", player.id);
            return 0.0;
        }

        debug!(
            "Past performance for {}: {} events, score {:.3}, multiplier {:.3}",
            player.id,
            events.len(),
            score,
            multiplier
        );
        multiplier
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn player_with_finishes(finishes: &[(&str, i32, Option<u32>)]) -> PlayerRecord {
        let mut player = PlayerRecord::new("p1", "Player One");
        for (i, (event_id, year, position)) in finishes.iter().enumerate() {
            let date =
                NaiveDate::from_ymd_opt(*year, 1, 1).unwrap() + chrono::Duration::days(i as i64);
            player.events.insert(
                PlayerRecord::event_key("p1", event_id, *year),
                EventRecord {
                    event_id: event_id.to_string(),
                    year: *year,
                    position: *position,
                    is_similar_context: false,
                    is_specialized_context: false,
                    last_played: date,
                    rounds: Vec::new(),
                },
            );
        }
        player
    }

    #[test]
    fn test_position_mapping() {
        assert_eq!(position_score(Some(1)), 1.5);
        assert_eq!(position_score(Some(5)), 1.0);
        assert_eq!(position_score(Some(8)), 0.7);
        assert_eq!(position_score(Some(20)), 0.4);
        assert_eq!(position_score(Some(40)), 0.15);
        assert_eq!(position_score(Some(41)), 0.0);
        assert_eq!(position_score(None), -0.2);
    }

    #[test]
    fn test_conversion_is_clamped() {
        assert!((convert_score(-0.2) - 0.8).abs() < 1e-12);
        assert!((convert_score(1.0) - 2.0).abs() < 1e-12);
        assert_eq!(convert_score(-0.9), MULTIPLIER_MIN);
        assert_eq!(convert_score(5.0), MULTIPLIER_MAX);
    }

    #[test]
    fn test_recent_event_weights_halve() {
        // Newest is the win, then a missed cut
        let player = player_with_finishes(&[("E1", 2024, None), ("E2", 2024, Some(1))]);
        let config = PastPerformanceConfig { enabled: true, weight: 1.0, current_event_id: None };
        let calc = PastPerformance::new(&config);
        let events = calc.recent_events(&player);
        assert_eq!(events[0].event_id, "E2");

        let score = PastPerformance::weighted_position_score(&events).unwrap();
        assert!((score - (1.5 - 0.1) / 1.5).abs() < 1e-12);
        let expected = 1.0 + score.powf(1.2);
        assert!((calc.multiplier(&player) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_weight_interpolates_toward_one() {
        let player = player_with_finishes(&[("E1", 2024, Some(1))]);
        let config = PastPerformanceConfig { enabled: true, weight: 0.3, current_event_id: None };
        let raw = convert_score(1.5);
        let multiplier = PastPerformance::new(&config).multiplier(&player);
        assert!((multiplier - (1.0 + (raw - 1.0) * 0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_current_event_is_excluded() {
        let player = player_with_finishes(&[("E1", 2024, Some(30)), ("CUR", 2024, Some(1))]);
        let config = PastPerformanceConfig {
            enabled: true,
            weight: 1.0,
            current_event_id: Some("CUR".into()),
        };
        let calc = PastPerformance::new(&config);
        let events = calc.recent_events(&player);
        assert_eq!(events.len(), 1);
        assert!(!has_recent_top10(&events));
        assert_eq!(recent_finish_baseline(&events), BASELINE_NO_TOP_20);
    }

    #[test]
    fn test_disabled_or_no_history_is_neutral() {
        let player = player_with_finishes(&[("E1", 2024, Some(1))]);
        let disabled =
            PastPerformanceConfig { enabled: false, weight: 1.0, current_event_id: None };
        assert_eq!(PastPerformance::new(&disabled).multiplier(&player), 1.0);

        let enabled = PastPerformanceConfig::default();
        assert_eq!(PastPerformance::new(&enabled).multiplier(&PlayerRecord::new("x", "X")), 1.0);
    }

    #[test]
    fn test_baselines() {
        let top8 = player_with_finishes(&[("E1", 2024, Some(8)), ("E2", 2024, None)]);
        let top15 = player_with_finishes(&[("E1", 2024, Some(15))]);
        let config = PastPerformanceConfig::default();
        let calc = PastPerformance::new(&config);
        assert_eq!(recent_finish_baseline(&calc.recent_events(&top8)), BASELINE_TOP_10);
        assert_eq!(recent_finish_baseline(&calc.recent_events(&top15)), BASELINE_TOP_20);
        assert_eq!(recent_finish_baseline(&[]), BASELINE_NO_EVENTS);
    }
}
