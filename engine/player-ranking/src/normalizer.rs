//! Round normalization
//!
//! Turns raw table cells into floats. Nothing in here fails: a bad cell
//! becomes 0.0 and a warning.

use std::collections::BTreeMap;
use tracing::warn;

use crate::metrics::{ApproachMetric, ApproachStat, RoundMetric, AVG_SHOTS_PER_ROUND};
use crate::models::{RawValue, RoundRecord, RoundRow, MISSED_CUT_SENTINEL};

/// Coerce a raw cell to a float. Blank or non-numeric cells become 0.0.
pub fn normalize_value(field: &str, raw: &RawValue) -> f64 {
    match raw {
        RawValue::Number(n) if n.is_finite() => *n,
        RawValue::Number(n) => {
            warn!("Non-finite value {} for '{}', using 0", n, field);
            0.0
        }
        RawValue::Text(text) => {
            let cleaned = text.trim().trim_end_matches('%').replace(',', "");
            match cleaned.parse::<f64>() {
                Ok(n) if n.is_finite() => n,
                _ => {
                    warn!("Non-numeric value '{}' for '{}', using 0", text, field);
                    0.0
                }
            }
        }
        RawValue::Null => {
            warn!("Blank value for '{}', using 0", field);
            0.0
        }
    }
}

/// Percentages may arrive as 0-1 or 0-100; anything above 1 is scaled down
pub fn scale_percent(value: f64) -> f64 {
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}

/// Convert a per-shot strokes-gained value to per-round
pub fn per_shot_to_per_round(value: f64) -> f64 {
    value * AVG_SHOTS_PER_ROUND
}

/// Normalize one round-table cell for a metric
pub fn normalize_round_metric(metric: RoundMetric, raw: &RawValue) -> f64 {
    let value = normalize_value(metric.field(), raw);
    if metric.is_percent() {
        scale_percent(value)
    } else {
        value
    }
}

/// Normalize one approach-table cell for a metric
pub fn normalize_approach_metric(metric: ApproachMetric, raw: &RawValue) -> f64 {
    let value = normalize_value(&metric.field(), raw);
    match metric.stat {
        ApproachStat::Gir => scale_percent(value),
        ApproachStat::StrokesGained => per_shot_to_per_round(value),
        ApproachStat::Proximity => value,
    }
}

/// Build a normalized round from a table row.
///
/// Blank cells are left out so they count as "no data" downstream; unknown
/// columns are ignored.
pub fn normalize_round(row: &RoundRow) -> RoundRecord {
    let mut metrics = BTreeMap::new();
    for (field, raw) in &row.metrics {
        let Some(metric) = RoundMetric::from_field(field) else {
            continue;
        };
        if raw.is_blank() {
            continue;
        }
        metrics.insert(metric, normalize_round_metric(metric, raw));
    }

    RoundRecord {
        date: row.date,
        event_id: row.event_id.clone(),
        year: row.year,
        round_num: row.round_num,
        metrics,
    }
}

/// Parse a printed finishing position.
///
/// `T5` and `5` give `Some(5)`; CUT/MC/WD/DQ, blanks, and the missed-cut
/// sentinel give `None`.
pub fn parse_position(text: &str) -> Option<u32> {
    let trimmed = text.trim().trim_start_matches(['T', 't']);
    match trimmed.parse::<u32>() {
        Ok(0) => None,
        Ok(p) if p >= MISSED_CUT_SENTINEL => None,
        Ok(p) => Some(p),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_normalize_value_coerces() {
        assert_eq!(normalize_value("x", &RawValue::Number(1.5)), 1.5);
        assert_eq!(normalize_value("x", &RawValue::from(" 2.25 ")), 2.25);
        assert_eq!(normalize_value("x", &RawValue::from("64.5%")), 64.5);
        assert_eq!(normalize_value("x", &RawValue::from("n/a")), 0.0);
        assert_eq!(normalize_value("x", &RawValue::Null), 0.0);
        assert_eq!(normalize_value("x", &RawValue::Number(f64::NAN)), 0.0);
    }

    #[test]
    fn test_percent_accepts_both_conventions() {
        let raw_pct = RawValue::Number(64.0);
        let raw_frac = RawValue::Number(0.64);
        let a = normalize_round_metric(RoundMetric::GreensInRegulation, &raw_pct);
        let b = normalize_round_metric(RoundMetric::GreensInRegulation, &raw_frac);
        assert!((a - b).abs() < 1e-12);
        // Non-percent metrics are never rescaled
        assert_eq!(normalize_round_metric(RoundMetric::DrivingDistance, &raw_pct), 64.0);
    }

    #[test]
    fn test_approach_sg_is_converted_per_round() {
        let metric = ApproachMetric::from_field("fairway_100_150_sg").unwrap();
        let value = normalize_approach_metric(metric, &RawValue::Number(0.05));
        assert!((value - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_round_skips_blank_and_unknown() {
        let mut metrics = BTreeMap::new();
        metrics.insert("sg_total".to_string(), RawValue::Number(1.1));
        metrics.insert("sg_putting".to_string(), RawValue::from(""));
        metrics.insert("scrambling".to_string(), RawValue::from("oops"));
        metrics.insert("unknown_col".to_string(), RawValue::Number(3.0));
        let row = RoundRow {
            competitor_id: "p1".into(),
            event_id: "e1".into(),
            year: 2024,
            round_num: 2,
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            position_text: "T5".into(),
            metrics,
        };

        let round = normalize_round(&row);
        assert_eq!(round.value(RoundMetric::SgTotal), Some(1.1));
        assert_eq!(round.value(RoundMetric::SgPutting), None);
        assert_eq!(round.value(RoundMetric::Scrambling), Some(0.0));
        assert_eq!(round.metrics.len(), 2);
    }

    #[test]
    fn test_parse_position() {
        assert_eq!(parse_position("1"), Some(1));
        assert_eq!(parse_position("T12"), Some(12));
        assert_eq!(parse_position("CUT"), None);
        assert_eq!(parse_position("WD"), None);
        assert_eq!(parse_position(""), None);
        assert_eq!(parse_position("100"), None);
    }
}
