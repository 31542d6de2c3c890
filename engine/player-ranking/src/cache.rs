//! Group statistics cache

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, info};

use crate::config::MetricGroup;
use crate::group_stats::GroupStats;

/// Caller-owned cache of group statistics with age-based expiry
pub struct GroupStatsCache {
    max_age: Duration,
    entries: HashMap<String, CachedGroupStats>,
}

#[derive(Debug, Clone)]
struct CachedGroupStats {
    stats: GroupStats,
    computed_at: DateTime<Utc>,
}

impl GroupStatsCache {
    pub fn new(max_age: Duration) -> Self {
        Self { max_age, entries: HashMap::new() }
    }

    /// Fresh statistics for `key` as of `now`
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&GroupStats> {
        let cached = self.entries.get(key)?;
        let age = now - cached.computed_at;
        if age > self.max_age {
            debug!("Group stats for {} expired (age: {:?})", key, age);
            return None;
        }
        Some(&cached.stats)
    }

    pub fn store(&mut self, key: impl Into<String>, stats: GroupStats, now: DateTime<Utc>) {
        self.entries.insert(key.into(), CachedGroupStats { stats, computed_at: now });
    }

    /// Cached statistics when fresh, otherwise compute and store
    pub fn get_or_compute<F>(&mut self, key: &str, now: DateTime<Utc>, compute: F) -> GroupStats
    where
        F: FnOnce() -> GroupStats,
    {
        if let Some(stats) = self.get(key, now) {
            debug!("Reusing cached group stats for {}", key);
            return stats.clone();
        }
        let stats = compute();
        self.store(key, stats.clone(), now);
        stats
    }

    /// Drop expired entries
    pub fn clear_expired(&mut self, now: DateTime<Utc>) {
        let max_age = self.max_age;
        let initial = self.entries.len();
        self.entries.retain(|_, cached| now - cached.computed_at <= max_age);
        let removed = initial - self.entries.len();
        if removed > 0 {
            info!("Cleared {} expired group stats entries", removed);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache key for a field: current event, roster, and group configuration.
///
/// Any change to the field or the weights produces a different key, so
/// statistics are never reused across different fields.
pub fn field_fingerprint(
    current_event: Option<&str>,
    player_ids: &[&str],
    groups: &[MetricGroup],
) -> String {
    let mut ids: Vec<&str> = player_ids.to_vec();
    ids.sort_unstable();

    let mut hasher = DefaultHasher::new();
    current_event.unwrap_or("").hash(&mut hasher);
    ids.hash(&mut hasher);
    for group in groups {
        group.name.hash(&mut hasher);
        group.weight.to_bits().hash(&mut hasher);
        for metric in &group.metrics {
            metric.index.hash(&mut hasher);
            metric.weight.to_bits().hash(&mut hasher);
        }
    }
    format!("{}:{:016x}", current_event.unwrap_or("field"), hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RankingConfig;
    use crate::metrics::MetricCatalog;

    fn stats_marker(n: usize) -> GroupStats {
        let mut stats = GroupStats::default();
        for i in 0..n {
            stats.groups.insert(format!("g{i}"), Default::default());
        }
        stats
    }

    #[test]
    fn test_fresh_entries_are_reused() {
        let now = Utc::now();
        let mut cache = GroupStatsCache::new(Duration::days(7));
        let first = cache.get_or_compute("k", now, || stats_marker(1));
        let second = cache.get_or_compute("k", now + Duration::days(6), || stats_marker(2));
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stale_entries_are_recomputed() {
        let now = Utc::now();
        let mut cache = GroupStatsCache::new(Duration::days(7));
        cache.store("k", stats_marker(1), now);
        assert!(cache.get("k", now + Duration::days(8)).is_none());
        let recomputed = cache.get_or_compute("k", now + Duration::days(8), || stats_marker(2));
        assert_eq!(recomputed.groups.len(), 2);

        cache.store("old", stats_marker(1), now - Duration::days(30));
        cache.clear_expired(now + Duration::days(8));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_fingerprint_ignores_roster_order_but_not_membership() {
        let groups = RankingConfig::default().metric_groups(&MetricCatalog::standard()).unwrap();
        let a = field_fingerprint(Some("E1"), &["p1", "p2"], &groups);
        let b = field_fingerprint(Some("E1"), &["p2", "p1"], &groups);
        let c = field_fingerprint(Some("E1"), &["p1", "p3"], &groups);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("E1:"));
    }
}
