use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use shared::domain::{HistoryEntry, TrendPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    NeverLoaded,
    Fresh,
    /// The last refresh failed; the cache holds the last known list.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Client-held copy of the collaborator's audit history.
///
/// The sequence is always replaced as a whole and kept in collaborator order.
#[derive(Debug)]
pub struct HistoryAggregator {
    entries: Arc<[HistoryEntry]>,
    freshness: Freshness,
    last_refreshed_at: Option<DateTime<Utc>>,
    /// Sequence number handed to the most recently issued refresh.
    issued: u64,
    /// Sequence number of the refresh whose list the cache currently holds.
    applied: u64,
}

impl Default for HistoryAggregator {
    fn default() -> Self {
        Self {
            entries: Arc::from(Vec::new()),
            freshness: Freshness::NeverLoaded,
            last_refreshed_at: None,
            issued: 0,
            applied: 0,
        }
    }
}

impl HistoryAggregator {
    pub fn replace(&mut self, entries: Vec<HistoryEntry>) {
        self.entries = Arc::from(entries);
        self.freshness = Freshness::Fresh;
        self.last_refreshed_at = Some(Utc::now());
    }

    pub fn mark_stale(&mut self) {
        self.freshness = Freshness::Stale;
    }

    /// Stamps a refresh about to be issued. Taken before the call so that issue order,
    /// not arrival order, decides which list wins.
    pub fn begin_refresh(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Applies `entries` unless a refresh issued after `seq` has already been applied.
    pub fn replace_if_newer(&mut self, seq: u64, entries: Vec<HistoryEntry>) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        self.replace(entries);
        true
    }

    /// Marks the cache stale unless a later refresh has already brought it up to date.
    pub fn mark_stale_if_newer(&mut self, seq: u64) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.mark_stale();
        true
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// List-view projection: the raw cached sequence.
    pub fn entries(&self) -> Arc<[HistoryEntry]> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    pub fn is_stale(&self) -> bool {
        self.freshness == Freshness::Stale
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed_at
    }

    pub fn trend(&self) -> Vec<TrendPoint> {
        trend(&self.entries)
    }

    pub fn summary(&self) -> Option<TrendSummary> {
        summarize(&self.entries)
    }
}

/// Trend projection: one (date, score) pair per entry, in cache order.
pub fn trend(entries: &[HistoryEntry]) -> Vec<TrendPoint> {
    entries.iter().map(TrendPoint::from).collect()
}

pub fn summarize(entries: &[HistoryEntry]) -> Option<TrendSummary> {
    if entries.is_empty() {
        return None;
    }
    let (sum, min, max) = entries.iter().fold(
        (0.0, f64::INFINITY, f64::NEG_INFINITY),
        |(sum, min, max), entry| (sum + entry.score, min.min(entry.score), max.max(entry.score)),
    );
    Some(TrendSummary {
        count: entries.len(),
        mean: sum / entries.len() as f64,
        min,
        max,
    })
}

/// Mean score per date, dates in the order they first appear in the cache.
pub fn daily_means(entries: &[HistoryEntry]) -> Vec<TrendPoint> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<(&str, f64, usize)> = Vec::new();
    for entry in entries {
        match index.get(entry.date.as_str()) {
            Some(&slot) => {
                buckets[slot].1 += entry.score;
                buckets[slot].2 += 1;
            }
            None => {
                index.insert(entry.date.as_str(), buckets.len());
                buckets.push((entry.date.as_str(), entry.score, 1));
            }
        }
    }
    buckets
        .into_iter()
        .map(|(date, sum, count)| TrendPoint {
            date: date.to_string(),
            score: sum / count as f64,
        })
        .collect()
}
