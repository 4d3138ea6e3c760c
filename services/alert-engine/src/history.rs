//! Alert history - per-symbol record of alerts that actually fired
//!
//! Append-only except for explicit prune and clear. Owned by the engine;
//! a host may seed it from a [`HistorySnapshot`] and persist the snapshot
//! it gets back.

use crate::decision::Decision;
use crate::types::AlertType;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

/// Stored alerts keyed by stock symbol
#[derive(Debug, Clone, Default)]
pub struct AlertHistory {
    alerts: HashMap<String, VecDeque<Decision>>,
}

/// Serializable form of [`AlertHistory`]: a flat, time-ordered list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub saved_at: DateTime<Utc>,
    pub alerts: Vec<Decision>,
}

impl AlertHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a snapshot. Entries that never alerted are dropped.
    pub fn from_snapshot(snapshot: HistorySnapshot) -> Self {
        let mut alerts = snapshot.alerts;
        alerts.sort_by_key(|d| d.timestamp);

        let mut history = Self::new();
        for decision in alerts {
            if !decision.should_alert {
                warn!(
                    symbol = %decision.stock_symbol,
                    id = %decision.id,
                    "Skipping non-alert entry in history snapshot"
                );
                continue;
            }
            history.push(decision);
        }
        history
    }

    /// Snapshot every stored alert, oldest first
    pub fn snapshot(&self, saved_at: DateTime<Utc>) -> HistorySnapshot {
        let mut alerts: Vec<Decision> = self.alerts.values().flatten().cloned().collect();
        alerts.sort_by_key(|d| d.timestamp);
        HistorySnapshot { saved_at, alerts }
    }

    /// Record an alerted decision, keeping each queue in timestamp order
    pub(crate) fn push(&mut self, decision: Decision) {
        debug_assert!(decision.should_alert);
        let queue = self
            .alerts
            .entry(decision.stock_symbol.clone())
            .or_default();
        let at = queue
            .iter()
            .rposition(|d| d.timestamp <= decision.timestamp)
            .map_or(0, |i| i + 1);
        queue.insert(at, decision);
    }

    /// Alerts for one symbol, oldest first
    pub fn for_symbol(&self, symbol: &str) -> impl Iterator<Item = &Decision> {
        self.alerts.get(symbol).into_iter().flatten()
    }

    /// Most recent stored alert for a symbol
    pub fn last_for(&self, symbol: &str) -> Option<&Decision> {
        self.alerts.get(symbol).and_then(|q| q.back())
    }

    /// Whether `alert_type` fired for `symbol` less than `window` before `now`
    pub fn has_recent(
        &self,
        symbol: &str,
        alert_type: AlertType,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        self.for_symbol(symbol)
            .any(|d| d.alert_type == alert_type && within(d.timestamp, now, window))
    }

    /// Alerts for `symbol` less than `window` before `now`
    pub fn count_recent(&self, symbol: &str, now: DateTime<Utc>, window: Duration) -> usize {
        self.for_symbol(symbol)
            .filter(|d| within(d.timestamp, now, window))
            .count()
    }

    /// Drop entries older than `retention`. Returns how many were removed.
    /// A cutoff before the representable range keeps everything.
    pub fn prune(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let Some(cutoff) = now.checked_sub_signed(retention) else {
            return 0;
        };
        let mut removed = 0;
        for queue in self.alerts.values_mut() {
            let before = queue.len();
            queue.retain(|d| d.timestamp >= cutoff);
            removed += before - queue.len();
        }
        self.alerts.retain(|_, q| !q.is_empty());
        if removed > 0 {
            debug!(removed, %cutoff, "Pruned alert history");
        }
        removed
    }

    /// Remove every alert for one symbol. Returns how many were removed.
    pub fn clear_symbol(&mut self, symbol: &str) -> usize {
        self.alerts.remove(symbol).map(|q| q.len()).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.alerts.clear();
    }

    pub fn len(&self) -> usize {
        self.alerts.values().map(|q| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.values().all(|q| q.is_empty())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.alerts.keys().map(|s| s.as_str())
    }

    /// Latest alert across all symbols
    pub fn latest(&self) -> Option<&Decision> {
        self.alerts
            .values()
            .filter_map(|q| q.back())
            .max_by_key(|d| d.timestamp)
    }
}

/// `ts` is inside `[now - window, now]`, exclusive of the far edge.
/// Entries stamped after `now` (clock skew, backfill) count as recent.
fn within(ts: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - ts < window
}
