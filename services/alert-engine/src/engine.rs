//! Alert engine - rule evaluation, guardrails, and history in one handle
//!
//! One engine owns one [`AlertHistory`]. Evaluation is synchronous and takes
//! `&mut self`; hosts that fan out across threads should partition symbols
//! across engines or serialize calls per symbol.

use crate::config::{RulesConfig, RATE_LIMIT_WINDOW_HOURS};
use crate::decision::Decision;
use crate::guardrail::Guardrail;
use crate::history::{AlertHistory, HistorySnapshot};
use crate::metrics::Metrics;
use crate::observability::EngineStats;
use crate::presets::{get_preset, Preset};
use crate::rules::RuleEvaluator;
use crate::types::{EngineError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info};

/// Alert history summary
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub total_alerts: usize,
    pub alerts_last_24h: usize,
    pub last_alert: Option<Decision>,
}

pub struct AlertEngine {
    config: RulesConfig,
    history: AlertHistory,
    stats: EngineStats,
}

impl AlertEngine {
    /// Create an engine with empty history
    pub fn new(config: RulesConfig) -> Result<Self> {
        Self::with_history(config, AlertHistory::new())
    }

    /// Create an engine seeded with previously persisted history
    pub fn with_history(config: RulesConfig, history: AlertHistory) -> Result<Self> {
        config.validate()?;
        debug!(stored_alerts = history.len(), "Alert engine initialized");
        Ok(Self {
            config,
            history,
            stats: EngineStats::default(),
        })
    }

    pub fn from_preset(preset: Preset) -> Result<Self> {
        Self::new(get_preset(preset))
    }

    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Evaluate against the wall clock
    pub fn evaluate(&mut self, symbol: &str, metrics: &Metrics) -> Result<Decision> {
        self.evaluate_at(symbol, metrics, Utc::now())
    }

    /// Evaluate one metrics record for `symbol` as of `now`.
    ///
    /// History is appended at most once, after the decision is final, and
    /// only when the alert fires. Invalid input leaves history untouched.
    pub fn evaluate_at(
        &mut self,
        symbol: &str,
        metrics: &Metrics,
        now: DateTime<Utc>,
    ) -> Result<Decision> {
        if let Err(e) = validate_input(symbol, metrics) {
            self.stats.record_invalid();
            return Err(e);
        }

        let previous_trend = self.history.last_for(symbol).map(|d| d.metrics.trend);
        let outcome = RuleEvaluator::new(&self.config).evaluate(metrics, previous_trend);

        let decision = if outcome.alert_type.is_none() {
            Decision::no_alert(symbol, *metrics, outcome, now)
        } else {
            match Guardrail::new(&self.config).check(&self.history, symbol, &outcome, now) {
                Some(reason) => {
                    debug!(
                        symbol,
                        alert_type = %outcome.alert_type,
                        confidence = %outcome.confidence,
                        reason = reason.code(),
                        "Alert suppressed"
                    );
                    Decision::suppressed(symbol, *metrics, outcome, reason, now)
                }
                None => Decision::alert(symbol, *metrics, outcome, now),
            }
        };

        if decision.should_alert {
            info!(
                symbol,
                alert_type = %decision.alert_type,
                confidence = %decision.confidence,
                score = decision.score,
                reason = %decision.reason,
                "ALERT"
            );
            self.history.push(decision.clone());
        }
        self.stats.record(&decision);

        Ok(decision)
    }

    /// Evaluate records in order. Each record succeeds or fails on its own.
    pub fn evaluate_batch<'r, I>(&mut self, records: I, now: DateTime<Utc>) -> Vec<Result<Decision>>
    where
        I: IntoIterator<Item = (&'r str, &'r Metrics)>,
    {
        records
            .into_iter()
            .map(|(symbol, metrics)| self.evaluate_at(symbol, metrics, now))
            .collect()
    }

    /// Serializable copy of the current history
    pub fn snapshot(&self, now: DateTime<Utc>) -> HistorySnapshot {
        self.history.snapshot(now)
    }

    /// Drop stored alerts older than the retention window
    pub fn prune_history(&mut self, now: DateTime<Utc>) -> usize {
        self.history.prune(now, self.config.retention())
    }

    pub fn clear_symbol(&mut self, symbol: &str) -> usize {
        self.history.clear_symbol(symbol)
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    pub fn summary(&self, now: DateTime<Utc>) -> AlertSummary {
        let window = Duration::hours(RATE_LIMIT_WINDOW_HOURS as i64);
        let alerts_last_24h = self
            .history
            .symbols()
            .map(|s| self.history.count_recent(s, now, window))
            .sum();

        AlertSummary {
            total_alerts: self.history.len(),
            alerts_last_24h,
            last_alert: self.history.latest().cloned(),
        }
    }
}

fn validate_input(symbol: &str, metrics: &Metrics) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(EngineError::invalid("stock_symbol", "must not be empty"));
    }
    metrics.validate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Trend;
    use crate::types::{AlertType, SuppressionReason};
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap()
    }

    fn drop_metrics() -> Metrics {
        Metrics {
            last_close: 155.0,
            predicted_close: 145.0,
            percent_change: -6.45,
            volatility: 0.02,
            trend: Trend::Downward,
        }
    }

    #[test]
    fn test_invalid_metrics_do_not_touch_history() {
        let mut engine = AlertEngine::from_preset(Preset::Moderate).unwrap();
        let mut bad = drop_metrics();
        bad.volatility = -1.0;

        assert!(engine.evaluate_at("AAPL", &bad, t0()).is_err());
        assert!(engine.evaluate_at("  ", &drop_metrics(), t0()).is_err());
        assert!(engine.history().is_empty());
        assert_eq!(engine.stats().invalid_input, 2);
        assert_eq!(engine.stats().evaluations, 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = get_preset(Preset::Moderate);
        config.max_alerts_per_day = 0;
        assert!(matches!(
            AlertEngine::new(config),
            Err(EngineError::Configuration(_))
        ));
    }

    #[test]
    fn test_suppressed_decision_not_stored() {
        let mut engine = AlertEngine::from_preset(Preset::Moderate).unwrap();
        let first = engine.evaluate_at("AAPL", &drop_metrics(), t0()).unwrap();
        let second = engine
            .evaluate_at("AAPL", &drop_metrics(), t0() + Duration::minutes(5))
            .unwrap();

        assert!(first.should_alert);
        assert_eq!(
            second.suppression_reason,
            Some(SuppressionReason::DuplicateWithinCooldown)
        );
        assert_eq!(engine.history().len(), 1);
        assert_eq!(engine.stats().alerts_fired, 1);
        assert_eq!(engine.stats().suppressed_total(), 1);
    }

    #[test]
    fn test_batch_isolates_failures() {
        let mut engine = AlertEngine::from_preset(Preset::Moderate).unwrap();
        let good = drop_metrics();
        let mut bad = drop_metrics();
        bad.last_close = f64::NAN;

        let results = engine.evaluate_batch(
            vec![("AAPL", &good), ("MSFT", &bad), ("MSFT", &good)],
            t0(),
        );
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().should_alert);
        assert!(results[1].is_err());
        assert!(results[2].as_ref().unwrap().should_alert);
    }

    #[test]
    fn test_summary_and_prune() {
        let mut engine = AlertEngine::from_preset(Preset::Moderate).unwrap();
        engine.evaluate_at("AAPL", &drop_metrics(), t0()).unwrap();
        engine
            .evaluate_at("MSFT", &drop_metrics(), t0() + Duration::days(3))
            .unwrap();

        let summary = engine.summary(t0() + Duration::days(3));
        assert_eq!(summary.total_alerts, 2);
        assert_eq!(summary.alerts_last_24h, 1);
        assert_eq!(summary.last_alert.unwrap().stock_symbol, "MSFT");

        // Retention is 7 days for the moderate preset
        assert_eq!(engine.prune_history(t0() + Duration::days(8)), 1);
        assert_eq!(engine.history().len(), 1);

        assert_eq!(engine.clear_symbol("MSFT"), 1);
        engine.clear_history();
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_reversal_uses_last_stored_alert() {
        let mut engine = AlertEngine::from_preset(Preset::Moderate).unwrap();
        let up = Metrics {
            last_close: 100.0,
            predicted_close: 106.0,
            percent_change: 6.0,
            volatility: 0.01,
            trend: Trend::Upward,
        };
        let first = engine.evaluate_at("NVDA", &up, t0()).unwrap();
        assert_eq!(first.alert_type, AlertType::PriceSpike);

        let down = Metrics {
            last_close: 106.0,
            predicted_close: 102.8,
            percent_change: -3.0,
            volatility: 0.01,
            trend: Trend::Downward,
        };
        let second = engine
            .evaluate_at("NVDA", &down, t0() + Duration::hours(1))
            .unwrap();
        assert_eq!(second.alert_type, AlertType::TrendReversal);
        assert!(second.should_alert);
    }
}
