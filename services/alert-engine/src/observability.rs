//! Observability: evaluation counters and metric names

use crate::decision::Decision;
use crate::types::SuppressionReason;
use serde::Serialize;
use std::collections::HashMap;

/// Counters kept by the engine across evaluations
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineStats {
    pub evaluations: u64,
    pub alerts_fired: u64,
    pub no_signal: u64,
    pub suppressed: HashMap<SuppressionReason, u64>,
    pub invalid_input: u64,
}

impl EngineStats {
    pub(crate) fn record(&mut self, decision: &Decision) {
        self.evaluations += 1;
        match (decision.should_alert, decision.suppression_reason) {
            (true, _) => self.alerts_fired += 1,
            (false, Some(reason)) => *self.suppressed.entry(reason).or_insert(0) += 1,
            (false, None) => self.no_signal += 1,
        }
    }

    pub(crate) fn record_invalid(&mut self) {
        self.invalid_input += 1;
    }

    pub fn suppressed_total(&self) -> u64 {
        self.suppressed.values().sum()
    }

    pub fn suppressed_for(&self, reason: SuppressionReason) -> u64 {
        self.suppressed.get(&reason).copied().unwrap_or(0)
    }

    /// Flatten into `(metric name, value)` pairs for log lines or exporters
    pub fn as_counters(&self) -> Vec<(&'static str, u64)> {
        vec![
            (metrics::EVALUATIONS, self.evaluations),
            (metrics::ALERTS_FIRED, self.alerts_fired),
            (metrics::NO_SIGNAL, self.no_signal),
            (
                metrics::SUPPRESSED_LOW_CONFIDENCE,
                self.suppressed_for(SuppressionReason::LowConfidence),
            ),
            (
                metrics::SUPPRESSED_COOLDOWN,
                self.suppressed_for(SuppressionReason::DuplicateWithinCooldown),
            ),
            (
                metrics::SUPPRESSED_DAILY_LIMIT,
                self.suppressed_for(SuppressionReason::DailyLimitReached),
            ),
            (metrics::INVALID_INPUT, self.invalid_input),
        ]
    }
}

/// Predefined metric names
pub mod metrics {
    pub const EVALUATIONS: &str = "alert_evaluations_total";
    pub const ALERTS_FIRED: &str = "alerts_fired_total";
    pub const NO_SIGNAL: &str = "alert_no_signal_total";
    pub const SUPPRESSED_LOW_CONFIDENCE: &str = "alerts_suppressed_low_confidence_total";
    pub const SUPPRESSED_COOLDOWN: &str = "alerts_suppressed_cooldown_total";
    pub const SUPPRESSED_DAILY_LIMIT: &str = "alerts_suppressed_daily_limit_total";
    pub const INVALID_INPUT: &str = "alert_invalid_input_total";
}
