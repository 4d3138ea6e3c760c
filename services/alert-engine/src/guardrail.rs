//! Guardrail filter - anti-spam checks on triggered alerts
//!
//! Checks run in a fixed order and the first failing one decides the
//! suppression reason: confidence floor, same-type cooldown, trailing
//! 24h cap.

use crate::config::{RulesConfig, RATE_LIMIT_WINDOW_HOURS};
use crate::history::AlertHistory;
use crate::rules::RuleOutcome;
use crate::types::SuppressionReason;
use chrono::{DateTime, Duration, Utc};

pub struct Guardrail<'a> {
    config: &'a RulesConfig,
}

impl<'a> Guardrail<'a> {
    pub fn new(config: &'a RulesConfig) -> Self {
        Self { config }
    }

    /// Returns the suppression reason, or `None` if the alert may fire.
    ///
    /// Read-only; the caller records the alert once the decision is final.
    pub fn check(
        &self,
        history: &AlertHistory,
        symbol: &str,
        outcome: &RuleOutcome,
        now: DateTime<Utc>,
    ) -> Option<SuppressionReason> {
        debug_assert!(!outcome.alert_type.is_none());

        if outcome.confidence < self.config.min_confidence {
            return Some(SuppressionReason::LowConfidence);
        }

        if history.has_recent(symbol, outcome.alert_type, now, self.config.cooldown()) {
            return Some(SuppressionReason::DuplicateWithinCooldown);
        }

        let window = Duration::hours(RATE_LIMIT_WINDOW_HOURS as i64);
        if history.count_recent(symbol, now, window) >= self.config.max_alerts_per_day as usize {
            return Some(SuppressionReason::DailyLimitReached);
        }

        None
    }
}
