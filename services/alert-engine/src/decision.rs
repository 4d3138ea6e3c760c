//! Decision record - output of one evaluation

use crate::metrics::Metrics;
use crate::rules::RuleOutcome;
use crate::types::{AlertType, ConfidenceLevel, SuppressionReason};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for name-based decision ids
const DECISION_NAMESPACE: Uuid = Uuid::from_u128(0x6a1e_47c2_9b3d_4f08_a5e1_2c7d_90b4_3f61);

/// Immutable result handed to explanation and output collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: Uuid,
    pub stock_symbol: String,
    pub timestamp: DateTime<Utc>,
    pub should_alert: bool,
    pub alert_type: AlertType,
    pub confidence: ConfidenceLevel,
    /// Continuous confidence behind `confidence`
    pub score: f64,
    /// Machine-oriented trigger description
    pub reason: String,
    pub suppressed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suppression_reason: Option<SuppressionReason>,
    pub metrics: Metrics,
}

impl Decision {
    /// Nothing triggered. Not a suppression.
    pub(crate) fn no_alert(
        symbol: &str,
        metrics: Metrics,
        outcome: RuleOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self::assemble(symbol, metrics, outcome, None, now)
    }

    /// Triggered and passed every guardrail
    pub(crate) fn alert(
        symbol: &str,
        metrics: Metrics,
        outcome: RuleOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self::assemble(symbol, metrics, outcome, None, now)
    }

    /// Triggered but held back by a guardrail
    pub(crate) fn suppressed(
        symbol: &str,
        metrics: Metrics,
        outcome: RuleOutcome,
        reason: SuppressionReason,
        now: DateTime<Utc>,
    ) -> Self {
        Self::assemble(symbol, metrics, outcome, Some(reason), now)
    }

    fn assemble(
        symbol: &str,
        metrics: Metrics,
        outcome: RuleOutcome,
        suppression: Option<SuppressionReason>,
        now: DateTime<Utc>,
    ) -> Self {
        let triggered = !outcome.alert_type.is_none();
        let id = decision_id(symbol, &metrics, &outcome, suppression, now);
        Self {
            id,
            stock_symbol: symbol.to_string(),
            timestamp: now,
            should_alert: triggered && suppression.is_none(),
            alert_type: outcome.alert_type,
            confidence: outcome.confidence,
            score: outcome.score,
            reason: outcome.reason,
            suppressed: suppression.is_some(),
            suppression_reason: suppression,
            metrics,
        }
    }

    /// Whether a rule fired, regardless of suppression
    pub fn triggered(&self) -> bool {
        !self.alert_type.is_none()
    }

    /// Human text for the suppression, empty when not suppressed
    pub fn suppression_message(&self) -> &'static str {
        self.suppression_reason.map(|r| r.message()).unwrap_or("")
    }
}

/// Same inputs, same id: derived from everything that shapes the decision
fn decision_id(
    symbol: &str,
    metrics: &Metrics,
    outcome: &RuleOutcome,
    suppression: Option<SuppressionReason>,
    now: DateTime<Utc>,
) -> Uuid {
    let name = format!(
        "{}|{}|{}|{}|{:x}|{}|{:x}|{:x}|{:x}|{:x}|{}",
        symbol,
        now.to_rfc3339_opts(SecondsFormat::Nanos, true),
        outcome.alert_type,
        outcome.confidence,
        outcome.score.to_bits(),
        suppression.map(|r| r.code()).unwrap_or("-"),
        metrics.last_close.to_bits(),
        metrics.predicted_close.to_bits(),
        metrics.percent_change.to_bits(),
        metrics.volatility.to_bits(),
        metrics.trend,
    );
    Uuid::new_v5(&DECISION_NAMESPACE, name.as_bytes())
}
