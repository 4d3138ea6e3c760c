//! Rule evaluator - metrics to candidate alert
//!
//! Pure: no history mutation, no clock. The only outside input is the trend
//! of the last stored alert for the symbol, used by the reversal rule.

use crate::config::{RulesConfig, VOLATILITY_PENALTY_FLOOR};
use crate::metrics::{Metrics, Trend};
use crate::types::{AlertType, ConfidenceLevel};

/// Candidate alert before guardrails
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub alert_type: AlertType,
    /// Continuous confidence in [0, 1]
    pub score: f64,
    pub confidence: ConfidenceLevel,
    pub reason: String,
}

impl RuleOutcome {
    fn none() -> Self {
        Self {
            alert_type: AlertType::None,
            score: 0.0,
            confidence: ConfidenceLevel::Low,
            reason: "no rule triggered".to_string(),
        }
    }
}

/// Evaluates metrics against ordered threshold rules
pub struct RuleEvaluator<'a> {
    config: &'a RulesConfig,
}

impl<'a> RuleEvaluator<'a> {
    pub fn new(config: &'a RulesConfig) -> Self {
        Self { config }
    }

    /// Apply rules in priority order; first match wins.
    ///
    /// `previous_trend` is the trend recorded on the most recent stored
    /// alert for the same symbol, if any.
    pub fn evaluate(&self, metrics: &Metrics, previous_trend: Option<Trend>) -> RuleOutcome {
        let cfg = self.config;
        let pct = metrics.percent_change;
        let vol = metrics.volatility;

        // 1. Price drop
        if pct <= -cfg.price_drop_threshold {
            let base = strength(pct.abs(), cfg.price_drop_threshold);
            return self.outcome(
                AlertType::PriceDrop,
                base,
                vol,
                format!(
                    "percent_change={:.2}% exceeds drop threshold -{:.2}%",
                    pct, cfg.price_drop_threshold
                ),
            );
        }

        // 2. Price spike
        if pct >= cfg.price_spike_threshold {
            let base = strength(pct, cfg.price_spike_threshold);
            return self.outcome(
                AlertType::PriceSpike,
                base,
                vol,
                format!(
                    "percent_change={:+.2}% exceeds spike threshold +{:.2}%",
                    pct, cfg.price_spike_threshold
                ),
            );
        }

        // 3. Volatility spike
        if vol >= cfg.volatility_threshold {
            let base = strength(vol, cfg.volatility_threshold);
            return self.outcome(
                AlertType::VolatilitySpike,
                base,
                vol,
                format!(
                    "volatility={:.4} exceeds volatility threshold {:.4}",
                    vol, cfg.volatility_threshold
                ),
            );
        }

        // 4. Trend reversal against the last stored alert
        if let Some(prev) = previous_trend {
            let current = metrics.trend;
            if current.is_directional()
                && current != prev
                && pct.abs() >= cfg.trend_reversal_min_change
            {
                let base = if cfg.trend_reversal_min_change > 0.0 {
                    strength(pct.abs(), cfg.trend_reversal_min_change)
                } else {
                    1.0
                };
                return self.outcome(
                    AlertType::TrendReversal,
                    base,
                    vol,
                    format!(
                        "trend reversed {} -> {} with percent_change={:+.2}%",
                        prev, current, pct
                    ),
                );
            }
        }

        RuleOutcome::none()
    }

    fn outcome(&self, alert_type: AlertType, base: f64, volatility: f64, reason: String) -> RuleOutcome {
        let score = (base * volatility_penalty(volatility, self.config.volatility_penalty_scale))
            .clamp(0.0, 1.0);
        RuleOutcome {
            alert_type,
            score,
            confidence: self.config.bands.level(score),
            reason,
        }
    }
}

/// Magnitude relative to twice the threshold, capped at 1
fn strength(magnitude: f64, threshold: f64) -> f64 {
    (magnitude / (threshold * 2.0)).min(1.0)
}

/// Multiplier in [VOLATILITY_PENALTY_FLOOR, 1]; shrinks as volatility rises
pub fn volatility_penalty(volatility: f64, scale: f64) -> f64 {
    (1.0 - volatility / scale).max(VOLATILITY_PENALTY_FLOOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{get_preset, Preset};

    fn metrics(pct: f64, vol: f64, trend: Trend) -> Metrics {
        Metrics {
            last_close: 100.0,
            predicted_close: 100.0 + pct,
            percent_change: pct,
            volatility: vol,
            trend,
        }
    }

    #[test]
    fn test_drop_boundary_is_inclusive() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let at = eval.evaluate(&metrics(-4.0, 0.01, Trend::Downward), None);
        assert_eq!(at.alert_type, AlertType::PriceDrop);

        let above = eval.evaluate(&metrics(-3.99, 0.01, Trend::Downward), None);
        assert_eq!(above.alert_type, AlertType::None);
    }

    #[test]
    fn test_spike_boundary_is_inclusive() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let at = eval.evaluate(&metrics(5.0, 0.01, Trend::Upward), None);
        assert_eq!(at.alert_type, AlertType::PriceSpike);
        assert!(at.reason.contains("spike threshold"));
    }

    #[test]
    fn test_volatility_boundary_is_inclusive() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);
        let threshold = config.volatility_threshold;

        let at = eval.evaluate(&metrics(0.0, threshold, Trend::Stable), None);
        assert_eq!(at.alert_type, AlertType::VolatilitySpike);

        let below = eval.evaluate(&metrics(0.0, threshold - 1e-4, Trend::Stable), None);
        assert_eq!(below.alert_type, AlertType::None);
    }

    #[test]
    fn test_drop_precedes_volatility() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let outcome = eval.evaluate(&metrics(-5.0, 0.05, Trend::Downward), None);
        assert_eq!(outcome.alert_type, AlertType::PriceDrop);
    }

    #[test]
    fn test_volatility_spike() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let outcome = eval.evaluate(&metrics(0.6, 0.045, Trend::Stable), None);
        assert_eq!(outcome.alert_type, AlertType::VolatilitySpike);
        // 0.045 / 0.06 = 0.75, penalty 1 - 0.045/0.12 = 0.625
        assert!((outcome.score - 0.46875).abs() < 1e-9);
        assert_eq!(outcome.confidence, ConfidenceLevel::Medium);
    }

    #[test]
    fn test_reversal_requires_previous_trend() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);
        let m = metrics(-3.0, 0.01, Trend::Downward);

        assert_eq!(eval.evaluate(&m, None).alert_type, AlertType::None);
        assert_eq!(
            eval.evaluate(&m, Some(Trend::Downward)).alert_type,
            AlertType::None
        );

        let outcome = eval.evaluate(&m, Some(Trend::Upward));
        assert_eq!(outcome.alert_type, AlertType::TrendReversal);
        assert!(outcome.reason.contains("upward -> downward"));
    }

    #[test]
    fn test_reversal_ignores_small_moves_and_stable() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let small = metrics(1.0, 0.01, Trend::Upward);
        assert_eq!(
            eval.evaluate(&small, Some(Trend::Downward)).alert_type,
            AlertType::None
        );

        let flat = metrics(3.0, 0.01, Trend::Stable);
        assert_eq!(
            eval.evaluate(&flat, Some(Trend::Upward)).alert_type,
            AlertType::None
        );
    }

    #[test]
    fn test_extreme_volatility_degrades_confidence() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let calm = eval.evaluate(&metrics(-8.0, 0.0, Trend::Downward), None);
        assert_eq!(calm.confidence, ConfidenceLevel::High);

        let wild = eval.evaluate(&metrics(-6.45, 0.08, Trend::Downward), None);
        assert_eq!(wild.alert_type, AlertType::PriceDrop);
        assert_eq!(wild.confidence, ConfidenceLevel::Low);
    }

    #[test]
    fn test_penalty_floor() {
        assert_eq!(volatility_penalty(0.0, 0.12), 1.0);
        assert_eq!(volatility_penalty(1.0, 0.12), VOLATILITY_PENALTY_FLOOR);
    }

    #[test]
    fn test_none_outcome() {
        let config = get_preset(Preset::Moderate);
        let eval = RuleEvaluator::new(&config);

        let outcome = eval.evaluate(&metrics(-0.65, 0.015, Trend::Stable), None);
        assert_eq!(outcome.alert_type, AlertType::None);
        assert_eq!(outcome.score, 0.0);
        assert_eq!(outcome.confidence, ConfidenceLevel::Low);
    }
}
