//! Rule and guardrail configuration
//!
//! Single immutable value selected at engine construction. Presets live in
//! [`crate::presets`]; individual fields can be overridden from a file or the
//! environment through [`load_overrides`].

use crate::presets::{get_preset, Preset};
use crate::types::{ConfidenceLevel, EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Score below which a triggered alert is `low` confidence
pub const DEFAULT_MEDIUM_SCORE: f64 = 0.4;
/// Score above which a triggered alert is `high` confidence
pub const DEFAULT_HIGH_SCORE: f64 = 0.75;
/// Volatility at which the confidence penalty bottoms out
pub const DEFAULT_VOLATILITY_PENALTY_SCALE: f64 = 0.12;
/// Lower bound of the volatility penalty multiplier
pub const VOLATILITY_PENALTY_FLOOR: f64 = 0.3;
/// Minimum |percent_change| for a trend flip to count as a reversal
pub const DEFAULT_TREND_REVERSAL_MIN_CHANGE: f64 = 2.0;
/// How long alerted decisions are kept before pruning
pub const DEFAULT_HISTORY_RETENTION_HOURS: u32 = 168;
/// Upper bound on retention (ten years); also caps the cooldown
pub const MAX_HISTORY_RETENTION_HOURS: u32 = 87_600;
/// Trailing window of the daily rate limit
pub const RATE_LIMIT_WINDOW_HOURS: u32 = 24;

/// Environment prefix for rule overrides (e.g. `ALERT_RULES__COOLDOWN_HOURS=6`)
pub const ENV_PREFIX: &str = "ALERT_RULES";

/// Score cut-offs mapping a continuous score onto [`ConfidenceLevel`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    /// `score < medium` is low
    pub medium: f64,
    /// `score > high` is high, anything in between is medium
    pub high: f64,
}

impl Default for ConfidenceBands {
    fn default() -> Self {
        Self {
            medium: DEFAULT_MEDIUM_SCORE,
            high: DEFAULT_HIGH_SCORE,
        }
    }
}

impl ConfidenceBands {
    pub fn level(&self, score: f64) -> ConfidenceLevel {
        if score < self.medium {
            ConfidenceLevel::Low
        } else if score <= self.high {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        }
    }
}

/// Complete rule + guardrail configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Percent drop (positive magnitude) that triggers `price_drop`
    pub price_drop_threshold: f64,
    /// Percent rise that triggers `price_spike`
    pub price_spike_threshold: f64,
    /// Volatility level that triggers `volatility_spike`
    pub volatility_threshold: f64,
    /// Minimum |percent_change| for `trend_reversal`
    pub trend_reversal_min_change: f64,
    /// Volatility at which the confidence multiplier reaches zero (before the floor)
    pub volatility_penalty_scale: f64,
    pub bands: ConfidenceBands,
    /// Alerts below this level are suppressed
    pub min_confidence: ConfidenceLevel,
    /// Same-type repeat suppression window
    pub cooldown_hours: u32,
    /// Cap on alerts per symbol in the trailing 24 hours
    pub max_alerts_per_day: u32,
    /// Age after which stored alerts may be pruned
    pub history_retention_hours: u32,
}

impl Default for RulesConfig {
    fn default() -> Self {
        get_preset(Preset::Moderate)
    }
}

impl RulesConfig {
    /// Build a validated config from a preset plus optional overrides
    pub fn build(preset: Preset, overrides: Option<&RulesOverrides>) -> Result<Self> {
        let mut config = get_preset(preset);
        if let Some(o) = overrides {
            config = config.with_overrides(o);
        }
        config.validate()?;
        Ok(config)
    }

    /// Apply every field that is set in `overrides`
    pub fn with_overrides(mut self, overrides: &RulesOverrides) -> Self {
        let o = overrides;
        if let Some(v) = o.price_drop_threshold {
            self.price_drop_threshold = v;
        }
        if let Some(v) = o.price_spike_threshold {
            self.price_spike_threshold = v;
        }
        if let Some(v) = o.volatility_threshold {
            self.volatility_threshold = v;
        }
        if let Some(v) = o.trend_reversal_min_change {
            self.trend_reversal_min_change = v;
        }
        if let Some(v) = o.volatility_penalty_scale {
            self.volatility_penalty_scale = v;
        }
        if let Some(v) = o.medium_score {
            self.bands.medium = v;
        }
        if let Some(v) = o.high_score {
            self.bands.high = v;
        }
        if let Some(v) = o.min_confidence {
            self.min_confidence = v;
        }
        if let Some(v) = o.cooldown_hours {
            self.cooldown_hours = v;
        }
        if let Some(v) = o.max_alerts_per_day {
            self.max_alerts_per_day = v;
        }
        if let Some(v) = o.history_retention_hours {
            self.history_retention_hours = v;
        }
        self
    }

    /// Check internal consistency. Called at engine construction.
    pub fn validate(&self) -> Result<()> {
        positive("price_drop_threshold", self.price_drop_threshold)?;
        positive("price_spike_threshold", self.price_spike_threshold)?;
        positive("volatility_threshold", self.volatility_threshold)?;
        positive("volatility_penalty_scale", self.volatility_penalty_scale)?;

        if !self.trend_reversal_min_change.is_finite() || self.trend_reversal_min_change < 0.0 {
            return Err(EngineError::Configuration(format!(
                "trend_reversal_min_change must be finite and non-negative, got {}",
                self.trend_reversal_min_change
            )));
        }

        // Drop region is pct <= -drop, spike region is pct >= spike
        if self.price_spike_threshold <= -self.price_drop_threshold {
            return Err(EngineError::Configuration(format!(
                "price_spike_threshold ({}) must exceed the negated drop threshold ({})",
                self.price_spike_threshold, -self.price_drop_threshold
            )));
        }

        let b = &self.bands;
        if !(b.medium.is_finite() && b.high.is_finite() && 0.0 < b.medium && b.medium < b.high && b.high <= 1.0)
        {
            return Err(EngineError::Configuration(format!(
                "confidence bands must satisfy 0 < medium < high <= 1, got medium={} high={}",
                b.medium, b.high
            )));
        }

        if self.min_confidence == ConfidenceLevel::Low {
            return Err(EngineError::Configuration(
                "min_confidence must be medium or high; low-confidence alerts are always suppressed"
                    .to_string(),
            ));
        }

        if self.max_alerts_per_day == 0 {
            return Err(EngineError::Configuration(
                "max_alerts_per_day must be greater than zero".to_string(),
            ));
        }

        let required = self.cooldown_hours.max(RATE_LIMIT_WINDOW_HOURS);
        if self.history_retention_hours < required {
            return Err(EngineError::Configuration(format!(
                "history_retention_hours ({}) must cover the cooldown and rate-limit windows ({}h)",
                self.history_retention_hours, required
            )));
        }

        if self.history_retention_hours > MAX_HISTORY_RETENTION_HOURS {
            return Err(EngineError::Configuration(format!(
                "history_retention_hours ({}) exceeds the maximum of {}h",
                self.history_retention_hours, MAX_HISTORY_RETENTION_HOURS
            )));
        }

        Ok(())
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::hours(self.cooldown_hours as i64)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.history_retention_hours as i64)
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::Configuration(format!(
            "{} must be a positive finite number, got {}",
            name, value
        )))
    }
}

/// Partial configuration layered over a preset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesOverrides {
    pub price_drop_threshold: Option<f64>,
    pub price_spike_threshold: Option<f64>,
    pub volatility_threshold: Option<f64>,
    pub trend_reversal_min_change: Option<f64>,
    pub volatility_penalty_scale: Option<f64>,
    pub medium_score: Option<f64>,
    pub high_score: Option<f64>,
    pub min_confidence: Option<ConfidenceLevel>,
    pub cooldown_hours: Option<u32>,
    pub max_alerts_per_day: Option<u32>,
    pub history_retention_hours: Option<u32>,
}

/// Load overrides from an optional file (TOML/YAML/JSON by extension) and
/// `ALERT_RULES__*` environment variables. Environment wins.
pub fn load_overrides(file: Option<&Path>) -> Result<RulesOverrides> {
    let mut builder = config::Config::builder();

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .and_then(|c| c.try_deserialize::<RulesOverrides>())
        .map_err(|e| EngineError::Configuration(format!("failed to load rule overrides: {}", e)))
}
