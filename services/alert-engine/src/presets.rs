//! Threshold presets
//!
//! Named starting points for [`RulesConfig`]. Callers pick one and override
//! individual fields if needed.

use crate::config::{
    ConfidenceBands, RulesConfig, DEFAULT_HISTORY_RETENTION_HOURS,
    DEFAULT_TREND_REVERSAL_MIN_CHANGE, DEFAULT_VOLATILITY_PENALTY_SCALE,
};
use crate::types::{ConfidenceLevel, EngineError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preset strictness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Higher thresholds, longer cooldown, lower daily cap
    Conservative,
    #[default]
    Moderate,
    /// Lower thresholds, shorter cooldown, higher daily cap
    Aggressive,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Conservative => "conservative",
            Preset::Moderate => "moderate",
            Preset::Aggressive => "aggressive",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(Preset::Conservative),
            "moderate" => Ok(Preset::Moderate),
            "aggressive" => Ok(Preset::Aggressive),
            other => Err(EngineError::Configuration(format!(
                "unknown preset '{}', expected conservative, moderate or aggressive",
                other
            ))),
        }
    }
}

/// Get the config for a preset
pub fn get_preset(preset: Preset) -> RulesConfig {
    match preset {
        Preset::Conservative => RulesConfig {
            price_drop_threshold: 5.0,
            price_spike_threshold: 6.0,
            volatility_threshold: 0.04,
            trend_reversal_min_change: DEFAULT_TREND_REVERSAL_MIN_CHANGE,
            volatility_penalty_scale: DEFAULT_VOLATILITY_PENALTY_SCALE,
            bands: ConfidenceBands::default(),
            min_confidence: ConfidenceLevel::High,
            cooldown_hours: 48,
            max_alerts_per_day: 3,
            history_retention_hours: DEFAULT_HISTORY_RETENTION_HOURS,
        },
        Preset::Moderate => RulesConfig {
            price_drop_threshold: 4.0,
            price_spike_threshold: 5.0,
            volatility_threshold: 0.03,
            trend_reversal_min_change: DEFAULT_TREND_REVERSAL_MIN_CHANGE,
            volatility_penalty_scale: DEFAULT_VOLATILITY_PENALTY_SCALE,
            bands: ConfidenceBands::default(),
            min_confidence: ConfidenceLevel::Medium,
            cooldown_hours: 24,
            max_alerts_per_day: 5,
            history_retention_hours: DEFAULT_HISTORY_RETENTION_HOURS,
        },
        Preset::Aggressive => RulesConfig {
            price_drop_threshold: 3.0,
            price_spike_threshold: 4.0,
            volatility_threshold: 0.02,
            trend_reversal_min_change: DEFAULT_TREND_REVERSAL_MIN_CHANGE,
            volatility_penalty_scale: DEFAULT_VOLATILITY_PENALTY_SCALE,
            bands: ConfidenceBands::default(),
            min_confidence: ConfidenceLevel::Medium,
            cooldown_hours: 12,
            max_alerts_per_day: 8,
            history_retention_hours: DEFAULT_HISTORY_RETENTION_HOURS,
        },
    }
}
