//! Shared enums and the engine error type

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alert categories, in rule priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Predicted close falls by at least the drop threshold
    PriceDrop,
    /// Predicted close rises by at least the spike threshold
    PriceSpike,
    /// Recent volatility at or above the volatility threshold
    VolatilitySpike,
    /// Trend direction flipped relative to the last stored alert
    TrendReversal,
    /// Nothing to alert on
    None,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceDrop => "price_drop",
            AlertType::PriceSpike => "price_spike",
            AlertType::VolatilitySpike => "volatility_spike",
            AlertType::TrendReversal => "trend_reversal",
            AlertType::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AlertType::None)
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse confidence tier. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a triggered alert was held back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuppressionReason {
    /// Confidence below the configured floor
    LowConfidence,
    /// Same alert type already fired for the symbol inside the cooldown
    DuplicateWithinCooldown,
    /// Symbol already hit its cap for the trailing 24 hours
    DailyLimitReached,
}

impl SuppressionReason {
    /// Stable machine code (matches the serialized form)
    pub fn code(&self) -> &'static str {
        match self {
            SuppressionReason::LowConfidence => "low_confidence",
            SuppressionReason::DuplicateWithinCooldown => "duplicate_within_cooldown",
            SuppressionReason::DailyLimitReached => "daily_limit_reached",
        }
    }

    /// Human-facing text for "why no alert" reporting
    pub fn message(&self) -> &'static str {
        match self {
            SuppressionReason::LowConfidence => "low confidence",
            SuppressionReason::DuplicateWithinCooldown => "duplicate within cooldown",
            SuppressionReason::DailyLimitReached => "daily limit reached",
        }
    }
}

impl fmt::Display for SuppressionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error types for the decision engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid metrics: {field} {reason}")]
    InvalidMetrics { field: &'static str, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl EngineError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidMetrics {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
