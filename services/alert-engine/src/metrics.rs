//! Forecast metrics consumed by the engine
//!
//! The forecast itself (predicted close) is produced elsewhere. This module
//! only carries the record and derives the supporting statistics
//! (percent change, rolling volatility, trend direction) from a close series.

use crate::types::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of trailing returns used for volatility and trend
pub const DEFAULT_METRICS_WINDOW: usize = 10;

/// Least-squares slope (price units per bar) beyond which a series is directional
pub const TREND_SLOPE_THRESHOLD: f64 = 0.5;

/// Direction of the recent price series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Upward,
    Downward,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Upward => "upward",
            Trend::Downward => "downward",
            Trend::Stable => "stable",
        }
    }

    pub fn is_directional(&self) -> bool {
        !matches!(self, Trend::Stable)
    }

    /// Classify a least-squares slope
    pub fn from_slope(slope: f64) -> Self {
        if slope > TREND_SLOPE_THRESHOLD {
            Trend::Upward
        } else if slope < -TREND_SLOPE_THRESHOLD {
            Trend::Downward
        } else {
            Trend::Stable
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics for one (symbol, evaluation time)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub last_close: f64,
    pub predicted_close: f64,
    /// `(predicted_close - last_close) / last_close * 100`
    pub percent_change: f64,
    pub volatility: f64,
    pub trend: Trend,
}

impl Metrics {
    /// Build metrics, computing `percent_change` from the two closes
    pub fn new(last_close: f64, predicted_close: f64, volatility: f64, trend: Trend) -> Self {
        Self {
            last_close,
            predicted_close,
            percent_change: percent_change(last_close, predicted_close),
            volatility,
            trend,
        }
    }

    /// Derive metrics from a close series and an externally forecast close.
    ///
    /// Volatility is the sample standard deviation of the last `window`
    /// simple returns; trend is the least-squares slope of the last
    /// `window` closes.
    pub fn from_closes(closes: &[f64], predicted_close: f64, window: usize) -> Result<Self> {
        if window < 2 {
            return Err(EngineError::invalid("window", "must be at least 2"));
        }
        if closes.len() < window + 1 {
            return Err(EngineError::invalid(
                "closes",
                format!("need at least {} values, got {}", window + 1, closes.len()),
            ));
        }
        if let Some(bad) = closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
            return Err(EngineError::invalid(
                "closes",
                format!("contains non-positive or non-finite value {}", bad),
            ));
        }

        let last_close = closes[closes.len() - 1];
        let returns: Vec<f64> = closes.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
        let volatility = sample_std_dev(&returns[returns.len() - window..]);
        let trend = Trend::from_slope(slope(&closes[closes.len() - window..]));

        let metrics = Self::new(last_close, predicted_close, volatility, trend);
        metrics.validate()?;
        Ok(metrics)
    }

    /// Reject non-finite values and physically impossible ranges
    pub fn validate(&self) -> Result<()> {
        check_price("last_close", self.last_close)?;
        check_price("predicted_close", self.predicted_close)?;

        if !self.percent_change.is_finite() {
            return Err(EngineError::invalid("percent_change", "must be finite"));
        }
        if !self.volatility.is_finite() {
            return Err(EngineError::invalid("volatility", "must be finite"));
        }
        if self.volatility < 0.0 {
            return Err(EngineError::invalid(
                "volatility",
                format!("must be non-negative, got {}", self.volatility),
            ));
        }
        Ok(())
    }
}

fn check_price(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(EngineError::invalid(field, "must be finite"));
    }
    if value <= 0.0 {
        return Err(EngineError::invalid(
            field,
            format!("must be positive, got {}", value),
        ));
    }
    Ok(())
}

pub fn percent_change(last_close: f64, predicted_close: f64) -> f64 {
    (predicted_close - last_close) / last_close * 100.0
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

fn slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
