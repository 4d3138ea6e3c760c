//! Alert Engine Library
//!
//! Decides whether a forecast warrants a market alert: threshold rules pick
//! the alert type and confidence, guardrails hold back low-confidence,
//! duplicate, and over-limit alerts, and a per-symbol history carries state
//! between evaluations.

pub mod config;
pub mod decision;
pub mod engine;
pub mod guardrail;
pub mod history;
pub mod journal;
pub mod metrics;
pub mod observability;
pub mod presets;
pub mod rules;
pub mod runner;
pub mod store;
pub mod types;


// Re-export main types for convenience
pub use config::{load_overrides, ConfidenceBands, RulesConfig, RulesOverrides};
pub use decision::Decision;
pub use engine::{AlertEngine, AlertSummary};
pub use guardrail::Guardrail;
pub use history::{AlertHistory, HistorySnapshot};
pub use journal::{AlertJournal, JournalSummary};
pub use metrics::{Metrics, Trend};
pub use observability::EngineStats;
pub use presets::{get_preset, Preset};
pub use rules::{RuleEvaluator, RuleOutcome};
pub use runner::{BatchRunner, MetricsRecord, RunReport};
pub use store::HistoryStore;
pub use types::{AlertType, ConfidenceLevel, EngineError, Result, SuppressionReason};
