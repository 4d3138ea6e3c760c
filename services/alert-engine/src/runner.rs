//! Batch runner - metrics file in, journaled decisions and saved history out

use crate::config::RulesConfig;
use crate::decision::Decision;
use crate::engine::AlertEngine;
use crate::journal::AlertJournal;
use crate::metrics::{percent_change, Metrics, Trend};
use crate::store::HistoryStore;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One input line: a symbol plus its forecast metrics.
///
/// `percent_change` may be omitted and is then computed from the closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub stock_symbol: String,
    pub last_close: f64,
    pub predicted_close: f64,
    #[serde(default)]
    pub percent_change: Option<f64>,
    pub volatility: f64,
    pub trend: Trend,
    /// Evaluation time; defaults to the wall clock
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MetricsRecord {
    pub fn metrics(&self) -> Metrics {
        Metrics {
            last_close: self.last_close,
            predicted_close: self.predicted_close,
            percent_change: self
                .percent_change
                .unwrap_or_else(|| percent_change(self.last_close, self.predicted_close)),
            volatility: self.volatility,
            trend: self.trend,
        }
    }
}

/// Counts from one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub processed: usize,
    pub alerts: usize,
    pub suppressed: usize,
    pub no_signal: usize,
    pub skipped: usize,
}

impl RunReport {
    fn tally(&mut self, decision: &Decision) {
        self.processed += 1;
        if decision.should_alert {
            self.alerts += 1;
        } else if decision.suppressed {
            self.suppressed += 1;
        } else {
            self.no_signal += 1;
        }
    }
}

/// Drives an [`AlertEngine`] over a batch and handles the host-side I/O
pub struct BatchRunner {
    engine: AlertEngine,
    journal: AlertJournal,
    store: HistoryStore,
    /// Latest evaluation time seen; pruning is relative to it
    as_of: Option<DateTime<Utc>>,
}

impl BatchRunner {
    /// Load persisted history and prepare the journal
    pub async fn open(
        config: RulesConfig,
        journal: AlertJournal,
        store: HistoryStore,
    ) -> anyhow::Result<Self> {
        journal.init().await?;
        let history = store.load().await?;
        let engine = AlertEngine::with_history(config, history)?;
        Ok(Self {
            engine,
            journal,
            store,
            as_of: None,
        })
    }

    pub fn engine(&self) -> &AlertEngine {
        &self.engine
    }

    /// Evaluate and journal one record. Invalid records are logged and
    /// skipped (`Ok(None)`); only I/O failures are errors.
    pub async fn process(&mut self, record: &MetricsRecord) -> anyhow::Result<Option<Decision>> {
        let now = record.timestamp.unwrap_or_else(Utc::now);
        let decision = match self
            .engine
            .evaluate_at(&record.stock_symbol, &record.metrics(), now)
        {
            Ok(d) => d,
            Err(e) => {
                warn!(symbol = %record.stock_symbol, "Skipping record: {}", e);
                return Ok(None);
            }
        };

        self.as_of = Some(self.as_of.map_or(now, |t| t.max(now)));
        self.journal.record(&decision).await?;
        Ok(Some(decision))
    }

    /// Run every JSON Lines record in `input`, then prune and save history
    pub async fn run_file(&mut self, input: &Path) -> anyhow::Result<RunReport> {
        let raw = tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read input {}", input.display()))?;

        let mut report = RunReport::default();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: MetricsRecord = match serde_json::from_str(line) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping input line {}: {}", n + 1, e);
                    report.skipped += 1;
                    continue;
                }
            };
            match self.process(&record).await? {
                Some(decision) => report.tally(&decision),
                None => report.skipped += 1,
            }
        }

        self.finish().await?;
        info!(
            processed = report.processed,
            alerts = report.alerts,
            suppressed = report.suppressed,
            skipped = report.skipped,
            "Batch complete"
        );
        Ok(report)
    }

    /// Prune expired alerts and persist history. Backfilled runs prune
    /// relative to their newest record, not the wall clock.
    pub async fn finish(&mut self) -> anyhow::Result<()> {
        let as_of = self.as_of.unwrap_or_else(Utc::now);
        self.engine.prune_history(as_of);
        self.store.save(self.engine.history()).await
    }
}
