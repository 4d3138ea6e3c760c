//! Alert journal - append every decision to CSV and JSON Lines
//!
//! `alerts.csv` is the flat, spreadsheet-friendly view; `alerts.jsonl` holds
//! the full [`Decision`] and is what the summary report reads back.

use crate::decision::Decision;
use crate::types::AlertType;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub const CSV_FILE: &str = "alerts.csv";
pub const JSONL_FILE: &str = "alerts.jsonl";

/// How many triggered alerts the summary lists
const RECENT_ALERTS: usize = 5;

/// Flat CSV row
#[derive(Debug, Serialize)]
struct JournalRow<'a> {
    timestamp: String,
    stock: &'a str,
    alert_triggered: bool,
    alert_type: &'static str,
    confidence: &'static str,
    score: f64,
    last_close: f64,
    predicted_close: f64,
    percent_change: f64,
    volatility: f64,
    trend: &'static str,
    reason: &'a str,
    suppressed: bool,
    suppression_reason: &'static str,
}

impl<'a> From<&'a Decision> for JournalRow<'a> {
    fn from(d: &'a Decision) -> Self {
        Self {
            timestamp: d.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            stock: &d.stock_symbol,
            alert_triggered: d.should_alert,
            alert_type: d.alert_type.as_str(),
            confidence: d.confidence.as_str(),
            score: d.score,
            last_close: d.metrics.last_close,
            predicted_close: d.metrics.predicted_close,
            percent_change: d.metrics.percent_change,
            volatility: d.metrics.volatility,
            trend: d.metrics.trend.as_str(),
            reason: &d.reason,
            suppressed: d.suppressed,
            suppression_reason: d.suppression_reason.map(|r| r.code()).unwrap_or(""),
        }
    }
}

/// Append-only decision journal in one directory
pub struct AlertJournal {
    csv_path: PathBuf,
    jsonl_path: PathBuf,
}

impl AlertJournal {
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        let base = output_dir.as_ref();
        Self {
            csv_path: base.join(CSV_FILE),
            jsonl_path: base.join(JSONL_FILE),
        }
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    pub fn jsonl_path(&self) -> &Path {
        &self.jsonl_path
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.csv_path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
        }
        Ok(())
    }

    /// Append one decision to both files
    pub async fn record(&self, decision: &Decision) -> anyhow::Result<()> {
        let needs_header = match fs::metadata(&self.csv_path).await {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(Vec::new());
        writer.serialize(JournalRow::from(decision))?;
        let row = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV row: {}", e))?;
        append(&self.csv_path, &row).await?;

        let mut line = serde_json::to_vec(decision)?;
        line.push(b'\n');
        append(&self.jsonl_path, &line).await?;

        debug!(
            symbol = %decision.stock_symbol,
            id = %decision.id,
            "Journaled decision"
        );
        Ok(())
    }

    /// Read back every journaled decision at or after `since`.
    /// Unparseable lines are skipped.
    pub async fn read_since(&self, since: DateTime<Utc>) -> anyhow::Result<Vec<Decision>> {
        let raw = match fs::read_to_string(&self.jsonl_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read journal {}", self.jsonl_path.display())
                })
            }
        };

        let mut decisions = Vec::new();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Decision>(line) {
                Ok(d) if d.timestamp >= since => decisions.push(d),
                Ok(_) => {}
                Err(e) => warn!("Skipping journal line {}: {}", n + 1, e),
            }
        }
        Ok(decisions)
    }

    /// Summarize the last `days` days of decisions
    pub async fn summary(&self, now: DateTime<Utc>, days: i64) -> anyhow::Result<JournalSummary> {
        let decisions = self.read_since(now - Duration::days(days)).await?;
        Ok(JournalSummary::from_decisions(days, &decisions))
    }
}

async fn append(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("Failed to append to {}", path.display()))?;
    file.flush().await?;
    Ok(())
}

/// Aggregate view of journaled decisions
#[derive(Debug, Clone, Serialize)]
pub struct JournalSummary {
    pub days: i64,
    pub total_evaluations: usize,
    pub alerts_triggered: usize,
    pub alerts_suppressed: usize,
    pub by_type: BTreeMap<String, usize>,
    /// Most recent triggered alerts, oldest first
    pub recent: Vec<Decision>,
}

impl JournalSummary {
    pub fn from_decisions(days: i64, decisions: &[Decision]) -> Self {
        let mut by_type = BTreeMap::new();
        let mut triggered: Vec<&Decision> = Vec::new();
        let mut suppressed = 0;

        for d in decisions {
            if d.should_alert {
                *by_type.entry(d.alert_type.as_str().to_string()).or_insert(0) += 1;
                triggered.push(d);
            }
            if d.suppressed {
                suppressed += 1;
            }
        }

        triggered.sort_by_key(|d| d.timestamp);
        let skip = triggered.len().saturating_sub(RECENT_ALERTS);
        let recent = triggered.iter().skip(skip).map(|d| (*d).clone()).collect();

        Self {
            days,
            total_evaluations: decisions.len(),
            alerts_triggered: triggered.len(),
            alerts_suppressed: suppressed,
            by_type,
            recent,
        }
    }

    /// Share of evaluations that fired, in percent
    pub fn alert_rate(&self) -> f64 {
        if self.total_evaluations == 0 {
            0.0
        } else {
            self.alerts_triggered as f64 / self.total_evaluations as f64 * 100.0
        }
    }

    pub fn count_for(&self, alert_type: AlertType) -> usize {
        self.by_type.get(alert_type.as_str()).copied().unwrap_or(0)
    }
}

impl fmt::Display for JournalSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_evaluations == 0 {
            return writeln!(f, "No decisions in the last {} days.", self.days);
        }

        writeln!(f, "Alert Summary Report (Last {} Days)", self.days)?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(f, "Total Evaluations: {}", self.total_evaluations)?;
        writeln!(f, "Alerts Triggered: {}", self.alerts_triggered)?;
        writeln!(f, "Alerts Suppressed: {}", self.alerts_suppressed)?;
        writeln!(f, "Alert Rate: {:.1}%", self.alert_rate())?;
        writeln!(f)?;
        writeln!(f, "Alert Type Breakdown:")?;
        if self.by_type.is_empty() {
            writeln!(f, "  None")?;
        }
        for (alert_type, count) in &self.by_type {
            writeln!(f, "  {}: {}", alert_type, count)?;
        }
        writeln!(f)?;
        writeln!(f, "Recent Alerts:")?;
        for d in &self.recent {
            writeln!(
                f,
                "  [{}] {} {} - {}",
                d.timestamp.format("%Y-%m-%d"),
                d.stock_symbol,
                d.alert_type,
                d.confidence
            )?;
        }
        Ok(())
    }
}
