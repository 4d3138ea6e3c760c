//! End-to-end batch harness
//!
//! Validates the host loop:
//! metrics file → engine → journal (CSV + JSONL) → persisted history → restart

use alert_engine::{
    get_preset, AlertJournal, AlertType, BatchRunner, HistoryStore, MetricsRecord, Preset,
    SuppressionReason, Trend,
};
use chrono::{Duration, TimeZone, Utc};
use std::path::Path;
use tempfile::tempdir;

fn record(symbol: &str, last: f64, predicted: f64, vol: f64, trend: Trend) -> MetricsRecord {
    MetricsRecord {
        stock_symbol: symbol.to_string(),
        last_close: last,
        predicted_close: predicted,
        percent_change: None,
        volatility: vol,
        trend,
        timestamp: None,
    }
}

fn write_input(path: &Path, records: &[MetricsRecord], extra: &[&str]) {
    let mut body = String::new();
    for r in records {
        body.push_str(&serde_json::to_string(r).unwrap());
        body.push('\n');
    }
    for line in extra {
        body.push_str(line);
        body.push('\n');
    }
    std::fs::write(path, body).unwrap();
}

#[tokio::test]
async fn test_batch_run_journals_and_persists() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("outputs");
    let input = dir.path().join("metrics.jsonl");
    let history_path = out.join("alert_history.json");

    let now = Utc::now();
    let mut drop = record("AAPL", 155.0, 145.0, 0.02, Trend::Downward);
    drop.timestamp = Some(now - Duration::hours(2));
    let mut repeat = drop.clone();
    repeat.timestamp = Some(now - Duration::hours(1));
    let calm = record("MSFT", 410.0, 409.0, 0.01, Trend::Stable);
    let bad = record("TSLA", -1.0, 200.0, 0.02, Trend::Upward);

    write_input(
        &input,
        &[drop, repeat, calm, bad],
        &["", "{not valid json"],
    );

    let mut runner = BatchRunner::open(
        get_preset(Preset::Moderate),
        AlertJournal::new(&out),
        HistoryStore::new(&history_path),
    )
    .await
    .unwrap();

    let report = runner.run_file(&input).await.unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.alerts, 1);
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.no_signal, 1);
    // Invalid metrics + unparseable line
    assert_eq!(report.skipped, 2);
    assert_eq!(runner.engine().stats().invalid_input, 1);

    let journal = AlertJournal::new(&out);
    let decisions = journal.read_since(now - Duration::days(1)).await.unwrap();
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[0].alert_type, AlertType::PriceDrop);
    assert_eq!(
        decisions[1].suppression_reason,
        Some(SuppressionReason::DuplicateWithinCooldown)
    );

    let csv = std::fs::read_to_string(journal.csv_path()).unwrap();
    assert_eq!(csv.lines().count(), 4);

    assert!(history_path.exists());
    let history = HistoryStore::new(&history_path).load().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.last_for("AAPL").unwrap().metrics.trend, Trend::Downward);
}

#[tokio::test]
async fn test_restart_continues_guardrails() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("outputs");
    let history_path = out.join("alert_history.json");

    let first_input = dir.path().join("day1.jsonl");
    write_input(
        &first_input,
        &[record("NVDA", 100.0, 106.0, 0.01, Trend::Upward)],
        &[],
    );

    let mut runner = BatchRunner::open(
        get_preset(Preset::Moderate),
        AlertJournal::new(&out),
        HistoryStore::new(&history_path),
    )
    .await
    .unwrap();
    let report = runner.run_file(&first_input).await.unwrap();
    assert_eq!(report.alerts, 1);
    drop(runner);

    // New process: same spike is a duplicate, a downward flip is a reversal
    let second_input = dir.path().join("day2.jsonl");
    write_input(
        &second_input,
        &[
            record("NVDA", 100.0, 106.0, 0.01, Trend::Upward),
            record("NVDA", 106.0, 102.8, 0.01, Trend::Downward),
        ],
        &[],
    );

    let mut runner = BatchRunner::open(
        get_preset(Preset::Moderate),
        AlertJournal::new(&out),
        HistoryStore::new(&history_path),
    )
    .await
    .unwrap();
    assert_eq!(runner.engine().history().len(), 1);

    let report = runner.run_file(&second_input).await.unwrap();
    assert_eq!(report.suppressed, 1);
    assert_eq!(report.alerts, 1);

    let decisions = AlertJournal::new(&out)
        .read_since(Utc::now() - Duration::days(1))
        .await
        .unwrap();
    assert_eq!(decisions.len(), 3);
    assert_eq!(decisions[2].alert_type, AlertType::TrendReversal);

    let summary = AlertJournal::new(&out)
        .summary(Utc::now(), 30)
        .await
        .unwrap();
    assert_eq!(summary.alerts_triggered, 2);
    assert_eq!(summary.count_for(AlertType::PriceSpike), 1);
    assert_eq!(summary.count_for(AlertType::TrendReversal), 1);
}

#[tokio::test]
async fn test_backfill_prunes_relative_to_record_time() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("outputs");
    let history_path = out.join("alert_history.json");
    let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 16, 0, 0).unwrap();

    let mut stale = record("MSFT", 410.0, 385.0, 0.01, Trend::Downward);
    stale.timestamp = Some(t0 - Duration::days(9));
    let mut fresh = record("AAPL", 155.0, 145.0, 0.02, Trend::Downward);
    fresh.timestamp = Some(t0);

    let first_input = dir.path().join("backfill1.jsonl");
    write_input(&first_input, &[stale, fresh.clone()], &[]);

    let mut runner = BatchRunner::open(
        get_preset(Preset::Moderate),
        AlertJournal::new(&out),
        HistoryStore::new(&history_path),
    )
    .await
    .unwrap();
    assert_eq!(runner.run_file(&first_input).await.unwrap().alerts, 2);
    drop(runner);

    // Only the alert older than the retention window is gone
    let history = HistoryStore::new(&history_path).load().await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history.last_for("AAPL").is_some());

    let mut repeat = fresh;
    repeat.timestamp = Some(t0 + Duration::hours(1));
    let second_input = dir.path().join("backfill2.jsonl");
    write_input(&second_input, &[repeat], &[]);

    let mut runner = BatchRunner::open(
        get_preset(Preset::Moderate),
        AlertJournal::new(&out),
        HistoryStore::new(&history_path),
    )
    .await
    .unwrap();
    let report = runner.run_file(&second_input).await.unwrap();
    assert_eq!(report.alerts, 0);
    assert_eq!(report.suppressed, 1);
}
