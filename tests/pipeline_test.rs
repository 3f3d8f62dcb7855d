use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};

use txt_history_analytics::config::AppConfig;
use txt_history_analytics::decoder::DecodeStrategy;
use txt_history_analytics::models::utc_to_apple_timestamp;
use txt_history_analytics::report_writer::{write_report, ReportFormat};
use txt_history_analytics::{AnalysisSession, InMemorySource, Pipeline, RawMessageRecord, Sender, SenderFilter};

fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn sample_rows() -> Vec<RawMessageRecord> {
    let base = Utc.with_ymd_and_hms(2024, 6, 3, 18, 0, 0).unwrap();
    let at = |minutes: i64| utc_to_apple_timestamp(base + Duration::minutes(minutes));

    let mut garbage_then_text = vec![0xFF_u8; 20];
    garbage_then_text.extend(utf16le("hello there"));

    vec![
        RawMessageRecord::with_text(at(0), false, "dinner tonight?"),
        RawMessageRecord::with_text(at(2), true, "yes!! 😍"),
        RawMessageRecord::with_payload(at(3), true, garbage_then_text),
        RawMessageRecord::with_text(at(5), false, "Loved 'yes!!'"),
        RawMessageRecord {
            timestamp: at(6),
            text: None,
            is_from_me: false,
            payload: None,
        },
        RawMessageRecord::with_payload(at(7), false, vec![0x00, 0x01, 0xFF, 0x02]),
        RawMessageRecord::with_text(at(60 * 26), false, "good morning ❤️"),
    ]
}

#[tokio::test]
async fn test_pipeline_reports_diagnostics_and_analytics() {
    let source = InMemorySource::new(sample_rows());
    let now = Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap();

    let report = Pipeline::default()
        .with_batch_size(2)
        .run(&source, SenderFilter::All, now)
        .await
        .expect("Pipeline run failed");

    let diagnostics = &report.diagnostics;
    assert_eq!(diagnostics.rows_read, 7);
    assert_eq!(diagnostics.messages_accepted, 4);
    assert_eq!(diagnostics.reactions_filtered, 1);
    assert_eq!(diagnostics.skipped_no_text, 1);
    assert_eq!(diagnostics.payloads_decoded, 1);
    assert_eq!(diagnostics.payloads_undecoded, 1);
    assert_eq!(diagnostics.decoded_by_strategy.get(&DecodeStrategy::Utf16Window), Some(&1));

    assert_eq!(report.conversations.len(), 2);
    assert_eq!(report.wrapped.total_messages, 4);
    assert_eq!(report.wrapped.you.messages, 2);
    assert_eq!(report.time_series.heatmap.total(), 4);
    assert_eq!(report.reply_ladder.double_texts.get(Sender::Me), 1);
    assert_eq!(report.emoji.you.total, 1);
    assert_eq!(report.emoji.them.total, 1);
}

#[tokio::test]
async fn test_pipeline_from_config_respects_reaction_toggle() {
    let mut config = AppConfig::default();
    config.ingest.reaction_filter = false;
    config.ingest.batch_size = 3;

    let report = Pipeline::from(&config)
        .run(&InMemorySource::new(sample_rows()), SenderFilter::All, Utc::now())
        .await
        .expect("Pipeline run failed");

    assert_eq!(report.diagnostics.reactions_filtered, 0);
    assert_eq!(report.diagnostics.messages_accepted, 5);
}

#[tokio::test]
async fn test_sender_filter_restricts_rows() {
    let report = Pipeline::default()
        .run(&InMemorySource::new(sample_rows()), SenderFilter::Me, Utc::now())
        .await
        .expect("Pipeline run failed");

    assert_eq!(report.filter, SenderFilter::Me);
    assert_eq!(report.diagnostics.rows_read, 2);
    assert_eq!(report.wrapped.them.messages, 0);
}

#[tokio::test]
async fn test_empty_source_still_reports_diagnostics() {
    let report = Pipeline::default()
        .run(&InMemorySource::new(Vec::new()), SenderFilter::All, Utc::now())
        .await
        .expect("Pipeline run failed");

    let mut out = Vec::new();
    write_report(&report, ReportFormat::Json, &mut out).expect("Failed to write report");
    let value: serde_json::Value = serde_json::from_slice(&out).expect("Report is not JSON");

    assert_eq!(value["diagnostics"]["payloads_undecoded"], 0);
    assert_eq!(value["diagnostics"]["reactions_filtered"], 0);
    assert_eq!(value["wrapped"]["total_messages"], 0);
}

#[tokio::test]
async fn test_session_returns_only_latest_run() {
    let session = AnalysisSession::new(Pipeline::default(), Arc::new(InMemorySource::new(sample_rows())));
    let now = Utc::now();

    let stale = session.submit(SenderFilter::All, now);
    let latest = session.submit(SenderFilter::Me, now);
    assert!(latest.generation() > stale.generation());

    assert!(stale.result().await.expect("Stale run errored").is_none());
    let report = latest
        .result()
        .await
        .expect("Latest run errored")
        .expect("Latest run should report");
    assert_eq!(report.filter, SenderFilter::Me);
}
