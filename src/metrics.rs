use metrics::{counter, histogram};
use std::time::Duration;

use crate::normalizer::IngestDiagnostics;

/// Metric names emitted by an analysis run.
///
/// No recorder is installed here; the calls are no-ops unless the embedding
/// application installs an exporter.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    /// Raw rows read from the source
    pub rows_ingested_total: &'static str,
    /// Rows that became messages
    pub messages_accepted_total: &'static str,
    /// Payloads recovered, labelled by strategy
    pub payloads_decoded_total: &'static str,
    /// Payloads no strategy could read
    pub payloads_undecoded_total: &'static str,
    /// Reaction notifications dropped
    pub reactions_filtered_total: &'static str,
    /// Rows with no text at all
    pub empty_messages_total: &'static str,
    /// Rows with unrepresentable timestamps
    pub invalid_timestamps_total: &'static str,
    /// Per-stage duration in seconds
    pub stage_duration: &'static str,
    /// Failed runs by kind
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            rows_ingested_total: "txt_analytics_rows_ingested_total",
            messages_accepted_total: "txt_analytics_messages_accepted_total",
            payloads_decoded_total: "txt_analytics_payloads_decoded_total",
            payloads_undecoded_total: "txt_analytics_payloads_undecoded_total",
            reactions_filtered_total: "txt_analytics_reactions_filtered_total",
            empty_messages_total: "txt_analytics_empty_messages_total",
            invalid_timestamps_total: "txt_analytics_invalid_timestamps_total",
            stage_duration: "txt_analytics_stage_duration_seconds",
            errors_total: "txt_analytics_errors_total",
        }
    }
}

impl MetricsCollector {
    /// Record the counters of one ingest pass
    pub fn record_ingest(&self, diagnostics: &IngestDiagnostics) {
        counter!(self.rows_ingested_total).increment(diagnostics.rows_read as u64);
        counter!(self.messages_accepted_total).increment(diagnostics.messages_accepted as u64);
        counter!(self.payloads_undecoded_total).increment(diagnostics.payloads_undecoded as u64);
        counter!(self.reactions_filtered_total).increment(diagnostics.reactions_filtered as u64);
        counter!(self.empty_messages_total).increment(diagnostics.skipped_no_text as u64);
        counter!(self.invalid_timestamps_total).increment(diagnostics.invalid_timestamps as u64);

        for (strategy, count) in &diagnostics.decoded_by_strategy {
            counter!(self.payloads_decoded_total, "strategy" => strategy.as_str()).increment(*count as u64);
        }
    }

    /// Record how long a pipeline stage took
    pub fn record_stage(&self, stage: &'static str, duration: Duration) {
        histogram!(self.stage_duration, "stage" => stage).record(duration.as_secs_f64());
    }

    /// Record a failed run
    pub fn record_error(&self, error_type: &'static str) {
        counter!(self.errors_total, "type" => error_type).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_collector_names() {
        let collector = MetricsCollector::default();
        assert_eq!(collector.rows_ingested_total, "txt_analytics_rows_ingested_total");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let collector = MetricsCollector::default();
        collector.record_ingest(&IngestDiagnostics::default());
        collector.record_stage("ingest", Duration::from_millis(3));
        collector.record_error("source");
    }
}
