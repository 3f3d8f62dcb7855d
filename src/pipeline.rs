//! Ingest and analysis orchestration
//!
//! Rows are normalized in fixed-size chunks on the blocking pool and joined
//! back in chunk order, so message order never depends on which chunk
//! finishes first. The analysis stage shares the messages read-only across
//! independent aggregator tasks.

use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{info, warn};

use crate::config::{AnalysisConfig, AppConfig};
use crate::emoji::{EmojiExtractor, EmojiReport};
use crate::error::Result;
use crate::highlights::{HighlightDetector, Highlights};
use crate::logging::OperationTimer;
use crate::metrics::MetricsCollector;
use crate::models::{NormalizedMessage, RawMessageRecord, SenderFilter};
use crate::normalizer::{IngestDiagnostics, MessageNormalizer};
use crate::response::{MonthlyResponseTimes, ReplyLadder, ReplyLadderAnalyzer, ResponseTimeAnalyzer};
use crate::segmenter::{ConversationSegmenter, ConversationSummary};
use crate::sentiment::{sentiment_trend, SentimentTrend};
use crate::source::MessageSource;
use crate::timeseries::{TimeSeries, TimeSeriesAggregator};
use crate::topics::{TopicAnalyzer, TopicReport};
use crate::wrapped::{WrappedStats, WrappedStatsCollector};

/// Default ingest chunk size
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Every output of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Reference instant for trailing windows
    pub generated_at: DateTime<Utc>,
    /// Which sender's rows were loaded
    pub filter: SenderFilter,
    /// Ingest counters
    pub diagnostics: IngestDiagnostics,
    /// Conversation boundaries
    pub conversations: Vec<ConversationSummary>,
    /// Heatmap, words per week, conversation share
    pub time_series: TimeSeries,
    /// Monthly reply latency
    pub response_times: Vec<MonthlyResponseTimes>,
    /// Double-texts and enders
    pub reply_ladder: ReplyLadder,
    /// Weekly sentiment
    pub sentiment: SentimentTrend,
    /// Emoji statistics
    pub emoji: EmojiReport,
    /// Year-in-review summary
    pub wrapped: WrappedStats,
    /// Streaks, big days, milestones
    pub highlights: Highlights,
    /// Message kinds, inside jokes, monthly topics
    pub topics: TopicReport,
}

/// The aggregators of one run, configured together
#[derive(Debug, Clone, Copy, Default)]
pub struct Analyzer {
    segmenter: ConversationSegmenter,
    time_series: TimeSeriesAggregator,
    response_times: ResponseTimeAnalyzer,
    reply_ladder: ReplyLadderAnalyzer,
    emoji: EmojiExtractor,
    wrapped: WrappedStatsCollector,
    highlights: HighlightDetector,
    topics: TopicAnalyzer,
}

impl From<&AnalysisConfig> for Analyzer {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            segmenter: ConversationSegmenter::new(config.conversation_gap()),
            time_series: TimeSeriesAggregator::new(config.recent_window()),
            response_times: ResponseTimeAnalyzer::new(config.response_window()),
            reply_ladder: ReplyLadderAnalyzer::new(config.double_text_window()),
            emoji: EmojiExtractor::new(config.top_emoji),
            wrapped: WrappedStatsCollector::new(config.leaderboard_size),
            highlights: HighlightDetector::new(config.streak_limit, config.big_day_limit),
            topics: TopicAnalyzer::new(config.inside_joke_min_repeats),
        }
    }
}

impl Analyzer {
    /// Run every aggregator in turn over chronologically ordered messages.
    ///
    /// The returned report carries empty diagnostics; [`Pipeline::run`] fills
    /// them in.
    #[must_use]
    pub fn analyze(&self, messages: &[NormalizedMessage], now: DateTime<Utc>) -> AnalysisReport {
        let (conversations, reply_ladder) = self.conversations(messages);
        let emoji = self.emoji.analyze(messages);
        let wrapped = self
            .wrapped
            .collect(messages, conversations.len(), &reply_ladder, &emoji.top);

        AnalysisReport {
            generated_at: now,
            filter: SenderFilter::All,
            diagnostics: IngestDiagnostics::default(),
            conversations,
            time_series: self.time_series.aggregate(messages, now),
            response_times: self.response_times.analyze(messages),
            reply_ladder,
            sentiment: sentiment_trend(messages),
            emoji,
            wrapped,
            highlights: self.highlights.detect(messages),
            topics: self.topics.analyze(messages),
        }
    }

    /// Same report as [`Analyzer::analyze`], with independent aggregators on
    /// separate blocking tasks.
    pub async fn analyze_concurrent(
        &self,
        messages: Arc<[NormalizedMessage]>,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport> {
        let this = *self;

        let (
            (conversations, reply_ladder),
            time_series,
            response_times,
            sentiment,
            emoji,
            highlights,
            topics,
        ) = tokio::try_join!(
            on_blocking_pool(&messages, move |m| this.conversations(m)),
            on_blocking_pool(&messages, move |m| this.time_series.aggregate(m, now)),
            on_blocking_pool(&messages, move |m| this.response_times.analyze(m)),
            on_blocking_pool(&messages, sentiment_trend),
            on_blocking_pool(&messages, move |m| this.emoji.analyze(m)),
            on_blocking_pool(&messages, move |m| this.highlights.detect(m)),
            on_blocking_pool(&messages, move |m| this.topics.analyze(m)),
        )?;

        let conversation_count = conversations.len();
        let top_emoji = emoji.top.clone();
        let wrapped = on_blocking_pool(&messages, move |m| {
            this.wrapped.collect(m, conversation_count, &reply_ladder, &top_emoji)
        })
        .await?;

        Ok(AnalysisReport {
            generated_at: now,
            filter: SenderFilter::All,
            diagnostics: IngestDiagnostics::default(),
            conversations,
            time_series,
            response_times,
            reply_ladder,
            sentiment,
            emoji,
            wrapped,
            highlights,
            topics,
        })
    }

    fn conversations(&self, messages: &[NormalizedMessage]) -> (Vec<ConversationSummary>, ReplyLadder) {
        let conversations = self.segmenter.segment(messages);
        let ladder = self.reply_ladder.analyze(messages, &conversations);
        (conversations.into_iter().map(ConversationSummary::from).collect(), ladder)
    }
}

fn on_blocking_pool<T, F>(messages: &Arc<[NormalizedMessage]>, f: F) -> JoinHandle<T>
where
    F: FnOnce(&[NormalizedMessage]) -> T + Send + 'static,
    T: Send + 'static,
{
    let messages = Arc::clone(messages);
    tokio::task::spawn_blocking(move || f(&messages))
}

/// Normalize `rows` in chunks of `batch_size`, preserving input order.
///
/// Each chunk runs on the blocking pool; handles are awaited in chunk order
/// and the per-chunk diagnostics summed.
pub async fn ingest(
    normalizer: &MessageNormalizer,
    rows: Vec<RawMessageRecord>,
    batch_size: usize,
) -> Result<(Vec<NormalizedMessage>, IngestDiagnostics)> {
    let rows: Arc<[RawMessageRecord]> = rows.into();
    let handles: Vec<JoinHandle<_>> = chunk_ranges(rows.len(), batch_size)
        .map(|range| {
            let rows = Arc::clone(&rows);
            let normalizer = normalizer.clone();
            tokio::task::spawn_blocking(move || normalizer.normalize_batch(&rows[range]))
        })
        .collect();

    let mut messages = Vec::with_capacity(rows.len());
    let mut diagnostics = IngestDiagnostics::default();
    for handle in handles {
        let (batch, batch_diagnostics) = handle.await?;
        messages.extend(batch);
        diagnostics.merge(batch_diagnostics);
    }

    debug_assert_eq!(messages.len(), diagnostics.messages_accepted);
    if messages.windows(2).any(|pair| pair[1].instant < pair[0].instant) {
        warn!("Source rows are out of timestamp order");
    }

    Ok((messages, diagnostics))
}

fn chunk_ranges(len: usize, batch_size: usize) -> impl Iterator<Item = Range<usize>> {
    let step = batch_size.max(1);
    (0..len).step_by(step).map(move |start| start..(start + step).min(len))
}

/// Source to report
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: MessageNormalizer,
    analyzer: Analyzer,
    batch_size: usize,
    metrics: MetricsCollector,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(MessageNormalizer::default(), Analyzer::default())
    }
}

impl From<&AppConfig> for Pipeline {
    fn from(config: &AppConfig) -> Self {
        let normalizer = MessageNormalizer::default()
            .with_reaction_filter(config.ingest.reaction_filter)
            .with_utc_offset(config.ingest.utc_offset());
        Self::new(normalizer, Analyzer::from(&config.analysis)).with_batch_size(config.ingest.batch_size)
    }
}

impl Pipeline {
    /// Pipeline with the default batch size
    #[must_use]
    pub fn new(normalizer: MessageNormalizer, analyzer: Analyzer) -> Self {
        Self {
            normalizer,
            analyzer,
            batch_size: DEFAULT_BATCH_SIZE,
            metrics: MetricsCollector::default(),
        }
    }

    /// Rows per ingest chunk; zero is treated as one
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Load, normalize and analyze.
    ///
    /// Only a source failure aborts the run; per-row problems end up in the
    /// report's diagnostics.
    pub async fn run(
        &self,
        source: &dyn MessageSource,
        filter: SenderFilter,
        now: DateTime<Utc>,
    ) -> Result<AnalysisReport> {
        let timer = OperationTimer::new("load");
        let rows = match source.load(filter).await {
            Ok(rows) => rows,
            Err(e) => {
                self.metrics.record_error("source");
                return Err(e);
            },
        };
        self.metrics.record_stage("load", timer.finish());

        let timer = OperationTimer::new("ingest");
        let (messages, diagnostics) = ingest(&self.normalizer, rows, self.batch_size).await?;
        self.metrics.record_stage("ingest", timer.finish());
        self.metrics.record_ingest(&diagnostics);
        info!(
            rows = diagnostics.rows_read,
            accepted = diagnostics.messages_accepted,
            dropped = diagnostics.dropped(),
            "Ingest complete"
        );

        let timer = OperationTimer::new("analysis");
        let mut report = self.analyzer.analyze_concurrent(messages.into(), now).await?;
        self.metrics.record_stage("analysis", timer.finish());

        report.filter = filter;
        report.diagnostics = diagnostics;
        Ok(report)
    }
}

/// Runs analyses where only the most recent submission counts.
///
/// Submitting a new run aborts the one in flight; a run that finishes after
/// being superseded yields `None`.
pub struct AnalysisSession {
    pipeline: Arc<Pipeline>,
    source: Arc<dyn MessageSource>,
    generation: Arc<AtomicU64>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("pipeline", &self.pipeline)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// A submitted run
#[derive(Debug)]
pub struct PendingRun {
    generation: u64,
    latest: Arc<AtomicU64>,
    handle: JoinHandle<Result<AnalysisReport>>,
}

impl PendingRun {
    /// Generation number of this run
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the report; `None` when the run was superseded
    pub async fn result(self) -> Result<Option<AnalysisReport>> {
        match self.handle.await {
            Ok(outcome) => {
                let report = outcome?;
                let current = self.latest.load(Ordering::SeqCst) == self.generation;
                Ok(current.then_some(report))
            },
            Err(e) if e.is_cancelled() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl AnalysisSession {
    /// A session running `pipeline` over `source`
    #[must_use]
    pub fn new(pipeline: Pipeline, source: Arc<dyn MessageSource>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            source,
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
        }
    }

    /// Start a run for `filter`, discarding any run still in flight
    ///
    /// Generation numbering, spawning and replacing the in-flight handle all
    /// happen under one lock, so concurrent submissions are totally ordered
    /// and the highest generation is the one left running.
    pub fn submit(&self, filter: SenderFilter, now: DateTime<Utc>) -> PendingRun {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let pipeline = Arc::clone(&self.pipeline);
        let source = Arc::clone(&self.source);
        let handle =
            tokio::spawn(async move { pipeline.run(source.as_ref(), filter, now).await });

        if let Some(previous) = in_flight.replace(handle.abort_handle()) {
            previous.abort();
            info!(generation, "Superseded previous analysis run");
        }

        PendingRun {
            generation,
            latest: Arc::clone(&self.generation),
            handle,
        }
    }
}
