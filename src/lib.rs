//! Text History Analytics - Conversation analytics for Messages archives
//!
//! A Rust library that turns one conversation from a macOS Messages archive
//! into relationship analytics.
//!
//! # Features
//!
//! - Recover message text from serialized attributed-body payloads
//! - Conversation segmentation, activity heatmaps and weekly word volume
//! - Reply latency, double-texts and conversation enders
//! - Lexicon sentiment trend and emoji statistics
//! - Year-in-review summary, streaks, big days and milestones
//! - Topic mentions and inside jokes
//! - JSON or YAML reports with ingest diagnostics

/// Configuration management
pub mod config;
/// Payload text recovery
pub mod decoder;
/// Emoji statistics
pub mod emoji;
/// Error types
pub mod error;
/// Streaks, big days and first appearances
pub mod highlights;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and calendar helpers
pub mod models;
/// Word counting, sentiment lexicon and message classification
pub mod nlp;
/// Raw row to message normalization
pub mod normalizer;
/// Ingest and analysis orchestration
pub mod pipeline;
/// Report serialization
pub mod report_writer;
/// Reply latency and reply-ladder tallies
pub mod response;
/// chat.db schema definitions
pub mod schema;
/// Conversation segmentation
pub mod segmenter;
/// Weekly sentiment trend
pub mod sentiment;
/// Message sources
pub mod source;
/// Heatmap and weekly series
pub mod timeseries;
/// Topics and inside jokes
pub mod topics;
/// Numeric helpers
pub mod utils;
/// Input validation
pub mod validation;
/// Year-in-review summary
pub mod wrapped;

// Re-export key components for easier access
pub use error::{AnalysisError, Result};
pub use models::{NormalizedMessage, RawMessageRecord, Sender, SenderFilter};
pub use normalizer::{IngestDiagnostics, MessageNormalizer};
pub use pipeline::{AnalysisReport, AnalysisSession, Analyzer, Pipeline};
pub use source::{ChatDbSource, InMemorySource, MessageSource};
