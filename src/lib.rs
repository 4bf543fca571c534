//! Tally: natural-language analytics over video-content metrics.
//!
//! Answers free-form questions about video metrics by resolving any
//! temporal expression in the question, synthesizing a SQL statement
//! through an LLM-backed gateway, executing it as a scalar query against
//! the analytics store, and formatting the result for display. The
//! pipeline is total: every failure converges to a descriptive answer
//! string.

pub mod config;
pub mod error;
pub mod query;
pub mod store;
pub mod synthesis;
pub mod temporal;

pub use config::{Config, DatabaseConfig, SynthesisConfig};
pub use error::{ConfigError, Result, StorageError, SynthesisError, TallyError};
pub use query::{format_scalar, QueryContext, QueryPipeline};
pub use store::{AnalyticsStore, LoadReport, ScalarExecutor, ScalarValue, SnapshotRecord, VideoRecord};
pub use synthesis::{LlmSynthesizer, SqlSynthesizer};
pub use temporal::{TemporalRange, TemporalResolver};
