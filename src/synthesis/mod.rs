//! SQL statement synthesis.
//!
//! The gateway contract the pipeline depends on, plus an OpenAI-compatible
//! chat-completions client implementation. The semantics of synthesis are
//! the collaborator's business; only the input/output contract matters to
//! the core.

mod gateway;

pub use gateway::LlmSynthesizer;

use async_trait::async_trait;

use crate::error::Result;
use crate::query::QueryContext;

/// Turns a question plus temporal context into one executable statement.
#[async_trait]
pub trait SqlSynthesizer: Send + Sync {
    /// Exactly one statement with no surrounding formatting markers, or
    /// `None` when synthesis is not possible.
    async fn synthesize(&self, context: &QueryContext) -> Result<Option<String>>;
}
