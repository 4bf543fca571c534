//! The query orchestration pipeline.

use std::sync::Arc;

use tracing::{debug, error};

use crate::store::ScalarExecutor;
use crate::synthesis::SqlSynthesizer;
use crate::temporal::TemporalResolver;

use super::format::format_scalar;
use super::types::QueryContext;

/// Sequences resolver, synthesis gateway, executor and formatter for one
/// question.
///
/// [`QueryPipeline::process`] is total: every internal failure converges to
/// a descriptive answer string naming the failing stage, so exactly one
/// string is produced per question and nothing escapes to the caller. No
/// stage retries; a failure terminates the request's pipeline immediately.
pub struct QueryPipeline {
    resolver: TemporalResolver,
    synthesizer: Arc<dyn SqlSynthesizer>,
    executor: Arc<dyn ScalarExecutor>,
}

impl QueryPipeline {
    /// Pipeline over explicit collaborators; constructed once at startup
    /// and shared across requests.
    pub fn new(synthesizer: Arc<dyn SqlSynthesizer>, executor: Arc<dyn ScalarExecutor>) -> Self {
        Self {
            resolver: TemporalResolver::new(),
            synthesizer,
            executor,
        }
    }

    /// Replace the resolver, used by tests to pin the reference date.
    pub fn with_resolver(mut self, resolver: TemporalResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Answer one question.
    pub async fn process(&self, question: &str) -> String {
        let context = QueryContext::new(question, self.resolver.resolve(question));
        match context.range_sql.as_deref() {
            Some(sql) => debug!(range = %sql, "resolved temporal context"),
            None => debug!("no temporal context in question"),
        }

        let statement = match self.synthesizer.synthesize(&context).await {
            Ok(Some(statement)) => statement,
            Ok(None) => {
                error!(question, "synthesis produced no statement");
                return "Could not synthesize a query for this question".to_string();
            }
            Err(e) => {
                error!(error = %e, "synthesis failed");
                return format!("Query synthesis failed: {e}");
            }
        };
        debug!(statement = %statement, "synthesized statement");

        let value = match self.executor.execute_scalar(&statement).await {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "statement execution failed");
                return format!("Query execution failed: {e}");
            }
        };

        format_scalar(&value)
    }
}
