//! Request-scoped types for the query pipeline.

use serde::{Deserialize, Serialize};

use crate::temporal::TemporalRange;

/// Context handed to the synthesis gateway for one question.
///
/// Built once per request and discarded after synthesis; carries no
/// identity beyond a single `process` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryContext {
    /// The question as asked.
    pub question: String,
    /// Resolved temporal range, absent when the question carries none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<TemporalRange>,
    /// The range rendered as a SQL `BETWEEN` predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_sql: Option<String>,
}

impl QueryContext {
    pub fn new(question: impl Into<String>, range: Option<TemporalRange>) -> Self {
        let range_sql = range.as_ref().map(|r| r.sql_predicate());
        Self {
            question: question.into(),
            range,
            range_sql,
        }
    }
}
