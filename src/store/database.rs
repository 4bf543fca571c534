//! SQLite-backed analytics store and scalar execution.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::error::{Result, StorageError};

/// A single aggregate value produced by an analytics statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<Value> for ScalarValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Integer(n) => Self::Integer(n),
            Value::Real(x) => Self::Real(x),
            Value::Text(s) => Self::Text(s),
            Value::Blob(b) => Self::Text(format!("<{} bytes>", b.len())),
        }
    }
}

/// Executes one synthesized statement as a scalar query.
#[async_trait]
pub trait ScalarExecutor: Send + Sync {
    /// Run `statement` and return the first column of the first row, or
    /// `Null` when the statement produces no rows. Fails on malformed
    /// statements and connectivity problems.
    async fn execute_scalar(&self, statement: &str) -> Result<ScalarValue>;
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS videos (
    id TEXT PRIMARY KEY,
    creator_id TEXT NOT NULL,
    video_created_at TEXT NOT NULL,
    views_count INTEGER NOT NULL DEFAULT 0,
    likes_count INTEGER NOT NULL DEFAULT 0,
    comments_count INTEGER NOT NULL DEFAULT 0,
    reports_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS video_snapshots (
    id TEXT PRIMARY KEY,
    video_id TEXT NOT NULL REFERENCES videos(id),
    views_count INTEGER NOT NULL DEFAULT 0,
    likes_count INTEGER NOT NULL DEFAULT 0,
    comments_count INTEGER NOT NULL DEFAULT 0,
    reports_count INTEGER NOT NULL DEFAULT 0,
    delta_views_count INTEGER NOT NULL DEFAULT 0,
    delta_likes_count INTEGER NOT NULL DEFAULT 0,
    delta_comments_count INTEGER NOT NULL DEFAULT 0,
    delta_reports_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_video_snapshots_video_id ON video_snapshots(video_id);
CREATE INDEX IF NOT EXISTS idx_video_snapshots_created_at ON video_snapshots(created_at);
";

/// SQLite-backed analytics store.
///
/// The connection is acquired per statement and released on every exit
/// path; blocking rusqlite calls run on the blocking thread pool so only
/// the requesting task suspends.
pub struct AnalyticsStore {
    conn: Arc<Mutex<Connection>>,
}

impl AnalyticsStore {
    /// Open (or create) the store at `path` and ensure the schema exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
            }
        }
        let conn =
            Connection::open(path).map_err(|e| StorageError::Open(e.to_string()))?;
        Self::init(conn)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Open(e.to_string()))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // WAL keeps concurrent readers unblocked; a no-op for :memory:.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.execute_batch(SCHEMA)
            .map_err(|e| StorageError::Open(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}

fn run_scalar(
    conn: &Mutex<Connection>,
    statement: &str,
) -> std::result::Result<ScalarValue, StorageError> {
    let conn = conn.lock().expect("analytics store mutex poisoned");
    let mut stmt = conn
        .prepare(statement)
        .map_err(|e| StorageError::Query(e.to_string()))?;
    let mut rows = stmt
        .query([])
        .map_err(|e| StorageError::Query(e.to_string()))?;
    match rows.next().map_err(|e| StorageError::Query(e.to_string()))? {
        Some(row) => {
            let value: Value = row
                .get(0)
                .map_err(|e| StorageError::Query(e.to_string()))?;
            Ok(value.into())
        }
        None => Ok(ScalarValue::Null),
    }
}

#[async_trait]
impl ScalarExecutor for AnalyticsStore {
    async fn execute_scalar(&self, statement: &str) -> Result<ScalarValue> {
        let conn = self.conn.clone();
        let statement = statement.to_string();
        let value = tokio::task::spawn_blocking(move || run_scalar(&conn, &statement))
            .await
            .map_err(|e| StorageError::Query(format!("executor task failed: {e}")))?;
        Ok(value?)
    }
}
