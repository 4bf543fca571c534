//! Bulk loader for video metric exports.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Transaction};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Result, StorageError};

use super::database::AnalyticsStore;

/// Exports arrive either as `{"videos": [...]}` or as a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VideoExport {
    Wrapped { videos: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl VideoExport {
    fn into_records(self) -> Vec<serde_json::Value> {
        match self {
            Self::Wrapped { videos } => videos,
            Self::Bare(videos) => videos,
        }
    }
}

/// One video record in an export.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub creator_id: String,
    pub video_created_at: String,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub reports_count: i64,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub snapshots: Vec<SnapshotRecord>,
}

/// One time-stamped counter snapshot of a video.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotRecord {
    pub id: String,
    #[serde(default)]
    pub views_count: i64,
    #[serde(default)]
    pub likes_count: i64,
    #[serde(default)]
    pub comments_count: i64,
    #[serde(default)]
    pub reports_count: i64,
    #[serde(default)]
    pub delta_views_count: i64,
    #[serde(default)]
    pub delta_likes_count: i64,
    #[serde(default)]
    pub delta_comments_count: i64,
    #[serde(default)]
    pub delta_reports_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Counts of rows written by a bulk load.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadReport {
    pub videos: usize,
    pub snapshots: usize,
}

/// Timestamps arrive with assorted timezone suffixes; the store keeps them
/// naive, normalized at ingestion.
fn parse_naive_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.strip_suffix('Z').unwrap_or(raw);
    let trimmed = trimmed.split('+').next().unwrap_or(trimmed);
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok()
}

fn stored_timestamp(raw: &str, field: &str) -> std::result::Result<String, StorageError> {
    parse_naive_timestamp(raw)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .ok_or_else(|| StorageError::Load(format!("unparseable {field} timestamp: {raw}")))
}

fn insert_video(
    tx: &Transaction,
    video: &VideoRecord,
) -> std::result::Result<usize, StorageError> {
    tx.execute(
        "INSERT INTO videos (
            id, creator_id, video_created_at,
            views_count, likes_count, comments_count, reports_count,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            video.id,
            video.creator_id,
            stored_timestamp(&video.video_created_at, "video_created_at")?,
            video.views_count,
            video.likes_count,
            video.comments_count,
            video.reports_count,
            stored_timestamp(&video.created_at, "created_at")?,
            stored_timestamp(&video.updated_at, "updated_at")?,
        ],
    )
    .map_err(|e| StorageError::Load(e.to_string()))?;

    for snapshot in &video.snapshots {
        tx.execute(
            "INSERT INTO video_snapshots (
                id, video_id,
                views_count, likes_count, comments_count, reports_count,
                delta_views_count, delta_likes_count,
                delta_comments_count, delta_reports_count,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                snapshot.id,
                video.id,
                snapshot.views_count,
                snapshot.likes_count,
                snapshot.comments_count,
                snapshot.reports_count,
                snapshot.delta_views_count,
                snapshot.delta_likes_count,
                snapshot.delta_comments_count,
                snapshot.delta_reports_count,
                stored_timestamp(&snapshot.created_at, "created_at")?,
                stored_timestamp(&snapshot.updated_at, "updated_at")?,
            ],
        )
        .map_err(|e| StorageError::Load(e.to_string()))?;
    }

    Ok(video.snapshots.len())
}

impl AnalyticsStore {
    /// Load a JSON export from disk, replacing existing rows.
    pub fn load_json(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StorageError::Io)?;
        let export: VideoExport = serde_json::from_str(&content)
            .map_err(|e| StorageError::Load(format!("invalid export JSON: {e}")))?;

        let mut videos = Vec::new();
        for value in export.into_records() {
            match serde_json::from_value::<VideoRecord>(value) {
                Ok(record) => videos.push(record),
                Err(e) => warn!(error = %e, "skipping malformed video record"),
            }
        }
        self.load_records(videos)
    }

    /// Load parsed records, replacing existing rows in one transaction.
    /// A record that fails to insert is skipped with a warning rather than
    /// aborting the load.
    pub fn load_records(&self, videos: Vec<VideoRecord>) -> Result<LoadReport> {
        let conn = self.connection();
        let mut conn = conn.lock().expect("analytics store mutex poisoned");
        let tx = conn
            .transaction()
            .map_err(|e| StorageError::Load(e.to_string()))?;

        tx.execute("DELETE FROM video_snapshots", [])
            .map_err(|e| StorageError::Load(e.to_string()))?;
        tx.execute("DELETE FROM videos", [])
            .map_err(|e| StorageError::Load(e.to_string()))?;

        let mut report = LoadReport::default();
        for video in &videos {
            match insert_video(&tx, video) {
                Ok(snapshots) => {
                    report.videos += 1;
                    report.snapshots += snapshots;
                }
                Err(e) => warn!(video = %video.id, error = %e, "skipping video record"),
            }
        }

        tx.commit().map_err(|e| StorageError::Load(e.to_string()))?;
        info!(
            videos = report.videos,
            snapshots = report.snapshots,
            "bulk load complete"
        );
        Ok(report)
    }
}
