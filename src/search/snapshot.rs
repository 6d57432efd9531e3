//! Index snapshot - the whole index in one JSON file / 索引快照
//!
//! Written once after a full import, loaded back wholesale for searching.
//! Not incrementally updatable: a new import always rewrites the file.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::engine::{IndexData, IndexOptions, SearchEngine};

/// Snapshot format version / 快照格式版本
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("index file {0} not found, run `create` first")]
    Missing(String),
    #[error("index file {path} has version {found}, expected {}", SNAPSHOT_VERSION)]
    Version { path: String, found: u32 },
    #[error("index file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("index file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    created_at: DateTime<Utc>,
    document_count: usize,
    data: IndexData,
}

/// Write the engine state to `path` / 保存索引
pub fn save(engine: &SearchEngine, path: &Path) -> Result<usize, SnapshotError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let snapshot = Snapshot {
        version: SNAPSHOT_VERSION,
        created_at: Utc::now(),
        document_count: engine.document_count(),
        data: engine.data(),
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(64 * 1024, file); // 64KB缓冲
    serde_json::to_writer(&mut writer, &snapshot)?;
    writer.flush()?;

    tracing::info!("Index written to {:?} ({} documents)", path, snapshot.document_count);
    Ok(snapshot.document_count)
}

/// Load the engine state from `path` / 加载索引
pub fn load(path: &Path, options: IndexOptions) -> Result<SearchEngine, SnapshotError> {
    if !path.exists() {
        return Err(SnapshotError::Missing(path.display().to_string()));
    }

    let file = File::open(path)?;
    let reader = BufReader::with_capacity(256 * 1024, file);
    let snapshot: Snapshot = serde_json::from_reader(reader)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::Version {
            path: path.display().to_string(),
            found: snapshot.version,
        });
    }

    tracing::debug!(
        "Index snapshot from {} with {} documents",
        snapshot.created_at.to_rfc3339(),
        snapshot.document_count
    );
    Ok(SearchEngine::from_data(options, snapshot.data))
}
