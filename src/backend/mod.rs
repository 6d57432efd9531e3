use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::search::mapper::MappingOptions;
use crate::search::schema::{CollectionSchema, ConceptDocument, SearchRequest, SearchResults};
use crate::search::snapshot::SnapshotError;

pub mod manager;

pub use manager::{BackendFactory, BackendManager};

/// Backend error / 后端错误
#[derive(Debug, Error)]
pub enum BackendError {
    /// Swallowed by `recreate` during teardown / 集合不存在
    #[error("collection {0} not found")]
    CollectionNotFound(String),
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{backend} returned HTTP {status}: {message}")]
    Status {
        backend: &'static str,
        status: u16,
        message: String,
    },
    #[error("task {uid} failed ({code}): {message}")]
    TaskFailed {
        uid: u64,
        code: String,
        message: String,
    },
    #[error("timed out waiting for task {0}")]
    TaskTimeout(u64),
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("index file I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend capability declaration / 后端能力声明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    /// Documents per bulk write / 每批文档数
    pub batch_size: usize,
    /// Hits shown on the console / 控制台显示的结果数
    pub display_limit: usize,
}

impl Default for Capability {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            display_limit: 10,
        }
    }
}

/// Outcome of one bulk write / 批量写入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmitReport {
    pub indexed: usize,
    /// Documents the backend rejected individually / 单条被拒绝的文档
    pub failed: usize,
}

/// Search backend interface (provides only primitive operations) / 搜索后端接口
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name / 后端名称
    fn name(&self) -> &str;

    /// Backend capabilities / 后端能力
    fn capabilities(&self) -> Capability;

    /// Declared collection schema / 集合 Schema
    fn schema(&self) -> CollectionSchema;

    /// How raw records are mapped for this backend / 映射选项
    fn mapping_options(&self) -> MappingOptions;

    /// Drop the collection if present and create it again / 删除并重建集合
    async fn recreate(&self, schema: &CollectionSchema) -> Result<(), BackendError>;

    /// Bulk write; an empty batch is a no-op / 批量写入
    async fn submit(&self, batch: &[ConceptDocument]) -> Result<SubmitReport, BackendError>;

    /// Called once after the last batch / 导入结束
    async fn finish(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Search (primitive operation) / 搜索
    async fn search(&self, request: &SearchRequest) -> Result<SearchResults, BackendError>;
}

/// Run a teardown step, treating a missing collection as done / 忽略集合不存在错误
pub fn ignore_not_found(result: Result<(), BackendError>) -> Result<bool, BackendError> {
    match result {
        Ok(()) => Ok(true),
        Err(BackendError::CollectionNotFound(name)) => {
            tracing::debug!("Collection {} did not exist", name);
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignore_not_found() {
        assert!(ignore_not_found(Ok(())).unwrap());
        assert!(!ignore_not_found(Err(BackendError::CollectionNotFound("test".into()))).unwrap());
        assert!(ignore_not_found(Err(BackendError::TaskTimeout(7))).is_err());
    }
}
