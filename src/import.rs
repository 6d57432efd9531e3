//! Batch importer - record stream to backend / 批量导入
//!
//! Recreates the collection, maps every record, and submits documents in
//! batches of the backend's batch size. The trailing partial batch is always
//! submitted, even when empty.

use anyhow::{Context, Result};
use futures::StreamExt;

use crate::backend::SearchBackend;
use crate::search::mapper::DocumentMapper;
use crate::search::schema::ConceptDocument;
use crate::source::RecordStream;
use crate::utils::Stopwatch;

/// Import statistics / 导入统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Records read from the source / 读取的记录数
    pub read: usize,
    /// Records without URI or preferred label / 跳过的记录
    pub skipped: usize,
    /// Records whose fields had the wrong shape / 格式错误的记录
    pub invalid: usize,
    /// Documents sent to the backend / 提交的文档数
    pub submitted: usize,
    /// Documents the backend accepted / 已索引
    pub indexed: usize,
    /// Documents the backend rejected / 被拒绝
    pub failed: usize,
    /// Submission calls, including the trailing one / 提交次数
    pub batches: usize,
}

pub struct Importer<'a> {
    backend: &'a dyn SearchBackend,
    mapper: DocumentMapper,
    batch_size: usize,
}

impl<'a> Importer<'a> {
    pub fn new(backend: &'a dyn SearchBackend) -> Self {
        Self {
            mapper: DocumentMapper::new(backend.mapping_options()),
            batch_size: backend.capabilities().batch_size.max(1),
            backend,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run the import / 执行导入
    pub async fn run(&self, mut records: RecordStream) -> Result<ImportStats> {
        let stopwatch = Stopwatch::start("indexing");
        let schema = self.backend.schema();
        self.backend
            .recreate(&schema)
            .await
            .with_context(|| format!("failed to recreate {}", schema.name))?;

        let mut stats = ImportStats::default();
        let mut batch: Vec<ConceptDocument> = Vec::with_capacity(self.batch_size);

        while let Some(record) = records.next().await {
            let record = record.context("failed to read records")?;
            stats.read += 1;

            match self.mapper.map(&record) {
                Ok(Some(doc)) => batch.push(doc),
                Ok(None) => stats.skipped += 1,
                Err(e) => {
                    tracing::warn!("Skipping record {}: {}", stats.read, e);
                    stats.invalid += 1;
                }
            }

            if batch.len() >= self.batch_size {
                self.flush(&mut batch, &mut stats).await?;
            }
        }

        // Remaining batch / 写入剩余批次
        self.flush(&mut batch, &mut stats).await?;
        self.backend
            .finish()
            .await
            .with_context(|| format!("failed to finish {}", schema.name))?;

        stopwatch.finish();
        tracing::info!(
            "Import done: {} read, {} indexed, {} skipped, {} invalid, {} rejected",
            stats.read,
            stats.indexed,
            stats.skipped,
            stats.invalid,
            stats.failed
        );
        Ok(stats)
    }

    async fn flush(&self, batch: &mut Vec<ConceptDocument>, stats: &mut ImportStats) -> Result<()> {
        let report = self
            .backend
            .submit(batch)
            .await
            .with_context(|| format!("failed to submit batch {}", stats.batches + 1))?;

        stats.batches += 1;
        stats.submitted += batch.len();
        stats.indexed += report.indexed;
        stats.failed += report.failed;
        tracing::info!("- {} documents imported.", stats.submitted);
        batch.clear();
        Ok(())
    }
}
