//! PDF ingestion: load, split, embed and upsert
//!
//! Batches are embedded and stored concurrently, bounded by a semaphore.
//! The first failing batch aborts the run.

use futures::future::try_join_all;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

use super::chunker::TextSplitter;
use super::loader::PdfLoader;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, Document, VectorRecord};

/// Progress after a batch has been stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestProgress {
    pub batches_done: usize,
    pub batches_total: usize,
    pub records_done: usize,
}

/// Callback invoked from inside the pipeline after each stored batch
pub type ProgressFn = Arc<dyn Fn(IngestProgress) + Send + Sync>;

/// Outcome of a successful ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Pages (or whole-file documents) loaded
    pub documents: usize,
    /// Chunks produced by the splitter, blank ones included
    pub chunks: usize,
    pub skipped_blank: usize,
    pub records_upserted: usize,
    pub batches: usize,
    pub elapsed_ms: u64,
}

/// Ingestion pipeline into one namespace of a vector store
pub struct IngestPipeline {
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    namespace: String,
    max_concurrency: usize,
    batch_size: usize,
    progress: Option<ProgressFn>,
}

impl IngestPipeline {
    /// Create a pipeline from config
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Result<Self> {
        Ok(Self {
            splitter: TextSplitter::from_config(&config.chunking)?,
            embedder,
            store,
            namespace: config.vector_db.namespace.clone(),
            max_concurrency: config.processing.max_concurrency.max(1),
            batch_size: config.processing.upsert_batch_size.max(1),
            progress: None,
        })
    }

    /// Report progress after each stored batch
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Load the PDF at `path` and ingest it
    pub async fn run(&self, path: impl AsRef<Path>) -> Result<IngestReport> {
        let path = path.as_ref();
        tracing::info!("Loading PDF: {}", path.display());

        let documents = PdfLoader::load(path).await?;
        tracing::info!("Loaded {} page(s)", documents.len());

        self.ingest_documents(&documents).await
    }

    /// Split, embed and upsert already loaded documents
    pub async fn ingest_documents(&self, documents: &[Document]) -> Result<IngestReport> {
        let start = Instant::now();

        let chunks = self.splitter.split_documents(documents);
        let total_chunks = chunks.len();
        let chunks: Vec<Chunk> = chunks.into_iter().filter(|c| !c.is_blank()).collect();
        let skipped_blank = total_chunks - chunks.len();

        tracing::info!(
            "Split into {} chunks ({} blank skipped)",
            total_chunks,
            skipped_blank
        );

        let batches: Vec<&[Chunk]> = chunks.chunks(self.batch_size).collect();
        let batches_total = batches.len();

        if batches_total == 0 {
            tracing::warn!("No text to embed; nothing was stored");
        }

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let batches_done = AtomicUsize::new(0);
        let records_done = AtomicUsize::new(0);

        let batch_futures = batches.into_iter().enumerate().map(|(index, batch)| {
            let semaphore = semaphore.clone();
            let batches_done = &batches_done;
            let records_done = &records_done;

            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|e| Error::internal(format!("Semaphore closed: {}", e)))?;

                let written = self.store_batch(batch).await.map_err(|e| {
                    tracing::error!("Batch {}/{} failed: {}", index + 1, batches_total, e);
                    e
                })?;

                let done = batches_done.fetch_add(1, Ordering::SeqCst) + 1;
                let records = records_done.fetch_add(written, Ordering::SeqCst) + written;
                tracing::debug!("Stored batch {}/{} ({} records)", done, batches_total, written);

                if let Some(progress) = &self.progress {
                    progress(IngestProgress {
                        batches_done: done,
                        batches_total,
                        records_done: records,
                    });
                }

                Ok::<usize, Error>(written)
            }
        });

        let written = try_join_all(batch_futures).await?;

        let report = IngestReport {
            documents: documents.len(),
            chunks: total_chunks,
            skipped_blank,
            records_upserted: written.iter().sum(),
            batches: batches_total,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Stored {} records in {} batches into namespace '{}' ({}ms)",
            report.records_upserted,
            report.batches,
            self.namespace,
            report.elapsed_ms
        );

        Ok(report)
    }

    /// Embed one batch, then upsert it; nothing is written if embedding fails
    async fn store_batch(&self, batch: &[Chunk]) -> Result<usize> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != batch.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                batch.len()
            )));
        }

        let records: Vec<VectorRecord> = batch
            .iter()
            .zip(embeddings)
            .map(|(chunk, values)| VectorRecord::from_chunk(chunk, values))
            .collect();

        self.store.upsert(&self.namespace, &records).await
    }
}
