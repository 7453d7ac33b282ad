//! Semantic search over FAQ questions

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::{load_faq_csv, FaqEntry, ANSWER_KEY};
use crate::embeddings::Embedder;
use crate::vector_db::{IndexEntry, VectorIndex};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Ingested(usize),
    AlreadyPresent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaqHit {
    pub question: String,
    pub answer: String,
    pub score: f32,
}

/// Retrieved answers joined into one context block.
pub fn build_context(hits: &[FaqHit]) -> String {
    hits.iter()
        .map(|h| h.answer.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct FaqRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
    source: PathBuf,
    ready: OnceCell<()>,
}

impl FaqRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        source: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
            source: source.into(),
            ready: OnceCell::new(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Load the CSV source into the index unless the collection already exists.
    pub async fn ingest(&self) -> Result<IngestOutcome> {
        if self.index.collection_exists(&self.collection).await? {
            // An empty collection is what a failed upsert leaves behind
            if self.index.count(&self.collection).await? > 0 {
                info!("Collection '{}' already exists", self.collection);
                return Ok(IngestOutcome::AlreadyPresent);
            }
            warn!("Collection '{}' exists but is empty, re-ingesting", self.collection);
        }

        info!(source = %self.source.display(), "Ingesting FAQ data");
        let entries = load_faq_csv(&self.source)?;
        self.ingest_entries(entries).await
    }

    /// Embed and store entries, creating the collection if needed.
    pub async fn ingest_entries(&self, entries: Vec<FaqEntry>) -> Result<IngestOutcome> {
        let questions: Vec<String> = entries.iter().map(|e| e.question.clone()).collect();
        let embeddings = self.embedder.embed_batch(&questions).await?;

        self.index
            .create_collection(&self.collection, self.embedder.dimension())
            .await?;

        let items: Vec<IndexEntry> = entries
            .into_iter()
            .zip(embeddings)
            .map(|(entry, embedding)| {
                IndexEntry::new(entry.id, entry.question, embedding)
                    .with_metadata(ANSWER_KEY, entry.answer)
            })
            .collect();

        let added = self.index.add(&self.collection, items).await?;
        info!(
            "FAQ data ingested into collection '{}': {} entries",
            self.collection, added
        );
        Ok(IngestOutcome::Ingested(added))
    }

    async fn ensure_ready(&self) -> Result<()> {
        self.ready
            .get_or_try_init(|| async { self.ingest().await.map(|_| ()) })
            .await?;
        Ok(())
    }

    /// Up to `k` entries whose questions are closest to `query`, best first.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<FaqHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        self.ensure_ready().await?;

        let embedding = self.embedder.embed(query).await?;
        let neighbors = self.index.query(&self.collection, &embedding, k).await?;

        let hits: Vec<FaqHit> = neighbors
            .into_iter()
            .map(|n| FaqHit {
                answer: n.metadata.get(ANSWER_KEY).cloned().unwrap_or_default(),
                question: n.document,
                score: n.score,
            })
            .collect();

        debug!(count = hits.len(), "FAQ hits retrieved");
        Ok(hits)
    }
}
