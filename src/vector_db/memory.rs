//! In-process vector index

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{IndexEntry, Neighbor, VectorIndex};
use crate::embeddings::cosine_similarity;
use crate::{Error, Result};

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// Brute-force cosine index; contents live as long as the process.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections.entry(name.to_string()).or_insert_with(|| {
            debug!(collection = name, dimension, "Creating in-memory collection");
            Collection {
                dimension,
                entries: Vec::new(),
            }
        });
        Ok(())
    }

    async fn add(&self, name: &str, entries: Vec<IndexEntry>) -> Result<usize> {
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| Error::VectorStoreError(format!("Unknown collection '{}'", name)))?;

        if let Some(bad) = entries
            .iter()
            .find(|e| e.embedding.len() != collection.dimension)
        {
            return Err(Error::VectorStoreError(format!(
                "Entry '{}' has dimension {}, collection '{}' expects {}",
                bad.id,
                bad.embedding.len(),
                name,
                collection.dimension
            )));
        }

        let added = entries.len();
        for entry in entries {
            match collection.entries.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry,
                None => collection.entries.push(entry),
            }
        }

        Ok(added)
    }

    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        let collections = self.collections.read().await;
        let collection = collections
            .get(name)
            .ok_or_else(|| Error::VectorStoreError(format!("Unknown collection '{}'", name)))?;

        let mut scored: Vec<Neighbor> = collection
            .entries
            .iter()
            .map(|e| Neighbor {
                id: e.id.clone(),
                document: e.document.clone(),
                metadata: e.metadata.clone(),
                score: cosine_similarity(embedding, &e.embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(k);
        Ok(scored)
    }

    async fn count(&self, name: &str) -> Result<usize> {
        Ok(self
            .collections
            .read()
            .await
            .get(name)
            .map(|c| c.entries.len())
            .unwrap_or(0))
    }
}
