//! Vector index abstraction for the FAQ corpus
//!
//! [`MemoryIndex`] keeps collections in process memory; [`QdrantIndex`]
//! stores them in a Qdrant server. Both rank by cosine similarity.

pub mod memory;
pub mod qdrant;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::Result;

pub use memory::MemoryIndex;
pub use qdrant::QdrantIndex;

/// Document plus embedding to store under a caller-chosen id.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub document: String,
    pub metadata: BTreeMap<String, String>,
    pub embedding: Vec<f32>,
}

impl IndexEntry {
    pub fn new(id: impl Into<String>, document: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
            metadata: BTreeMap::new(),
            embedding,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Search hit, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub document: String,
    pub metadata: BTreeMap<String, String>,
    pub score: f32,
}

/// Named collections of embedded documents.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create an empty collection; no-op when it already exists.
    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()>;

    /// Insert entries, replacing any with the same id.
    async fn add(&self, name: &str, entries: Vec<IndexEntry>) -> Result<usize>;

    /// Up to `k` nearest entries by cosine similarity.
    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<Vec<Neighbor>>;

    async fn count(&self, name: &str) -> Result<usize>;
}
