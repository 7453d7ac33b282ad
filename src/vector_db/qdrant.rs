//! Qdrant-backed vector index

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use qdrant_client::qdrant::{
    value::Kind, CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use tracing::{debug, info};
use uuid::Uuid;

use super::{IndexEntry, Neighbor, VectorIndex};
use crate::{Error, Result};

const ID_KEY: &str = "id";
const DOCUMENT_KEY: &str = "document";
const METADATA_KEY: &str = "metadata";

/// Vector index stored in a Qdrant server.
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Connect to Qdrant server
    pub fn new(url: &str) -> Result<Self> {
        let client = Qdrant::from_url(url).build()?;
        Ok(Self { client })
    }
}

/// Qdrant ids must be integers or UUIDs; string ids map to a stable UUID.
pub fn point_id(id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string()
}

fn to_payload(entry: &IndexEntry) -> Result<HashMap<String, QdrantValue>> {
    let mut payload: HashMap<String, QdrantValue> = HashMap::new();
    payload.insert(ID_KEY.into(), entry.id.clone().into());
    payload.insert(DOCUMENT_KEY.into(), entry.document.clone().into());
    payload.insert(
        METADATA_KEY.into(),
        serde_json::to_string(&entry.metadata)?.into(),
    );
    Ok(payload)
}

fn string_field(payload: &HashMap<String, QdrantValue>, key: &str) -> Option<String> {
    match payload.get(key)?.kind.as_ref()? {
        Kind::StringValue(v) => Some(v.clone()),
        _ => None,
    }
}

fn from_payload(payload: &HashMap<String, QdrantValue>, score: f32) -> Option<Neighbor> {
    let metadata = string_field(payload, METADATA_KEY)
        .and_then(|raw| serde_json::from_str::<BTreeMap<String, String>>(&raw).ok())
        .unwrap_or_default();

    Some(Neighbor {
        id: string_field(payload, ID_KEY)?,
        document: string_field(payload, DOCUMENT_KEY)?,
        metadata,
        score,
    })
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.client.collection_exists(name).await?)
    }

    async fn create_collection(&self, name: &str, dimension: usize) -> Result<()> {
        if self.collection_exists(name).await? {
            debug!("Collection '{}' already exists", name);
            return Ok(());
        }

        info!("Creating collection '{}'", name);
        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(VectorParamsBuilder::new(dimension as u64, Distance::Cosine)),
            )
            .await?;
        Ok(())
    }

    async fn add(&self, name: &str, entries: Vec<IndexEntry>) -> Result<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let points = entries
            .iter()
            .map(|entry| {
                Ok(PointStruct::new(
                    point_id(&entry.id),
                    entry.embedding.clone(),
                    to_payload(entry)?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let count = points.len();
        debug!("Upserting {} points to Qdrant", count);

        self.client
            .upsert_points(UpsertPointsBuilder::new(name, points).wait(true))
            .await?;

        Ok(count)
    }

    async fn query(&self, name: &str, embedding: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(name, embedding.to_vec(), k as u64).with_payload(true),
            )
            .await?;

        Ok(results
            .result
            .into_iter()
            .filter_map(|point| from_payload(&point.payload, point.score))
            .collect())
    }

    async fn count(&self, name: &str) -> Result<usize> {
        if !self.collection_exists(name).await? {
            return Ok(0);
        }

        let info = self.client.collection_info(name).await?;
        let points = info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0);

        usize::try_from(points)
            .map_err(|_| Error::VectorStoreError(format!("Point count {} overflows", points)))
    }
}
