//! Text embeddings for routing and FAQ retrieval
//!
//! Two backends share the [`Embedder`] trait:
//! - [`OpenAIEmbedder`]: hosted embeddings via async-openai
//! - [`HashEmbedder`]: deterministic token hashing, no network needed

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::{CreateEmbeddingRequestArgs, EmbeddingInput},
    Client as OpenAIClient,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::{Config, EmbeddingBackend};
use crate::{Error, Result};

const MAX_INPUT_CHARS: usize = 8000;

/// Maps text to fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed many texts, one vector per input in the same order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingError("No embedding returned".to_string()))
    }

    fn dimension(&self) -> usize;
}

/// OpenAI embeddings service.
pub struct OpenAIEmbedder {
    client: OpenAIClient<OpenAIConfig>,
    model: String,
}

impl OpenAIEmbedder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is empty".to_string()));
        }

        let config = OpenAIConfig::new().with_api_key(api_key);
        Ok(Self {
            client: OpenAIClient::with_config(config),
            model: model.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let processed: Vec<String> = texts
            .iter()
            .map(|t| truncate_chars(t.trim(), MAX_INPUT_CHARS))
            .filter(|t| !t.is_empty())
            .collect();

        // Blank inputs embed to the zero vector, which matches nothing
        if processed.is_empty() {
            return Ok(vec![vec![0.0; self.dimension()]; texts.len()]);
        }

        debug!(count = processed.len(), model = %self.model, "Requesting embeddings");

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(processed))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        debug!(
            "Generated {} embeddings, tokens used: {}",
            response.data.len(),
            response.usage.total_tokens
        );

        let mut result = Vec::with_capacity(texts.len());
        let mut embed_iter = response.data.into_iter();

        for text in texts {
            if text.trim().is_empty() {
                result.push(vec![0.0; self.dimension()]);
            } else {
                let embed = embed_iter.next().ok_or_else(|| {
                    Error::EmbeddingError("Fewer embeddings returned than requested".to_string())
                })?;
                result.push(embed.embedding);
            }
        }

        Ok(result)
    }

    fn dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }
}

/// Deterministic bag-of-tokens embedder.
///
/// Tokens are lowercased alphanumeric runs hashed into `dim` buckets, then
/// the vector is scaled to unit length.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dim];
        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let idx = (hasher.finish() as usize) % self.dim;
            vec[idx] += 1.0;
        }

        normalize(&mut vec);
        vec
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// Pick the embedding backend the configuration asks for.
pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>> {
    match config.embedding_backend {
        EmbeddingBackend::Local => {
            info!(dim = config.embedding_dim, "Using local hash embeddings");
            Ok(Arc::new(HashEmbedder::new(config.embedding_dim)))
        }
        EmbeddingBackend::OpenAi => {
            let key = config.openai_api_key.clone().ok_or_else(|| {
                Error::Config("EMBEDDING_BACKEND=openai requires OPENAI_API_KEY".to_string())
            })?;
            info!(model = %config.embedding_model, "Using OpenAI embeddings");
            Ok(Arc::new(OpenAIEmbedder::new(key, &config.embedding_model)?))
        }
        EmbeddingBackend::Auto => match config.openai_api_key.as_deref() {
            Some(key) => {
                info!(model = %config.embedding_model, "Using OpenAI embeddings");
                Ok(Arc::new(OpenAIEmbedder::new(key, &config.embedding_model)?))
            }
            None => {
                warn!("OPENAI_API_KEY not set, falling back to local hash embeddings");
                Ok(Arc::new(HashEmbedder::new(config.embedding_dim)))
            }
        },
    }
}

/// Cosine similarity; 0.0 for empty, mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || b.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

pub fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vec.iter_mut() {
            *v /= norm;
        }
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_handles_edge_cases() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[0.0, 0.0]), 0.0);

        let aligned = cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]);
        assert!((aligned - 1.0).abs() < 1e-6);

        let orthogonal = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]);
        assert!(orthogonal.abs() < 1e-6);
    }

    #[test]
    fn normalize_scales_vector_to_unit_length() {
        let mut vec = vec![3.0, 4.0];
        normalize(&mut vec);
        let norm = (vec[0].powi(2) + vec[1].powi(2)).sqrt();

        assert!((norm - 1.0).abs() < 1e-6);
        assert!(vec[1] > vec[0]);
    }

    #[test]
    fn normalize_zero_vector() {
        let mut vec = vec![0.0, 0.0, 0.0];
        normalize(&mut vec);
        assert!(vec.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn hash_embedder_is_deterministic_and_case_insensitive() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_text("Nike running shoes");
        let b = embedder.embed_text("nike RUNNING shoes");

        assert_eq!(a.len(), 64);
        assert_eq!(a, b);
    }

    #[test]
    fn hash_embedder_ignores_punctuation() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_text("refund policy?");
        let b = embedder.embed_text("refund, policy");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hash_embedder_enforces_minimum_dimension() {
        assert_eq!(HashEmbedder::new(2).dimension(), 8);
    }

    #[test]
    fn hash_embedder_blank_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        assert!(embedder.embed_text("  ?! ").iter().all(|&v| v == 0.0));
    }

    #[tokio::test]
    async fn hash_embedder_batch_preserves_order() {
        let embedder = HashEmbedder::new(32);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let batch = embedder.embed_batch(&texts).await.unwrap();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], embedder.embed_text("alpha"));
        assert_eq!(batch[1], embedder.embed("beta").await.unwrap());
    }

    #[test]
    fn openai_embedder_rejects_empty_key() {
        assert!(OpenAIEmbedder::new("", "text-embedding-3-small").is_err());
    }

    #[test]
    fn openai_dimension_follows_model() {
        let small = OpenAIEmbedder::new("key", "text-embedding-3-small").unwrap();
        let large = OpenAIEmbedder::new("key", "text-embedding-3-large").unwrap();

        assert_eq!(small.dimension(), 1536);
        assert_eq!(large.dimension(), 3072);
        assert_eq!(large.model(), "text-embedding-3-large");
    }

    #[tokio::test]
    async fn openai_blank_batch_short_circuits() {
        let embedder = OpenAIEmbedder::new("key", "text-embedding-3-small").unwrap();
        let out = embedder
            .embed_batch(&["   ".to_string(), "\n".to_string()])
            .await
            .unwrap();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.len() == 1536 && v.iter().all(|&x| x == 0.0)));
    }

    #[test]
    fn truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[test]
    fn build_embedder_local_uses_configured_dimension() {
        let mut config = Config::from_env();
        config.embedding_backend = EmbeddingBackend::Local;
        config.embedding_dim = 96;

        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 96);
    }

    #[test]
    fn build_embedder_auto_without_key_falls_back_to_local() {
        let mut config = Config::from_env();
        config.embedding_backend = EmbeddingBackend::Auto;
        config.openai_api_key = None;
        config.embedding_dim = 48;

        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.dimension(), 48);
    }

    #[test]
    fn build_embedder_openai_requires_key() {
        let mut config = Config::from_env();
        config.embedding_backend = EmbeddingBackend::OpenAi;
        config.openai_api_key = None;

        assert!(build_embedder(&config).is_err());
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY
    async fn live_openai_embedding_has_model_dimension() {
        dotenvy::dotenv().ok();
        let key = std::env::var("OPENAI_API_KEY").unwrap();
        let embedder = OpenAIEmbedder::new(key, "text-embedding-3-small").unwrap();
        let vector = embedder.embed("What is the return policy?").await.unwrap();
        assert_eq!(vector.len(), embedder.dimension());
    }
}

