//! Configuration for the assistant
//!
//! Loads configuration from config.yml, `.env` and the process environment.
//! Environment variables take precedence over string values from the file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::router::Aggregation;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_FAQ_PATH: &str = "resources/faq_data.csv";
pub const DEFAULT_DB_PATH: &str = "db.sqlite";
pub const FAQ_COLLECTION: &str = "faqs";
pub const DEFAULT_FAQ_TOP_K: usize = 2;
pub const DEFAULT_ROUTE_TOP_K: usize = 5;
pub const FAQ_ROUTE_THRESHOLD: f32 = 0.20;
pub const DEFAULT_BASELINE_THRESHOLD: f32 = 0.0;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const SQL_MAX_TOKENS: u32 = 1024;
pub const NARRATION_MAX_TOKENS: u32 = 5024;
pub const LOCAL_EMBEDDING_DIM: usize = 384;

/// Which embedding service backs the router and the FAQ index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingBackend {
    /// OpenAI when `OPENAI_API_KEY` is available, local hashing otherwise
    #[default]
    Auto,
    OpenAi,
    Local,
}

impl EmbeddingBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "auto" | "" => Some(EmbeddingBackend::Auto),
            "openai" => Some(EmbeddingBackend::OpenAi),
            "local" | "hash" => Some(EmbeddingBackend::Local),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    llm: Option<LlmConfig>,
    embeddings: Option<EmbeddingsConfig>,
    faq: Option<FaqConfig>,
    products: Option<ProductsConfig>,
    router: Option<RouterConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    sql_max_tokens: Option<u32>,
    narration_max_tokens: Option<u32>,
    answer_max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddingsConfig {
    backend: Option<String>,
    model: Option<String>,
    dimension: Option<usize>,
    openai_api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FaqConfig {
    path: Option<String>,
    collection: Option<String>,
    top_k: Option<usize>,
    qdrant_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProductsConfig {
    db_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RouterConfig {
    faq_threshold: Option<f32>,
    sql_threshold: Option<f32>,
    baseline_threshold: Option<f32>,
    top_k: Option<usize>,
    aggregation: Option<String>,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub groq_base_url: String,
    pub model: String,
    pub temperature: f32,
    pub sql_max_tokens: u32,
    pub narration_max_tokens: u32,
    pub answer_max_tokens: Option<u32>,
    pub embedding_backend: EmbeddingBackend,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub openai_api_key: Option<String>,
    pub qdrant_url: Option<String>,
    pub faq_path: PathBuf,
    pub faq_collection: String,
    pub faq_top_k: usize,
    pub db_path: PathBuf,
    pub faq_threshold: Option<f32>,
    pub sql_threshold: Option<f32>,
    pub baseline_threshold: f32,
    pub route_top_k: usize,
    pub route_aggregation: Aggregation,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::from_env())
    }

    /// Defaults plus whatever the environment provides
    pub fn from_env() -> Self {
        Self::load_dotenv();
        Self::from_yaml(YamlConfig::default())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val).filter(|s| !s.trim().is_empty());
                }
                // Unresolved placeholder: fall through to the explicit key
                return std::env::var(env_key)
                    .ok()
                    .filter(|s| !s.trim().is_empty());
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            if !env_val.trim().is_empty() {
                return Some(env_val);
            }
        }
        value.filter(|s| !s.trim().is_empty())
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let llm = yaml.llm.unwrap_or_default();
        let embeddings = yaml.embeddings.unwrap_or_default();
        let faq = yaml.faq.unwrap_or_default();
        let products = yaml.products.unwrap_or_default();
        let router = yaml.router.unwrap_or_default();

        let embedding_backend =
            Self::resolve_env_string(embeddings.backend, "EMBEDDING_BACKEND")
                .and_then(|b| EmbeddingBackend::parse(&b))
                .unwrap_or_default();

        let route_aggregation = router
            .aggregation
            .as_deref()
            .and_then(Aggregation::parse)
            .unwrap_or_default();

        Self {
            groq_api_key: Self::resolve_env_string(llm.api_key, "GROQ_API_KEY")
                .unwrap_or_default(),
            groq_base_url: Self::resolve_env_string(llm.base_url, "GROQ_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
            model: Self::resolve_env_string(llm.model, "GROQ_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: llm.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            sql_max_tokens: llm.sql_max_tokens.unwrap_or(SQL_MAX_TOKENS),
            narration_max_tokens: llm.narration_max_tokens.unwrap_or(NARRATION_MAX_TOKENS),
            answer_max_tokens: llm.answer_max_tokens,
            embedding_backend,
            embedding_model: embeddings
                .model
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dim: embeddings.dimension.unwrap_or(LOCAL_EMBEDDING_DIM),
            openai_api_key: Self::resolve_env_string(embeddings.openai_api_key, "OPENAI_API_KEY"),
            qdrant_url: Self::resolve_env_string(faq.qdrant_url, "QDRANT_URL"),
            faq_path: Self::resolve_env_string(faq.path, "FAQ_PATH")
                .unwrap_or_else(|| DEFAULT_FAQ_PATH.to_string())
                .into(),
            faq_collection: faq
                .collection
                .unwrap_or_else(|| FAQ_COLLECTION.to_string()),
            faq_top_k: faq.top_k.unwrap_or(DEFAULT_FAQ_TOP_K),
            db_path: Self::resolve_env_string(products.db_path, "PRODUCT_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            faq_threshold: Some(router.faq_threshold.unwrap_or(FAQ_ROUTE_THRESHOLD)),
            sql_threshold: router.sql_threshold,
            baseline_threshold: router
                .baseline_threshold
                .unwrap_or(DEFAULT_BASELINE_THRESHOLD),
            route_top_k: router.top_k.unwrap_or(DEFAULT_ROUTE_TOP_K),
            route_aggregation,
        }
    }
}
