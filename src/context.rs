//! Shared services built once at startup

use std::sync::Arc;

use tracing::info;

use crate::chat::ChatBot;
use crate::config::Config;
use crate::embeddings::{build_embedder, Embedder};
use crate::faq::{AnswerGenerator, FaqResponder, FaqRetriever};
use crate::integrations::{GroqClient, LanguageModel};
use crate::router::SemanticRouter;
use crate::sql::SqlResponder;
use crate::vector_db::{MemoryIndex, QdrantIndex, VectorIndex};
use crate::Result;

/// Configuration plus the external services every component shares.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub llm: Arc<dyn LanguageModel>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<dyn VectorIndex>,
}

impl AppContext {
    /// Groq for generation; Qdrant when `QDRANT_URL` is set, memory otherwise.
    pub fn from_config(config: Config) -> Result<Self> {
        let llm = GroqClient::new(&config.groq_api_key)?.with_base_url(&config.groq_base_url);
        let embedder = build_embedder(&config)?;

        let index: Arc<dyn VectorIndex> = match config.qdrant_url.as_deref() {
            Some(url) => {
                info!(url, "Using Qdrant vector index");
                Arc::new(QdrantIndex::new(url)?)
            }
            None => {
                info!("Using in-memory vector index");
                Arc::new(MemoryIndex::new())
            }
        };

        Ok(Self::with_components(config, Arc::new(llm), embedder, index))
    }

    pub fn with_components(
        config: Config,
        llm: Arc<dyn LanguageModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            config,
            llm,
            embedder,
            index,
        }
    }

    pub fn faq_retriever(&self) -> FaqRetriever {
        FaqRetriever::new(
            self.embedder.clone(),
            self.index.clone(),
            &self.config.faq_collection,
            &self.config.faq_path,
        )
    }

    pub fn faq_responder(&self) -> FaqResponder {
        FaqResponder::new(
            self.faq_retriever(),
            AnswerGenerator::from_config(self.llm.clone(), &self.config),
            self.config.faq_top_k,
        )
    }

    pub fn sql_responder(&self) -> SqlResponder {
        SqlResponder::from_config(self.llm.clone(), &self.config)
    }

    pub async fn router(&self) -> Result<SemanticRouter> {
        SemanticRouter::from_config(self.embedder.clone(), &self.config).await
    }

    pub async fn build_chatbot(&self) -> Result<ChatBot> {
        Ok(ChatBot::new(
            self.router().await?,
            self.faq_responder(),
            self.sql_responder(),
        ))
    }
}
