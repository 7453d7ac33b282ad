//! Offline stand-ins for the model, the encoder and the product catalog.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ecom_chatbot::chat::ChatBot;
use ecom_chatbot::config::{Config, EmbeddingBackend};
use ecom_chatbot::context::AppContext;
use ecom_chatbot::embeddings::Embedder;
use ecom_chatbot::integrations::CompletionRequest;
use ecom_chatbot::vector_db::MemoryIndex;
use ecom_chatbot::{Error, LanguageModel, Result};
use rusqlite::Connection;
use tempfile::TempDir;

/// Replays canned replies in order and keeps every request it saw.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String>>>,
    seen: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(replies: &[&str]) -> Arc<Self> {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.seen.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::LlmError("no scripted reply left".into())))
    }
}

/// One dimension per known word; unknown words contribute nothing.
pub struct KeywordEmbedder {
    vocab: Vec<&'static str>,
}

impl KeywordEmbedder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            vocab: vec![
                "return", "policy", "track", "order", "payment", "methods", "refund",
                "discount", "hdfc", "credit", "card", "delivery", "shipping", "coupon",
                "nike", "puma", "shoes", "under", "formal", "size", "sale", "price", "running",
            ],
        })
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0; self.vocab.len()];
        for token in text.split(|c: char| !c.is_alphanumeric()) {
            let token = token.to_lowercase();
            if let Some(i) = self.vocab.iter().position(|w| *w == token) {
                v[i] = 1.0;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.vocab.len()
    }
}

pub fn faq_csv() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/faq_data.csv")
}

/// A small product table in a temporary SQLite file.
pub fn product_catalog() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE product (
            product_link TEXT, title TEXT, brand TEXT,
            price INTEGER, discount REAL, avg_rating REAL, total_ratings INTEGER
         );
         INSERT INTO product VALUES
            ('https://shop.example/p/1', 'Campus Women Running Shoes', 'Campus', 1104, 0.35, 4.4, 1200),
            ('https://shop.example/p/2', 'Nike Revolution 6', 'Nike', 2795, 0.0, 4.1, 310),
            ('https://shop.example/p/3', 'Nike Air Zoom Pegasus', 'Nike', 9695, 0.2, 4.7, 64),
            ('https://shop.example/p/4', 'Puma Smash Sneakers', 'Puma', 4199, 0.5, 3.9, 87);",
    )
    .unwrap();
    (dir, path)
}

/// Everything wired offline: keyword encoder, memory index, bundled FAQ CSV.
pub struct Harness {
    pub model: Arc<ScriptedModel>,
    pub context: AppContext,
    _catalog: TempDir,
}

impl Harness {
    pub fn new(model: Arc<ScriptedModel>) -> Self {
        let (catalog, db_path) = product_catalog();

        let mut config = Config::from_env();
        config.groq_api_key = "test_key".to_string();
        config.embedding_backend = EmbeddingBackend::Local;
        config.qdrant_url = None;
        config.faq_path = faq_csv();
        config.db_path = db_path;

        let context = AppContext::with_components(
            config,
            model.clone(),
            KeywordEmbedder::new(),
            Arc::new(MemoryIndex::new()),
        );

        Self {
            model,
            context,
            _catalog: catalog,
        }
    }

    pub async fn chatbot(&self) -> ChatBot {
        self.context.build_chatbot().await.unwrap()
    }
}
