//! E-commerce Assistant Library
//!
//! This library provides tools to:
//! - Route customer questions to a store-policy (FAQ) path or a product-search path
//! - Answer FAQ questions from semantically retrieved answers
//! - Translate product questions into read-only SQL over the catalog and narrate the rows
//! - Keep per-session conversation history
//! - Export Prometheus metrics for answered queries

pub mod chat;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod error;
pub mod faq;
pub mod integrations;
pub mod metrics;
pub mod prompts;
pub mod router;
pub mod sql;
pub mod vector_db;

// Re-export common types
pub use chat::{ChatBot, ChatSession, Reply, UNMATCHED_REPLY};
pub use config::Config;
pub use context::AppContext;
pub use error::{Error, Result};
pub use integrations::{GroqClient, LanguageModel};
pub use prompts::{load_prompt, Prompt};
pub use router::{RouteDecision, RouteName, SemanticRouter};

// Commands module uses re-exported types, so it must be declared after the re-exports
pub mod commands;
