//! Error types for the e-commerce assistant
//!
//! Every variant maps to a plain-language reply via [`Error::user_message`],
//! so the chat surfaces never show raw failures to customers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Language model error: {0}")]
    LlmError(String),

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("Vector store error: {0}")]
    VectorStoreError(String),

    #[error("FAQ source error: {0}")]
    FaqSourceError(String),

    #[error("No SQL query found in model reply")]
    SynthesisFailure,

    #[error("Refused to execute query: {0}")]
    ForbiddenQuery(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Stable short label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::LlmError(_) => "generation_failure",
            Error::EmbeddingError(_) => "embedding_failure",
            Error::VectorStoreError(_) => "vector_store_failure",
            Error::FaqSourceError(_) => "faq_source_failure",
            Error::SynthesisFailure => "synthesis_failure",
            Error::ForbiddenQuery(_) | Error::DatabaseError(_) => "execution_failure",
            Error::IoError(_) => "io",
            Error::SerializationError(_) => "serialization",
            Error::InvalidArgument(_) => "invalid_argument",
        }
    }

    /// Reply shown to the customer instead of the raw error.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::SynthesisFailure => {
                "Sorry, I couldn't turn that into a product search. Could you rephrase your question?"
            }
            Error::ForbiddenQuery(_) | Error::DatabaseError(_) => {
                "Sorry, I couldn't look that up in our product catalog right now."
            }
            Error::LlmError(_) => {
                "Sorry, I'm having trouble reaching the assistant service. Please try again in a moment."
            }
            Error::EmbeddingError(_) | Error::VectorStoreError(_) | Error::FaqSourceError(_) => {
                "Sorry, I couldn't search our help articles right now. Please try again later."
            }
            _ => "Sorry, something went wrong while answering your question.",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::SerializationError(err.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::FaqSourceError(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::LlmError(err.to_string())
    }
}

impl From<async_openai::error::OpenAIError> for Error {
    fn from(err: async_openai::error::OpenAIError) -> Self {
        Error::EmbeddingError(err.to_string())
    }
}

impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::VectorStoreError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::DatabaseError(format!("query worker failed: {}", err))
    }
}
