//! Question → SQL → rows → narrated answer

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::extract::{extract_sql, SelectQuery};
use super::narration::{render_product_list, with_discount_text, NO_MATCHING_PRODUCTS};
use super::store::{ProductRecord, ProductStore, Record};
use crate::config::{Config, DEFAULT_TEMPERATURE, NARRATION_MAX_TOKENS, SQL_MAX_TOKENS};
use crate::integrations::{ChatMessage, CompletionRequest, LanguageModel};
use crate::prompts::Prompt;
use crate::{Error, Result};

/// Answer plus the query that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlAnswer {
    pub query: SelectQuery,
    pub row_count: usize,
    pub text: String,
}

pub struct SqlResponder {
    llm: Arc<dyn LanguageModel>,
    store: ProductStore,
    model: String,
    temperature: f32,
    sql_max_tokens: u32,
    narration_max_tokens: u32,
    synthesis_prompt: String,
    narration_prompt: String,
}

impl SqlResponder {
    pub fn new(llm: Arc<dyn LanguageModel>, store: ProductStore, model: impl Into<String>) -> Self {
        Self {
            llm,
            store,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            sql_max_tokens: SQL_MAX_TOKENS,
            narration_max_tokens: NARRATION_MAX_TOKENS,
            synthesis_prompt: Prompt::SqlSynthesis.text(),
            narration_prompt: Prompt::Narration.text(),
        }
    }

    pub fn from_config(llm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        let mut responder = Self::new(llm, ProductStore::new(&config.db_path), &config.model);
        responder.temperature = config.temperature;
        responder.sql_max_tokens = config.sql_max_tokens;
        responder.narration_max_tokens = config.narration_max_tokens;
        responder
    }

    pub fn store(&self) -> &ProductStore {
        &self.store
    }

    /// Ask the model for a query and pass it through the `SELECT` gate.
    pub async fn synthesize(&self, question: &str) -> Result<SelectQuery> {
        let request = CompletionRequest::new(
            &self.model,
            vec![
                ChatMessage::system(&self.synthesis_prompt),
                ChatMessage::user(question),
            ],
        )
        .temperature(self.temperature)
        .max_tokens(self.sql_max_tokens);

        let reply = self.llm.complete(request).await?;
        let sql = extract_sql(&reply).into_result().inspect_err(|_| {
            warn!("No <SQL> tags found in model reply");
        })?;
        debug!(sql = %sql, "Generated SQL");

        SelectQuery::parse(&sql).inspect_err(|_| warn!(sql = %sql, "Refused non-SELECT query"))
    }

    pub async fn execute(&self, query: &SelectQuery) -> Result<Vec<Record>> {
        self.store.execute(query).await
    }

    /// Turn rows into a reply. Empty rows never reach the model.
    pub async fn narrate(&self, question: &str, rows: &[Record]) -> Result<String> {
        if rows.is_empty() {
            return Ok(NO_MATCHING_PRODUCTS.to_string());
        }

        let data = serde_json::to_string(&with_discount_text(rows))?;
        let request = CompletionRequest::new(
            &self.model,
            vec![
                ChatMessage::system(&self.narration_prompt),
                ChatMessage::user(format!("Question: {}\nData: {}", question, data)),
            ],
        )
        .temperature(self.temperature)
        .max_tokens(self.narration_max_tokens);

        let failure = match self.llm.complete(request).await {
            Ok(text) if !text.trim().is_empty() => return Ok(text.trim().to_string()),
            Ok(_) => Error::LlmError("Empty narration".to_string()),
            Err(err) => err,
        };

        let products: Vec<ProductRecord> =
            rows.iter().filter_map(ProductRecord::from_record).collect();
        if products.len() == rows.len() {
            warn!(error = %failure, "Narration failed, rendering product list locally");
            return Ok(render_product_list(&products));
        }
        Err(failure)
    }

    pub async fn answer(&self, question: &str) -> Result<String> {
        Ok(self.answer_detailed(question).await?.text)
    }

    pub async fn answer_detailed(&self, question: &str) -> Result<SqlAnswer> {
        let query = self.synthesize(question).await?;
        let rows = self.execute(&query).await?;
        info!(rows = rows.len(), "Product query returned");

        let text = self.narrate(question, &rows).await?;
        Ok(SqlAnswer {
            query,
            row_count: rows.len(),
            text,
        })
    }
}
