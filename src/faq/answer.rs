//! Context-grounded answers for FAQ questions

use std::sync::Arc;

use tracing::debug;

use super::retriever::{build_context, FaqRetriever};
use crate::config::Config;
use crate::integrations::{ChatMessage, CompletionRequest, LanguageModel};
use crate::prompts::{render_faq_answer, Prompt};
use crate::Result;

/// Reply used when the model returns nothing.
pub const REFUSAL: &str = "I don't know.";

pub struct AnswerGenerator {
    llm: Arc<dyn LanguageModel>,
    model: String,
    max_tokens: Option<u32>,
    template: String,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LanguageModel>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
            max_tokens: None,
            template: Prompt::FaqAnswer.text(),
        }
    }

    pub fn from_config(llm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        let mut generator = Self::new(llm, &config.model);
        generator.max_tokens = config.answer_max_tokens;
        generator
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Answer `query` from `context` only. Empty context still asks the model.
    pub async fn answer(&self, query: &str, context: &str) -> Result<String> {
        let prompt = render_faq_answer(&self.template, context, query);
        let mut request = CompletionRequest::new(&self.model, vec![ChatMessage::user(prompt)]);
        if let Some(max_tokens) = self.max_tokens {
            request = request.max_tokens(max_tokens);
        }

        let reply = self.llm.complete(request).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            debug!("Model returned an empty FAQ answer");
            return Ok(REFUSAL.to_string());
        }
        Ok(reply.to_string())
    }
}

/// Retrieval followed by generation.
pub struct FaqResponder {
    retriever: FaqRetriever,
    generator: AnswerGenerator,
    top_k: usize,
}

impl FaqResponder {
    pub fn new(retriever: FaqRetriever, generator: AnswerGenerator, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    pub fn retriever(&self) -> &FaqRetriever {
        &self.retriever
    }

    pub async fn answer(&self, query: &str) -> Result<String> {
        let hits = self.retriever.retrieve(query, self.top_k).await?;
        let context = build_context(&hits);
        debug!(hits = hits.len(), "FAQ context assembled");
        self.generator.answer(query, &context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::faq::FaqEntry;
    use crate::vector_db::MemoryIndex;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FixedModel {
        reply: String,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FixedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn last_user_message(&self) -> String {
            let seen = self.seen.lock().unwrap();
            seen.last()
                .and_then(|r| r.content_of("user"))
                .unwrap_or_default()
                .to_string()
        }
    }

    #[async_trait]
    impl LanguageModel for FixedModel {
        async fn complete(&self, request: CompletionRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    #[tokio::test]
    async fn prompt_carries_context_and_question() {
        let model = FixedModel::new("Returns are accepted within 30 days.");
        let generator = AnswerGenerator::new(model.clone(), "llama");

        let reply = generator
            .answer("Can I return shoes?", "Returns are accepted within 30 days.")
            .await
            .unwrap();

        assert_eq!(reply, "Returns are accepted within 30 days.");
        let prompt = model.last_user_message();
        assert!(prompt.contains("CONTEXT: Returns are accepted within 30 days."));
        assert!(prompt.contains("QUESTION: Can I return shoes?"));
    }

    #[tokio::test]
    async fn blank_reply_becomes_refusal() {
        let model = FixedModel::new("   \n");
        let generator = AnswerGenerator::new(model, "llama");

        let reply = generator.answer("Anything?", "").await.unwrap();
        assert_eq!(reply, REFUSAL);
    }

    #[tokio::test]
    async fn empty_context_still_asks_the_model() {
        let model = FixedModel::new("I don't know.");
        let generator = AnswerGenerator::new(model.clone(), "llama");

        generator.answer("What about defects?", "").await.unwrap();
        assert_eq!(model.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn max_tokens_comes_from_config() {
        let model = FixedModel::new("ok");
        let mut config = Config::from_env();
        config.model = "test-model".to_string();
        config.answer_max_tokens = Some(256);

        AnswerGenerator::from_config(model.clone(), &config)
            .answer("q", "c")
            .await
            .unwrap();

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen[0].model, "test-model");
        assert_eq!(seen[0].max_tokens, Some(256));
        assert_eq!(seen[0].temperature, None);
    }

    #[tokio::test]
    async fn responder_feeds_retrieved_answers_as_context() {
        let index = Arc::new(MemoryIndex::new());
        let retriever = FaqRetriever::new(
            Arc::new(HashEmbedder::new(128)),
            index,
            "faqs",
            "unused.csv",
        );
        retriever
            .ingest_entries(vec![
                FaqEntry {
                    id: "id_0".into(),
                    question: "What is the return policy of the products?".into(),
                    answer: "Returns are accepted within 30 days.".into(),
                },
                FaqEntry {
                    id: "id_1".into(),
                    question: "How can I track my order?".into(),
                    answer: "Use the tracking link.".into(),
                },
            ])
            .await
            .unwrap();

        let model = FixedModel::new("You can return products within 30 days.");
        let responder = FaqResponder::new(
            retriever,
            AnswerGenerator::new(model.clone(), "llama").with_template("{context}|{question}"),
            2,
        );

        let reply = responder
            .answer("What is the return policy of the products?")
            .await
            .unwrap();
        assert_eq!(reply, "You can return products within 30 days.");
        assert_eq!(
            model.last_user_message(),
            "Returns are accepted within 30 days.\nUse the tracking link.|What is the return policy of the products?"
        );
    }
}
