//! FAQ answering path
//!
//! - [`load_faq_csv`]: read the `question,answer` corpus
//! - [`FaqRetriever`]: embed, index and search the questions
//! - [`AnswerGenerator`]: ask the language model to answer from context
//! - [`FaqResponder`]: retrieval followed by generation

pub mod answer;
pub mod retriever;

use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

pub use answer::{AnswerGenerator, FaqResponder, REFUSAL};
pub use retriever::{build_context, FaqHit, FaqRetriever, IngestOutcome};

/// Metadata key holding the answer next to each indexed question.
pub const ANSWER_KEY: &str = "answer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaqEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
struct FaqRow {
    question: Option<String>,
    answer: Option<String>,
}

/// Load FAQ entries from a CSV with `question` and `answer` columns.
///
/// Ids are `id_<row>` counted over every data row, so skipped rows leave gaps.
pub fn load_faq_csv(path: impl AsRef<Path>) -> Result<Vec<FaqEntry>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| Error::FaqSourceError(format!("{}: {}", path.display(), e)))?;

    let mut entries = Vec::new();
    for (row, record) in reader.deserialize::<FaqRow>().enumerate() {
        let record = record?;
        let question = record.question.unwrap_or_default();
        if question.is_empty() {
            warn!(row, "Skipping FAQ row with empty question");
            continue;
        }

        entries.push(FaqEntry {
            id: format!("id_{}", row),
            question,
            answer: record.answer.unwrap_or_default(),
        });
    }

    info!(count = entries.len(), path = %path.display(), "Loaded FAQ entries");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_rows_with_sequential_ids() {
        let file = csv_file(
            "question,answer\n\
             What is the return policy?,Returns within 30 days.\n\
             \"Do you accept cash, too?\",\"Yes, cash on delivery.\"\n",
        );

        let entries = load_faq_csv(file.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "id_0");
        assert_eq!(entries[1].id, "id_1");
        assert_eq!(entries[1].question, "Do you accept cash, too?");
        assert_eq!(entries[1].answer, "Yes, cash on delivery.");
    }

    #[test]
    fn trims_fields_and_skips_blank_questions() {
        let file = csv_file(
            "question,answer\n\
             \x20 ,orphan answer\n\
             \x20 How do I track my order?  ,  Use the tracking link.  \n",
        );

        let entries = load_faq_csv(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "id_1");
        assert_eq!(entries[0].question, "How do I track my order?");
        assert_eq!(entries[0].answer, "Use the tracking link.");
    }

    #[test]
    fn header_only_file_is_empty_corpus() {
        let file = csv_file("question,answer\n");
        assert!(load_faq_csv(file.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_faq_source_error() {
        let err = load_faq_csv("/nonexistent/faq_data.csv").unwrap_err();
        assert!(matches!(err, Error::FaqSourceError(_)));
        assert!(err.to_string().contains("faq_data.csv"));
    }
}
