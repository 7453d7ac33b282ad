//! Load the FAQ corpus into the vector index

use anyhow::{Context, Result};

use crate::context::AppContext;
use crate::faq::IngestOutcome;

pub fn describe(outcome: IngestOutcome, collection: &str) -> String {
    match outcome {
        IngestOutcome::Ingested(n) => {
            format!("Ingested {} FAQ entries into collection '{}'", n, collection)
        }
        IngestOutcome::AlreadyPresent => {
            format!("Collection '{}' already exists, nothing to do", collection)
        }
    }
}

pub async fn run(context: &AppContext) -> Result<()> {
    let retriever = context.faq_retriever();
    let outcome = retriever.ingest().await.with_context(|| {
        format!(
            "Failed to ingest FAQ data from {}",
            context.config.faq_path.display()
        )
    })?;

    println!("{}", describe(outcome, retriever.collection()));
    let count = context.index.count(retriever.collection()).await?;
    println!("Collection size: {}", count);
    Ok(())
}
