//! Prompt templates.
//!
//! Defaults are compiled in from `prompts/`; a file with the same name in a
//! `prompts/` directory next to the working directory replaces the default
//! at runtime.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::{Error, Result};

static FAQ_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(context|question)\}").expect("static regex is valid")
});

/// Available prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    /// Answer from retrieved FAQ context only.
    FaqAnswer,
    /// Translate a question into one `SELECT` over `product`.
    SqlSynthesis,
    /// Turn query rows into a customer-facing reply.
    Narration,
}

impl Prompt {
    /// Prompt file name (Markdown).
    pub fn filename(&self) -> &'static str {
        match self {
            Prompt::FaqAnswer => "faq_answer.md",
            Prompt::SqlSynthesis => "sql_synthesis.md",
            Prompt::Narration => "narration.md",
        }
    }

    /// Compiled-in template.
    pub fn default_text(&self) -> &'static str {
        match self {
            Prompt::FaqAnswer => include_str!("../prompts/faq_answer.md"),
            Prompt::SqlSynthesis => include_str!("../prompts/sql_synthesis.md"),
            Prompt::Narration => include_str!("../prompts/narration.md"),
        }
    }

    /// Load the prompt from the prompts directory.
    pub fn load(&self) -> Result<String> {
        load_prompt(self.filename())
    }

    /// On-disk override if present, otherwise the compiled-in template.
    pub fn text(&self) -> String {
        match self.load() {
            Ok(text) if !text.trim().is_empty() => text,
            _ => {
                debug!(prompt = self.filename(), "Using built-in prompt");
                self.default_text().to_string()
            }
        }
    }
}

/// Fill the FAQ template.
pub fn render_faq_answer(template: &str, context: &str, question: &str) -> String {
    // One pass, so placeholder-like text inside the values stays as written
    FAQ_PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| match &caps[1] {
            "context" => context,
            _ => question,
        })
        .into_owned()
}

/// Load a prompt by file name.
pub fn load_prompt(filename: &str) -> Result<String> {
    let path = prompts_dir().join(filename);
    std::fs::read_to_string(&path).map_err(|e| {
        Error::InvalidArgument(format!("Failed to load prompt {}: {}", filename, e))
    })
}

/// Path to the prompts directory.
pub fn prompts_dir() -> PathBuf {
    let candidates = [PathBuf::from("prompts"), PathBuf::from("../prompts")];

    for path in candidates {
        if path.exists() {
            return path;
        }
    }

    PathBuf::from("prompts")
}

pub fn list_prompts() -> Vec<Prompt> {
    vec![Prompt::FaqAnswer, Prompt::SqlSynthesis, Prompt::Narration]
}
