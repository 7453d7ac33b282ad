//! Pulling SQL out of model replies and gating what may run

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::{Error, Result};

static SQL_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<SQL>\s*(.*?)\s*</SQL>").expect("static regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlExtraction {
    Found(String),
    NotFound,
}

impl SqlExtraction {
    pub fn into_result(self) -> Result<String> {
        match self {
            SqlExtraction::Found(sql) => Ok(sql),
            SqlExtraction::NotFound => Err(Error::SynthesisFailure),
        }
    }
}

/// First `<SQL>...</SQL>` block in `reply`, tags matched in any case.
pub fn extract_sql(reply: &str) -> SqlExtraction {
    SQL_TAG
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|sql| !sql.is_empty())
        .map(|sql| SqlExtraction::Found(sql.to_string()))
        .unwrap_or(SqlExtraction::NotFound)
}

/// A single statement that starts with `SELECT`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery(String);

impl SelectQuery {
    pub fn parse(sql: &str) -> Result<Self> {
        let trimmed = sql.trim();
        let starts_with_select = trimmed
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("select"));
        if !starts_with_select {
            return Err(Error::ForbiddenQuery(trimmed.to_string()));
        }

        let body = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        if has_unquoted_semicolon(body) {
            return Err(Error::ForbiddenQuery(trimmed.to_string()));
        }

        Ok(Self(body.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// True when a `;` appears outside string literals and comments.
fn has_unquoted_semicolon(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            // A doubled quote closes and reopens, which nets out the same
            if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            ';' => return true,
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            _ => {}
        }
    }
    false
}
