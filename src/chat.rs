//! Conversation handling and dispatch to the answer paths

use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::faq::FaqResponder;
use crate::metrics::{record_query_result, record_query_start, STATUS_OK};
use crate::router::{RouteName, SemanticRouter};
use crate::sql::SqlResponder;
use crate::Error;

/// Reply when no route matches.
pub const UNMATCHED_REPLY: &str = "I'm sorry, I don't have an answer for that.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("user"),
            Role::Assistant => f.write_str("assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

/// Append-only history for one conversation.
///
/// With a turn limit, the oldest turns are dropped once it is exceeded;
/// the remaining turns keep their order and content.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    turns: Vec<ConversationTurn>,
    max_turns: Option<usize>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_turns` of the latest turns (at least one).
    pub fn with_max_turns(max_turns: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_turns: Some(max_turns.max(1)),
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
            at: Utc::now(),
        });

        if let Some(max) = self.max_turns {
            let excess = self.turns.len().saturating_sub(max);
            self.turns.drain(..excess);
        }
    }

    /// Time of the latest turn.
    pub fn last_active(&self) -> Option<DateTime<Utc>> {
        self.turns.last().map(|turn| turn.at)
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerPath {
    Faq,
    Sql,
    Unmatched,
}

impl AnswerPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerPath::Faq => "faq",
            AnswerPath::Sql => "sql",
            AnswerPath::Unmatched => "unmatched",
        }
    }
}

impl From<RouteName> for AnswerPath {
    fn from(route: RouteName) -> Self {
        match route {
            RouteName::Faq => AnswerPath::Faq,
            RouteName::Sql => AnswerPath::Sql,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub path: AnswerPath,
    /// Error kind when the text is a failure message.
    pub failure: Option<&'static str>,
}

impl Reply {
    fn failed(path: AnswerPath, err: &Error) -> Self {
        Self {
            text: err.user_message().to_string(),
            path,
            failure: Some(err.kind()),
        }
    }
}

/// Routes each query and turns every outcome into text.
pub struct ChatBot {
    router: SemanticRouter,
    faq: FaqResponder,
    sql: SqlResponder,
}

impl ChatBot {
    pub fn new(router: SemanticRouter, faq: FaqResponder, sql: SqlResponder) -> Self {
        Self { router, faq, sql }
    }

    pub fn router(&self) -> &SemanticRouter {
        &self.router
    }

    pub fn faq(&self) -> &FaqResponder {
        &self.faq
    }

    pub fn sql(&self) -> &SqlResponder {
        &self.sql
    }

    pub async fn ask(&self, query: &str) -> String {
        self.respond(query).await.text
    }

    /// Answer and report the path taken. Never fails.
    pub async fn respond(&self, query: &str) -> Reply {
        record_query_start();
        let started = Instant::now();

        let reply = self.dispatch(query).await;

        record_query_result(
            reply.path.as_str(),
            started.elapsed(),
            reply.failure.unwrap_or(STATUS_OK),
        );
        reply
    }

    async fn dispatch(&self, query: &str) -> Reply {
        let route = match self.router.classify(query).await {
            Ok(route) => route,
            Err(err) => {
                error!(error = %err, "Routing failed");
                return Reply::failed(AnswerPath::Unmatched, &err);
            }
        };

        let Some(route) = route else {
            info!("No route for query");
            return Reply {
                text: UNMATCHED_REPLY.to_string(),
                path: AnswerPath::Unmatched,
                failure: None,
            };
        };

        let path = AnswerPath::from(route);
        info!(route = route.as_str(), "Answering query");

        let result = match route {
            RouteName::Faq => self.faq.answer(query).await,
            RouteName::Sql => self.sql.answer(query).await,
        };

        match result {
            Ok(text) => Reply {
                text,
                path,
                failure: None,
            },
            Err(err) => {
                error!(route = route.as_str(), kind = err.kind(), error = %err, "Answer failed");
                Reply::failed(path, &err)
            }
        }
    }

    /// Answer within a session: records the user turn, then the reply.
    pub async fn converse(&self, session: &mut ChatSession, query: &str) -> String {
        session.push(Role::User, query);
        let text = self.ask(query).await;
        session.push(Role::Assistant, text.clone());
        text
    }
}
