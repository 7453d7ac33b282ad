//! Semantic intent routing
//!
//! Each [`Route`] carries example utterances. A query is embedded, compared
//! against every utterance, and the best-scoring route wins if it clears
//! that route's threshold.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::{Error, Result};

/// Closed set of answer paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteName {
    Faq,
    Sql,
}

impl RouteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Faq => "faq",
            RouteName::Sql => "sql",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "faq" => Ok(RouteName::Faq),
            "sql" => Ok(RouteName::Sql),
            other => Err(Error::InvalidArgument(format!("Unknown route: {}", other))),
        }
    }
}

/// Named intent with example phrasings.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: RouteName,
    pub utterances: Vec<String>,
    pub threshold: Option<f32>,
}

impl Route {
    pub fn new<I, S>(name: RouteName, utterances: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name,
            utterances: utterances.into_iter().map(Into::into).collect(),
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f32>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Store policy questions.
    pub fn faq() -> Self {
        Self::new(
            RouteName::Faq,
            [
                "What is the return policy of the products?",
                "Do I get discount with the HDFC credit card?",
                "How can I track my order?",
                "What payment methods are accepted?",
                "How long does it take to process a refund?",
            ],
        )
        .with_threshold(Some(crate::config::FAQ_ROUTE_THRESHOLD))
    }

    /// Product catalog searches.
    pub fn sql() -> Self {
        Self::new(
            RouteName::Sql,
            [
                "I want to buy nike shoes that have 50% discount.",
                "Are there any shoes under Rs. 3000?",
                "Do you have formal shoes in size 9?",
                "Are there any Puma shoes on sale?",
                "What is the price of puma running shoes?",
            ],
        )
    }

    /// Both default routes with thresholds taken from the configuration.
    pub fn defaults(config: &Config) -> Vec<Route> {
        vec![
            Route::faq().with_threshold(config.faq_threshold),
            Route::sql().with_threshold(config.sql_threshold),
        ]
    }
}

/// How per-utterance scores combine into a route score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    #[default]
    Mean,
    Sum,
    Max,
}

impl Aggregation {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mean" => Some(Aggregation::Mean),
            "sum" => Some(Aggregation::Sum),
            "max" => Some(Aggregation::Max),
            _ => None,
        }
    }

    pub fn apply(&self, scores: &[f32]) -> f32 {
        if scores.is_empty() {
            return 0.0;
        }
        match self {
            Aggregation::Mean => scores.iter().sum::<f32>() / scores.len() as f32,
            Aggregation::Sum => scores.iter().sum(),
            Aggregation::Max => scores.iter().copied().fold(f32::MIN, f32::max),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    pub top_k: usize,
    pub aggregation: Aggregation,
    /// Threshold for routes that don't set their own.
    pub baseline_threshold: f32,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            top_k: crate::config::DEFAULT_ROUTE_TOP_K,
            aggregation: Aggregation::default(),
            baseline_threshold: crate::config::DEFAULT_BASELINE_THRESHOLD,
        }
    }
}

impl RouterConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.route_top_k,
            aggregation: config.route_aggregation,
            baseline_threshold: config.baseline_threshold,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RouteDecision {
    Matched { route: RouteName, score: f32 },
    Unmatched,
}

impl RouteDecision {
    pub fn route(&self) -> Option<RouteName> {
        match self {
            RouteDecision::Matched { route, .. } => Some(*route),
            RouteDecision::Unmatched => None,
        }
    }
}

struct EncodedUtterance {
    route: usize,
    embedding: Vec<f32>,
}

/// Embedding-similarity classifier over a fixed set of routes.
pub struct SemanticRouter {
    embedder: Arc<dyn Embedder>,
    routes: Vec<Route>,
    utterances: Vec<EncodedUtterance>,
    config: RouterConfig,
}

impl SemanticRouter {
    /// Embed every utterance once. Rejects empty or duplicate routes.
    pub async fn new(
        embedder: Arc<dyn Embedder>,
        routes: Vec<Route>,
        config: RouterConfig,
    ) -> Result<Self> {
        if routes.is_empty() {
            return Err(Error::InvalidArgument("Router needs at least one route".to_string()));
        }

        for (i, route) in routes.iter().enumerate() {
            if route.utterances.is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "Route '{}' has no utterances",
                    route.name
                )));
            }
            if routes[..i].iter().any(|r| r.name == route.name) {
                return Err(Error::InvalidArgument(format!(
                    "Route '{}' registered twice",
                    route.name
                )));
            }
        }

        let texts: Vec<String> = routes
            .iter()
            .flat_map(|r| r.utterances.iter().cloned())
            .collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(Error::EmbeddingError(format!(
                "Expected {} utterance embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        let owners = routes
            .iter()
            .enumerate()
            .flat_map(|(idx, r)| std::iter::repeat(idx).take(r.utterances.len()));
        let utterances = owners
            .zip(embeddings)
            .map(|(route, embedding)| EncodedUtterance { route, embedding })
            .collect();

        debug!(routes = routes.len(), utterances = texts.len(), "Router ready");

        Ok(Self {
            embedder,
            routes,
            utterances,
            config,
        })
    }

    /// Router with the default `faq` and `sql` routes.
    pub async fn from_config(embedder: Arc<dyn Embedder>, config: &Config) -> Result<Self> {
        Self::new(embedder, Route::defaults(config), RouterConfig::from_config(config)).await
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub async fn classify(&self, query: &str) -> Result<Option<RouteName>> {
        Ok(self.decide(query).await?.route())
    }

    pub async fn decide(&self, query: &str) -> Result<RouteDecision> {
        if query.trim().is_empty() {
            return Ok(RouteDecision::Unmatched);
        }

        let embedding = self.embedder.embed(query).await?;
        let decision = self.decide_embedded(&embedding);

        match decision {
            RouteDecision::Matched { route, score } => {
                debug!(route = route.as_str(), score, "Query routed")
            }
            RouteDecision::Unmatched => debug!("Query matched no route"),
        }

        Ok(decision)
    }

    fn decide_embedded(&self, query: &[f32]) -> RouteDecision {
        let mut scored: Vec<(usize, f32)> = self
            .utterances
            .iter()
            .map(|u| (u.route, cosine_similarity(query, &u.embedding)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(self.config.top_k.max(1));

        let mut best: Option<(usize, f32, f32)> = None;
        for idx in 0..self.routes.len() {
            let scores: Vec<f32> = scored
                .iter()
                .filter(|(route, _)| *route == idx)
                .map(|(_, score)| *score)
                .collect();
            if scores.is_empty() {
                continue;
            }

            let aggregate = self.config.aggregation.apply(&scores);
            let top = scores.iter().copied().fold(f32::MIN, f32::max);
            // Strictly greater keeps the earlier route on ties
            if best.map_or(true, |(_, current, _)| aggregate > current) {
                best = Some((idx, aggregate, top));
            }
        }

        match best {
            Some((idx, aggregate, top)) => {
                let route = &self.routes[idx];
                let threshold = route.threshold.unwrap_or(self.config.baseline_threshold);
                if top > threshold {
                    RouteDecision::Matched {
                        route: route.name,
                        score: aggregate,
                    }
                } else {
                    RouteDecision::Unmatched
                }
            }
            None => RouteDecision::Unmatched,
        }
    }
}
