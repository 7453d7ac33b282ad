//! Show how a question would be routed

use anyhow::Result;

use crate::context::AppContext;
use crate::router::RouteDecision;

pub fn describe(decision: RouteDecision) -> String {
    match decision {
        RouteDecision::Matched { route, score } => format!("{} (score {:.3})", route, score),
        RouteDecision::Unmatched => "unmatched".to_string(),
    }
}

pub async fn run(context: &AppContext, question: &str) -> Result<()> {
    let router = context.router().await?;
    let decision = router.decide(question).await?;
    println!("{}", describe(decision));
    Ok(())
}
