//! One-shot question

use anyhow::Result;
use tracing::info;

use crate::context::AppContext;

pub async fn run(context: &AppContext, question: &str) -> Result<()> {
    let bot = context.build_chatbot().await?;
    let reply = bot.respond(question).await;

    info!(path = reply.path.as_str(), failure = ?reply.failure, "Answered");
    println!("{}", reply.text);
    Ok(())
}
