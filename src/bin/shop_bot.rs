//! Shop assistant Telegram bot
//!
//! Answers store-policy and product questions through the same `ChatBot`
//! the CLI uses, with one conversation history per chat.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use dotenvy::dotenv;
use ecom_chatbot::chat::{ChatBot, ChatSession};
use ecom_chatbot::context::AppContext;
use ecom_chatbot::Config;
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::Message;
use tokio::sync::Mutex;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const GREETING: &str = "Hi! I can answer questions about our store policies and help you find products. \
Try \"What is the return policy?\" or \"Nike shoes under Rs. 3000\".";

/// Turns kept per chat.
const MAX_TURNS: usize = 40;
/// Chats quiet for longer than this lose their history.
const IDLE_HOURS: i64 = 24;

#[derive(Clone)]
struct AppState {
    bot: Arc<ChatBot>,
    sessions: Arc<Mutex<HashMap<ChatId, ChatSession>>>,
}

fn evict_idle(sessions: &mut HashMap<ChatId, ChatSession>, now: DateTime<Utc>) {
    let before = sessions.len();
    sessions.retain(|_, session| {
        session
            .last_active()
            .is_some_and(|at| now - at < Duration::hours(IDLE_HOURS))
    });
    let evicted = before - sessions.len();
    if evicted > 0 {
        debug!(evicted, "Dropped idle chat sessions");
    }
}

async fn handle_start(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    state.sessions.lock().await.remove(&msg.chat.id);
    bot.send_message(msg.chat.id, GREETING).await?;
    Ok(())
}

async fn handle_message(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    let text = match msg.text() {
        Some(t) if !t.starts_with('/') => t,
        _ => return Ok(()),
    };

    // Take the session out so the lock isn't held across model calls
    let mut session = {
        let mut sessions = state.sessions.lock().await;
        evict_idle(&mut sessions, Utc::now());
        sessions
            .remove(&msg.chat.id)
            .unwrap_or_else(|| ChatSession::with_max_turns(MAX_TURNS))
    };

    let reply = state.bot.converse(&mut session, text).await;

    state.sessions.lock().await.insert(msg.chat.id, session);

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("ecom_chatbot=info".parse()?)
                .add_directive("shop_bot=info".parse()?),
        )
        .init();

    let token = std::env::var("SHOP_BOT_TOKEN")
        .context("SHOP_BOT_TOKEN not set in environment (.env)")?;

    let context = AppContext::from_config(Config::new())?;
    let chatbot = context.build_chatbot().await?;

    let state = AppState {
        bot: Arc::new(chatbot),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    info!("Starting shop bot...");
    let bot = Bot::new(token);

    Dispatcher::builder(
        bot,
        Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
            let state = state.clone();
            async move {
                if msg.text() == Some("/start") {
                    handle_start(bot, msg, state).await
                } else {
                    handle_message(bot, msg, state).await
                }
            }
        }),
    )
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}
