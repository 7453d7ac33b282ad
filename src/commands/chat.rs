//! Interactive chat session

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::chat::{ChatBot, ChatSession};
use crate::context::AppContext;

const GREETING: &str = "Ask a question about our products or services (/reset, /history, exit):";

#[derive(Debug, PartialEq, Eq)]
enum ReplInput<'a> {
    Exit,
    Reset,
    History,
    Empty,
    Query(&'a str),
}

fn parse_line(line: &str) -> ReplInput<'_> {
    let trimmed = line.trim();
    match trimmed.to_lowercase().as_str() {
        "" => ReplInput::Empty,
        "exit" | "quit" | "/exit" | "/quit" => ReplInput::Exit,
        "/reset" => ReplInput::Reset,
        "/history" => ReplInput::History,
        _ => ReplInput::Query(trimmed),
    }
}

/// Drive one session over arbitrary input and output streams.
pub async fn run_session<R, W>(bot: &ChatBot, input: R, output: &mut W) -> Result<ChatSession>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = ChatSession::new();
    let mut lines = input.lines();

    output.write_all(format!("{}\n> ", GREETING).as_bytes()).await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            ReplInput::Exit => break,
            ReplInput::Empty => {}
            ReplInput::Reset => {
                session.clear();
                output.write_all(b"History cleared.\n").await?;
            }
            ReplInput::History => {
                for turn in session.turns() {
                    let entry = format!("[{}] {}: {}\n", turn.at.format("%H:%M:%S"), turn.role, turn.content);
                    output.write_all(entry.as_bytes()).await?;
                }
            }
            ReplInput::Query(query) => {
                let reply = bot.converse(&mut session, query).await;
                output.write_all(format!("{}\n", reply).as_bytes()).await?;
            }
        }
        output.write_all(b"> ").await?;
        output.flush().await?;
    }

    output.write_all(b"\n").await?;
    output.flush().await?;
    Ok(session)
}

pub async fn run(context: &AppContext) -> Result<()> {
    let bot = context.build_chatbot().await?;
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();

    run_session(&bot, stdin, &mut stdout).await?;
    Ok(())
}
