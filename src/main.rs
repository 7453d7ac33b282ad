//! E-commerce assistant CLI - main entry point

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use anyhow::Context;
use ecom_chatbot::context::AppContext;
use ecom_chatbot::{commands, metrics, Config};
use tracing::warn;

#[derive(Parser)]
#[command(name = "ecom_chatbot")]
#[command(about = "E-commerce assistant: store FAQs and product search", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config.yml (defaults to ./config.yml, then ../config.yml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Chat model name (overrides GROQ_MODEL)
    #[arg(long, global = true)]
    model: Option<String>,

    /// Product SQLite database
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// FAQ CSV file
    #[arg(long, global = true)]
    faq: Option<PathBuf>,

    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR", global = true)]
    metrics_addr: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat,

    /// Answer a single question
    Ask {
        /// The customer question
        question: String,
    },

    /// Load the FAQ CSV into the vector index
    Ingest,

    /// Show which answer path a question would take
    Route {
        question: String,
    },

    /// Run only the product-search path
    Sql {
        question: String,

        /// Print the validated query without executing it
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Chat => "chat",
            Commands::Ask { .. } => "ask",
            Commands::Ingest => "ingest",
            Commands::Route { .. } => "route",
            Commands::Sql { .. } => "sql",
        }
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::new(),
    };

    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(faq) = &cli.faq {
        config.faq_path = faq.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("ecom_chatbot=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = load_config(&cli)?;
    let context = AppContext::from_config(config).context("Failed to initialise services")?;

    tracing::debug!(command = cli.command.name(), "Running command");
    execute_command(&context, cli.command).await
}

async fn execute_command(context: &AppContext, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Chat => commands::chat_run(context).await?,
        Commands::Ask { question } => commands::ask_run(context, &question).await?,
        Commands::Ingest => commands::ingest_run(context).await?,
        Commands::Route { question } => commands::route_run(context, &question).await?,
        Commands::Sql { question, dry_run } => {
            commands::sql_run(context, &question, dry_run).await?
        }
    }

    Ok(())
}
