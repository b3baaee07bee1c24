use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use ragdash_core::{chat, ApiError, BackendClient, Config, ConversationStore};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod input;
mod transcript;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, TICK_RATE};

#[derive(Parser)]
#[command(name = "ragdash")]
#[command(version, about = "Terminal dashboard for a local RAG backend")]
struct Cli {
    /// Backend base URL (overrides RAGDASH_BACKEND_URL and the config file)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    /// Request timeout in seconds; 0 waits indefinitely
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the cited answer
    Ask {
        /// Your question
        question: String,
        /// Retrieve with a hypothetical answer (HyDE)
        #[arg(long)]
        hyde: bool,
    },
    /// Show backend status, pipeline config and library card
    Status,
    /// Ingest a folder of documents on the backend host
    Ingest {
        /// Folder path as seen by the backend
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so its logs go to a file
    init_logging(cli.command.is_none())?;

    let config = Config::load().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "could not load config, using defaults");
        Config::new()
    });
    let base_url = config.backend_url(cli.backend_url.as_deref());
    let timeout = match cli.timeout {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => config.request_timeout(),
    };
    let client = BackendClient::with_timeout(&base_url, timeout)?;
    tracing::info!(backend = client.base_url(), ?timeout, "starting");

    match cli.command {
        None => run_tui(client, &config).await,
        Some(Commands::Ask { question, hyde }) => ask(&client, question, hyde || config.use_hyde()).await,
        Some(Commands::Status) => status(&client).await,
        Some(Commands::Ingest { path }) => ingest(&client, &path).await,
    }
}

fn init_logging(to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if !to_file {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(());
    }

    let log_path = log_file_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("ragdash")
        .join("ragdash.log")
}

async fn run_tui(client: BackendClient, config: &Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(TICK_RATE);
    let mut app = App::new(client, config);

    let result = async {
        loop {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            let Some(event) = events.next().await else {
                break;
            };
            handler::handle_event(&mut app, event).await?;

            if app.should_quit {
                break;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    tui::restore()?;
    tracing::info!("exiting");
    result
}

async fn ask(client: &BackendClient, question: String, use_hyde: bool) -> Result<()> {
    let mut store = ConversationStore::new();
    let mut input = question;
    let Some(request) = chat::begin_turn(&mut store, &mut input, use_hyde) else {
        bail!("question is empty");
    };

    let reply = client.chat(&request).await.map_err(backend_error)?;

    println!("{}", reply.text);
    let sources = reply.sources.unwrap_or_default();
    if !sources.is_empty() {
        println!("\nSources:");
        for citation in &sources {
            println!("  {}", citation);
        }
    }
    if let Some(usage) = reply.usage {
        tracing::debug!(?usage, "token usage");
    }
    Ok(())
}

async fn status(client: &BackendClient) -> Result<()> {
    let status = client.status().await.map_err(backend_error)?;

    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    println!("Backend:          {}", client.base_url());
    println!("Embedding model:  {}", or_dash(&status.config.embedding_model));
    println!("Vector DB:        {}", or_dash(&status.config.vector_db));
    println!("LLM model:        {}", or_dash(&status.config.llm_model));

    let rows = status.library_rows();
    if rows.is_empty() {
        println!("\nNo library information reported.");
    } else {
        println!("\nLibrary:");
        for (key, value) in rows {
            println!("  {:<24}{}", key, value);
        }
    }
    Ok(())
}

async fn ingest(client: &BackendClient, path: &str) -> Result<()> {
    let report = client.ingest(path).await.map_err(backend_error)?;
    println!("{}", app::describe_ingest(report));
    Ok(())
}

/// Error for a failed one-shot command. `main` already prefixes `Error: `,
/// so only the backend's detail is carried.
fn backend_error(err: ApiError) -> anyhow::Error {
    tracing::debug!(error = %err, "backend request failed");
    anyhow!("{}", err.detail())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragdash_core::TRANSPORT_FAILURE;

    #[test]
    fn test_backend_error_is_not_double_prefixed() {
        let err = backend_error(ApiError::Rejected { message: "not found".to_string() });
        assert_eq!(err.to_string(), "not found");

        let err = backend_error(ApiError::Malformed("[]".to_string()));
        assert_eq!(err.to_string(), TRANSPORT_FAILURE);
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["ragdash", "--timeout", "5", "ask", "what changed?", "--hyde"]).unwrap();
        assert_eq!(cli.timeout, Some(5));
        assert!(matches!(
            cli.command,
            Some(Commands::Ask { ref question, hyde: true }) if question == "what changed?"
        ));

        let cli = Cli::try_parse_from(["ragdash", "ingest", "/data/docs", "--backend-url", "http://h:1"]).unwrap();
        assert_eq!(cli.backend_url.as_deref(), Some("http://h:1"));
        assert!(matches!(cli.command, Some(Commands::Ingest { ref path }) if path == "/data/docs"));
    }
}
