// ABOUTME: Entry point for the parley terminal chat client
// ABOUTME: One-shot send for scripting plus an interactive chat loop

mod config;
mod surface;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use parley_client::{
    ConversationSession, HttpPersistence, HttpTransport, SendOutcome, UiSurface,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use surface::{QuietSurface, TerminalSurface};
use tokio::io::AsyncBufReadExt;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Terminal chat client for the parley agent service")]
#[command(version)]
struct Cli {
    /// Base URL of the agent service
    #[arg(short, long, env = "PARLEY_SERVER")]
    server: Option<String>,

    /// Session id to resume (defaults to a fresh session)
    #[arg(long, env = "PARLEY_SESSION")]
    session: Option<String>,

    /// Path to config file (defaults to ~/.config/parley/config.toml)
    #[arg(short, long, env = "PARLEY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one message and print the response
    Send {
        /// The message to send
        message: String,
    },

    /// Open an interactive chat session
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send { .. } => parley_log::init(),
        Commands::Chat => parley_log::init_file(),
    }

    let config = Config::load(cli.config.clone())?;
    let server = resolve_server(cli.server.as_deref(), &config);
    let session_id = resolve_session(cli.session.as_deref(), &config);

    match cli.command {
        Commands::Send { message } => run_send(&server, &session_id, &config, &message).await,
        Commands::Chat => run_chat(&server, &session_id, &config).await,
    }
}

/// CLI flag and environment win over the config file.
fn resolve_server(arg: Option<&str>, config: &Config) -> String {
    arg.map(|s| s.to_string())
        .unwrap_or_else(|| config.server.url.clone())
}

/// Explicit session, then configured session, then a fresh one.
fn resolve_session(arg: Option<&str>, config: &Config) -> String {
    arg.map(|s| s.to_string())
        .or_else(|| config.chat.session.clone())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn build_session(
    server: &str,
    session_id: &str,
    config: &Config,
    surface: Arc<dyn UiSurface>,
) -> Result<Arc<ConversationSession>> {
    let transport =
        Arc::new(HttpTransport::new(server).context("Failed to create HTTP transport")?);
    let persistence =
        Arc::new(HttpPersistence::new(server).context("Failed to create persistence client")?);

    let session = Arc::new(ConversationSession::with_status_interval(
        transport,
        surface,
        persistence,
        Duration::from_millis(config.chat.status_interval_ms),
    ));
    session.set_history_window(config.chat.history_window);
    session.set_session(session_id);
    Ok(session)
}

/// One-shot send: prints only the response text, for scripting.
async fn run_send(server: &str, session_id: &str, config: &Config, message: &str) -> Result<()> {
    let session = build_session(server, session_id, config, Arc::new(QuietSurface))?;

    match session.send(message).await? {
        SendOutcome::Completed { response, usage } => {
            if response.is_none() {
                eprintln!("(no response received)");
            }
            if let Some(summary) = usage.summary() {
                eprintln!("({})", summary);
            }
            Ok(())
        }
        SendOutcome::AgentError { message } => anyhow::bail!("Agent error: {}", message),
        SendOutcome::CancelledByAgent => anyhow::bail!("The agent cancelled the request"),
        SendOutcome::Aborted => anyhow::bail!("Request aborted"),
    }
}

/// Interactive loop: read lines, stream answers, Ctrl+C aborts the current
/// request without quitting.
async fn run_chat(server: &str, session_id: &str, config: &Config) -> Result<()> {
    let session = build_session(
        server,
        session_id,
        config,
        Arc::new(TerminalSurface::default()),
    )?;

    println!("parley, connected to {}", server);
    println!("session {}", session_id);
    println!("Type a message and press Enter. /new starts over, /quit exits.");

    let canceller = session.clone();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            canceller.cancel();
        }
    });

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            write!(stdout, "you> ")?;
            stdout.flush()?;
        }

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();

        match line.as_str() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                let fresh = uuid::Uuid::new_v4().to_string();
                session.set_session(&fresh);
                session.load_transcript(Vec::new());
                println!("session {}", fresh);
                continue;
            }
            _ => {}
        }

        match session.send(&line).await {
            Ok(SendOutcome::Completed { usage, .. }) => {
                if let Some(summary) = usage.summary() {
                    eprintln!("({})", summary);
                }
            }
            Ok(SendOutcome::Aborted) => eprintln!("(cancelled)"),
            Ok(SendOutcome::CancelledByAgent) => eprintln!("(cancelled by agent)"),
            // Agent and transport failures were already shown on the surface;
            // the session is idle again, so just offer the next prompt.
            Ok(SendOutcome::AgentError { .. }) | Err(_) => {}
        }
    }

    Ok(())
}
