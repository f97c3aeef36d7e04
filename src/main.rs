use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lecture_live::{
    create_router, AppState, Config, FileSessionStore, LiveServices, LiveSession, NatsTransport,
    PlanManifest, SessionStore, StartMode,
};
use lecture_live::transcript::{export_transcript_text, transcript_file_name};
use lecture_live::usage::{format_cost, UsageSummary};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Live lecture sessions over a realtime model gateway
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = lecture_live::config::DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the session browser HTTP API
    Serve,

    /// Manage stored sessions
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },

    /// Create a session from a plan manifest (JSON)
    Import { manifest: PathBuf },

    /// Write a session transcript as plain text
    Export {
        session_id: String,
        /// Output file, defaults to "<deck>-transcript.txt"
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the cost breakdown of a session
    Usage { session_id: String },

    /// Run a live lecture from the terminal
    Live {
        session_id: String,
        /// Resume a previous lecture instead of starting over
        #[arg(long)]
        resume: bool,
        /// Apply the configured image optimization when the lecture has none
        #[arg(long)]
        optimize_images: bool,
    },
}

#[derive(Subcommand, Debug)]
enum SessionsAction {
    /// List stored sessions, newest first
    List,
    /// Delete one session
    Delete { session_id: String },
    /// Delete every session
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let sessions_dir = cfg.sessions_dir()?;
    let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(&sessions_dir).await?);

    match cli.command {
        Commands::Serve => serve(&cfg, store).await,
        Commands::Sessions { action } => sessions(store, action).await,
        Commands::Import { manifest } => import(store, manifest).await,
        Commands::Export { session_id, output } => export(store, &session_id, output).await,
        Commands::Usage { session_id } => usage(store, &session_id).await,
        Commands::Live {
            session_id,
            resume,
            optimize_images,
        } => live(&cfg, store, &session_id, resume, optimize_images).await,
    }
}

async fn load(store: &Arc<dyn SessionStore>, session_id: &str) -> Result<lecture_live::LectureSession> {
    match store.get(session_id).await? {
        Some(session) => Ok(session),
        None => bail!("Session {} not found", session_id),
    }
}

async fn serve(cfg: &Config, store: Arc<dyn SessionStore>) -> Result<()> {
    let addr = cfg.http_addr();
    info!("{} listening on http://{}", cfg.service.name, addr);

    let app = create_router(AppState::new(store));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

async fn sessions(store: Arc<dyn SessionStore>, action: SessionsAction) -> Result<()> {
    match action {
        SessionsAction::List => {
            let sessions = store.list_metadata().await?;
            if sessions.is_empty() {
                println!("No stored sessions");
            }
            for meta in sessions {
                let created = chrono::DateTime::from_timestamp_millis(meta.created_at)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                let summary = UsageSummary::from_reports(&meta.usage_reports);
                println!(
                    "{}  {}  {} ({} slides, {})",
                    meta.id,
                    created,
                    meta.file_name,
                    meta.slides_count,
                    format_cost(summary.total_cost)
                );
            }
        }
        SessionsAction::Delete { session_id } => {
            if store.delete(&session_id).await? {
                println!("Deleted {}", session_id);
            } else {
                bail!("Session {} not found", session_id);
            }
        }
        SessionsAction::Clear => {
            store.clear().await?;
            println!("Cleared all sessions");
        }
    }

    Ok(())
}

async fn import(store: Arc<dyn SessionStore>, manifest: PathBuf) -> Result<()> {
    let raw = tokio::fs::read_to_string(&manifest)
        .await
        .with_context(|| format!("Failed to read {}", manifest.display()))?;
    let manifest: PlanManifest =
        serde_json::from_str(&raw).context("Failed to parse plan manifest")?;

    let session = manifest.into_session()?;
    store.create(&session).await?;
    println!("{}", session.id);

    Ok(())
}

async fn export(
    store: Arc<dyn SessionStore>,
    session_id: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let session = load(&store, session_id).await?;
    let text = export_transcript_text(&session.general_info, &session.transcript);
    let path = output.unwrap_or_else(|| PathBuf::from(transcript_file_name(&session.file_name)));

    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());

    Ok(())
}

async fn usage(store: Arc<dyn SessionStore>, session_id: &str) -> Result<()> {
    let session = load(&store, session_id).await?;
    let summary = UsageSummary::from_reports(&session.usage_reports);

    println!("{} ({} calls)", session.file_name, summary.calls);
    for totals in summary.by_tag.values() {
        println!(
            "  {:<32} {:>10} tokens  {}",
            totals.label,
            totals.tokens,
            format_cost(totals.cost)
        );
    }
    println!("  {:<32} {:>10} tokens  {}", "Total", summary.total_tokens, format_cost(summary.total_cost));

    Ok(())
}

async fn live(
    cfg: &Config,
    store: Arc<dyn SessionStore>,
    session_id: &str,
    resume: bool,
    optimize_images: bool,
) -> Result<()> {
    let mut session = load(&store, session_id).await?;
    if optimize_images && session.lecture_config.image_optimization.is_none() {
        session.lecture_config.image_optimization = Some(cfg.image_optimization());
    }

    let transport = Arc::new(NatsTransport::connect(&cfg.nats.url, session.id.clone()).await?);
    let services = LiveServices::new(transport, store);
    let mode = if resume || !session.transcript.is_empty() {
        StartMode::Saved
    } else {
        StartMode::New
    };

    let live = LiveSession::spawn(session, services, cfg.live_session());
    live.start(mode).await?;
    info!("Live session {} started, type /help for commands", live.session_id());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else { break };
                match run_console_command(&live, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => warn!("{:#}", e),
                }
            }
        }
    }

    live.end().await?;
    Ok(())
}

/// Returns false when the console should exit
async fn run_console_command(live: &LiveSession, line: &str) -> Result<bool> {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "/quit" | "/exit" => return Ok(false),
        "/next" => live.next_slide().await?,
        "/prev" => live.previous_slide().await?,
        "/goto" => {
            let number: usize = arg.parse().context("Usage: /goto <slide number>")?;
            if number == 0 {
                bail!("Slide numbers start at 1");
            }
            live.select_slide(number - 1).await?;
        }
        "/replay" => live.replay().await?,
        "/mute" => live.set_muted(true).await?,
        "/unmute" => live.set_muted(false).await?,
        "/stats" => {
            let stats = live.get_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        "/save" => {
            live.flush().await?;
        }
        "/help" => {
            println!("/next /prev /goto N /replay /mute /unmute /stats /save /quit");
            println!("Anything else is sent to the lecturer as a message");
        }
        _ => {
            let outcome = live.send_message(line).await?;
            info!("Message: {:?}", outcome);
        }
    }

    Ok(true)
}
