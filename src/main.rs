// src/main.rs
// folio - portfolio chat relay server and terminal client

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use folio_relay::client::locale::marker_label;
use folio_relay::client::{render, ActionLinks, ChatSession, ConsumeOutcome, RelayClient, Segment};
use folio_relay::config::EnvConfig;
use folio_relay::persona::{detect_language, Language};
use folio_relay::{http, web};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Streaming AI chat relay for a personal portfolio site")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP relay
    Serve {
        /// Address to bind (overrides FOLIO_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides FOLIO_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask the relay a question and stream the answer to the terminal
    Ask {
        message: String,

        /// Relay chat endpoint
        #[arg(long, default_value = "http://localhost:3000/api/chat")]
        endpoint: String,

        /// Interface language (zh or en); detected from the message if omitted
        #[arg(long)]
        lang: Option<Language>,

        /// Where the conversation is kept between runs
        #[arg(long)]
        session_dir: Option<PathBuf>,

        /// Start a fresh conversation
        #[arg(long)]
        reset: bool,

        /// Resume link shown for download actions
        #[arg(long, env = "RESUME_URL", default_value = "/resume.pdf")]
        resume_url: String,
    },

    /// Validate environment configuration and exit
    CheckConfig,
}

async fn run_server(host: Option<String>, port: Option<u16>) -> Result<()> {
    let config = EnvConfig::load();
    let validation = config.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        bail!("Invalid configuration:\n{}", validation.report());
    }

    let state = web::AppState::from_config(&config, http::create_shared_client())?;
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!(host = %host, port = port, "Starting folio relay");
    web::serve(state, &host, port).await
}

async fn run_ask(
    message: String,
    endpoint: String,
    lang: Option<Language>,
    session_dir: Option<PathBuf>,
    reset: bool,
    resume_url: String,
) -> Result<()> {
    let language = lang.unwrap_or_else(|| detect_language(&message));

    let mut session = match session_dir.or_else(ChatSession::default_dir) {
        Some(dir) => ChatSession::load(&dir, language),
        None => ChatSession::new(language),
    };
    if reset {
        session.reset(language);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let client = RelayClient::new(http::create_shared_client(), endpoint);
    let mut printed = 0;
    let outcome = client
        .send(&mut session, &message, language, &cancel, |text| {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}", &text[printed..]);
            let _ = stdout.flush();
            printed = text.len();
        })
        .await;

    session.save()?;

    match outcome {
        ConsumeOutcome::Completed(text) => {
            println!();
            let links = ActionLinks::new(resume_url);
            for segment in render(&text) {
                if let Segment::Action(marker) = segment {
                    println!("  → {}: {}", marker_label(marker, language), links.target(marker));
                }
            }
            Ok(())
        }
        ConsumeOutcome::Failed { error, .. } => {
            if printed > 0 {
                println!();
            }
            println!("{}", error.display_text(language));
            bail!("{}", error)
        }
        ConsumeOutcome::Cancelled => {
            println!();
            Ok(())
        }
    }
}

fn run_check_config() -> Result<()> {
    let config = EnvConfig::load();
    let validation = config.validate();
    println!("{}", validation.report());
    if !validation.is_valid() {
        bail!("configuration has errors");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        match &cli.command {
            Commands::Serve { .. } => Level::INFO,
            Commands::Ask { .. } | Commands::CheckConfig => Level::WARN,
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve { host, port } => run_server(host, port).await,
        Commands::Ask {
            message,
            endpoint,
            lang,
            session_dir,
            reset,
            resume_url,
        } => run_ask(message, endpoint, lang, session_dir, reset, resume_url).await,
        Commands::CheckConfig => run_check_config(),
    }
}
