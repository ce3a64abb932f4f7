// Agent Context - command line entry point

use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use agent_context::commands;
use agent_context::models::response::CommandResponse;
use agent_context::state::AppState;
use agent_context::storage::ConfigService;

#[derive(Parser, Debug)]
#[command(name = "agent-context", version, about = "Cross-session rule memory for coding agents")]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Config file (defaults to ~/.agent-context/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a rule
    Remember {
        rule: String,
        #[arg(long)]
        language: Option<String>,
    },
    /// Show every saved rule
    Rules,
    /// Print the context block an agent would receive
    Inject {
        /// Languages to include besides `general`
        #[arg(long = "language")]
        languages: Vec<String>,
        /// Skip the project scan
        #[arg(long)]
        no_scan: bool,
    },
    /// Show active and supported languages
    Languages,
    /// Serve the JSON-lines host protocol on stdin/stdout
    Serve,
}

fn into_result<T>(response: CommandResponse<T>) -> anyhow::Result<T> {
    match (response.success, response.data) {
        (true, Some(data)) => Ok(data),
        _ => Err(anyhow!(response
            .error
            .unwrap_or_else(|| "unknown error".to_string()))),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout carries protocol replies; logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let project = match cli.project {
        Some(path) => path,
        None => std::env::current_dir().context("cannot resolve current directory")?,
    };
    let config = match cli.config {
        Some(path) => ConfigService::open(path)?,
        None => ConfigService::new()?,
    };

    let state = AppState::new();
    state
        .initialize(&project, config)
        .await
        .with_context(|| format!("failed to open project {}", project.display()))?;

    match cli.command {
        Command::Remember { rule, language } => {
            let message = into_result(commands::remember_rule(&state, rule, language).await)?;
            println!("{}", message);
        }
        Command::Rules => {
            println!("{}", into_result(commands::get_context_overview(&state).await)?);
        }
        Command::Inject {
            languages,
            no_scan,
        } => {
            let languages = (!languages.is_empty()).then_some(languages);
            let block = into_result(commands::build_context(&state, languages, !no_scan).await)?;
            print!("{}", block);
        }
        Command::Languages => {
            let report = into_result(commands::detect_languages(&state).await)?;
            println!("active: {}", report.active.join(", "));
            println!("supported: {}", report.supported.join(", "));
        }
        Command::Serve => {
            tracing::info!(project = %project.display(), "serving host protocol");
            commands::serve_stdio(&state).await?;
        }
    }

    Ok(())
}
