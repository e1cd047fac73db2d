//! Soho CLI - consultation report generation
//!
//! A command-line interface for turning a recorded consulting session
//! into a PDF report.

#![allow(clippy::print_stdout)] // CLI program intentionally uses stdout

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use soho::prelude::*;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Soho - consultation report generator for small-business finance
#[derive(Parser)]
#[command(name = "soho")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the recorded session audio (wav, mp3, m4a, ...)
    #[arg(short, long)]
    audio: PathBuf,

    /// Client profile as a JSON document
    #[arg(short, long)]
    client: String,

    /// Policy database (SQLite); recommendations are skipped without it
    #[arg(short, long, env = "POLICY_DB")]
    db: Option<PathBuf>,

    /// Free-form policy search query overriding the profile-derived one
    #[arg(short, long)]
    query: Option<String>,

    /// Output PDF path
    #[arg(short, long, default_value = "report.pdf")]
    out: PathBuf,

    /// Maximum number of policy recommendations in the report
    #[arg(long, default_value_t = DEFAULT_MAX_PICKS)]
    max_picks: usize,

    /// Language hint passed to the transcription model
    #[arg(long, default_value = "ko")]
    language: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbose);

    // Run the async main
    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize logging with the given verbosity level.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "soho={level},{}",
            if verbosity >= 2 { "debug" } else { "warn" }
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let client = OpenAi::from_env()?;
    let pipeline = Pipeline::openai(client)
        .with_max_picks(cli.max_picks)
        .with_language(Some(cli.language));

    let args = RunArgs {
        audio: cli.audio,
        client_json: cli.client,
        db: cli.db,
        query: cli.query,
        out: cli.out.clone(),
    };

    pipeline.run(&args).await?;
    println!("Report written to {}", cli.out.display());
    Ok(())
}
