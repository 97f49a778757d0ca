//! AskIT-CLI: turns natural-language requests into shell commands.
//!
//! Runs a single ask by default, plus the `init` and `config` subcommands.

mod commands;
mod config_shell;
mod console;

use askit_core::paths::AppPaths;
use clap::{CommandFactory, Parser};
use console::{DIM, RED, RESET};
use std::process::ExitCode;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// AskIT-CLI: your intelligent command-line assistant
#[derive(Parser, Debug)]
#[command(name = "askit-cli", version, about, long_about = None)]
struct Cli {
    /// What you want to do, in plain language
    #[arg(short, long)]
    prompt: Option<String>,

    /// Number of recent shell history lines to send as context
    #[arg(short, long)]
    context: Option<usize>,

    /// Never execute automatically, even in strike mode
    #[arg(long)]
    safe: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Initialize an AskIT project in the current directory
    Init,
    /// Open the interactive configuration shell
    Config,
}

impl Cli {
    fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Stderr plus JSON file logging. The guard must live until exit.
fn init_tracing(
    cli: &Cli,
    paths: &AppPaths,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(cli.log_filter()));

    if std::fs::create_dir_all(&paths.logs_dir).is_err() {
        tracing_subscriber::registry().with(stderr_layer).init();
        return None;
    }
    let file_appender = tracing_appender::rolling::daily(&paths.logs_dir, "askit-cli.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();
    Some(guard)
}

async fn run(cli: Cli, paths: AppPaths) -> anyhow::Result<ExitCode> {
    match cli.command {
        Some(Commands::Init) => {
            commands::init(&std::env::current_dir()?)?;
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Config) => commands::config(paths).await,
        None => match cli.prompt {
            Some(prompt) if !prompt.trim().is_empty() => {
                let options = commands::AskOptions {
                    prompt,
                    context_lines: cli.context,
                    safe: cli.safe,
                    quiet: cli.quiet,
                };
                commands::ask(options, &paths).await
            }
            _ => {
                eprintln!("{RED}✗ A prompt is required.{RESET}");
                let in_project = std::env::current_dir()
                    .map(|dir| commands::in_project(&dir))
                    .unwrap_or(false);
                if in_project {
                    eprintln!("{DIM}  Try: askit-cli -p \"list files by size\"{RESET}");
                } else {
                    eprintln!("{DIM}  Run `askit-cli init` first, then: askit-cli -p \"...\"{RESET}");
                }
                Ok(ExitCode::FAILURE)
            }
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    if std::env::args_os().len() <= 1 {
        let _ = Cli::command().print_help();
        println!();
        return ExitCode::SUCCESS;
    }
    let cli = Cli::parse();

    let paths = match AppPaths::resolve() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _guard = init_tracing(&cli, &paths);

    match run(cli, paths).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Fatal");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
