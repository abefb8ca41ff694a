//! Subagent Runner - spawn an agent process and stream its progress.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subagent_runner::ai::CompletionClient;
use subagent_runner::config::ConfigLoader;
use subagent_runner::display;
use subagent_runner::spawn::{SpawnConfig, Spawner};

#[derive(Parser)]
#[command(
    name = "subagent-runner",
    about = "Spawn an agent process and stream its progress",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to a config file (defaults to the standard search paths).
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task through the agent.
    Run {
        /// The task to execute.
        task: String,
        /// Follow-up message queued for delivery after the first turn.
        #[arg(long)]
        follow_up: Option<String>,
        /// Model identifier passed to the agent.
        #[arg(long)]
        model: Option<String>,
        /// Comma-separated built-in tool allowlist.
        #[arg(long)]
        tools: Option<String>,
        /// Working directory for the agent (defaults to the current one).
        #[arg(long)]
        cwd: Option<PathBuf>,
        /// Agent binary to spawn (overrides the config file).
        #[arg(long)]
        binary: Option<String>,
        /// Print a generated session title before running.
        #[arg(long)]
        title: bool,
    },
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let loader = match cli.config {
        Some(path) => ConfigLoader::with_path(path),
        None => ConfigLoader::new(),
    };
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return std::process::ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Run {
            task,
            follow_up,
            model,
            tools,
            cwd,
            binary,
            title,
        } => {
            if title {
                // Optional feature: a failed completion is skipped, not fatal.
                match CompletionClient::from_config(&config.ai) {
                    Ok(client) => match client.session_title(&task).await {
                        Ok(text) => println!("{text}"),
                        Err(e) => tracing::warn!(error = %e, "Skipping session title"),
                    },
                    Err(e) => tracing::warn!(error = %e, "Skipping session title"),
                }
            }

            let binary = binary.unwrap_or_else(|| config.binary.clone());
            let cwd = cwd
                .or_else(|| std::env::current_dir().ok())
                .unwrap_or_else(|| PathBuf::from("."));

            let cancel = CancellationToken::new();
            let ctrl_c_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c_cancel.cancel();
                }
            });

            display::print_spawn_start(&binary, &task, follow_up.is_some());

            let mut spawn_config = SpawnConfig::new(cwd, task).with_cancellation(cancel);
            spawn_config.follow_up = follow_up;
            spawn_config.model = model;
            spawn_config.allowed_tools =
                tools.map(|t| t.split(',').map(|s| s.trim().to_string()).collect());
            spawn_config.on_progress = Some(Arc::new(|snapshot: &str| {
                display::print_progress(snapshot);
            }));

            let result = match Spawner::with_binary(binary)
                .limits(config.max_stdout_bytes, config.max_stderr_bytes)
                .run(spawn_config)
                .await
            {
                Ok(result) => result,
                Err(e) => {
                    display::print_error(&e.to_string());
                    return std::process::ExitCode::FAILURE;
                }
            };

            if let Some(text) = result.final_text() {
                display::print_final_text(&text);
            }
            if let Some(error) = &result.error {
                display::print_error(error);
            }
            display::print_spawn_end(result.exit_code, result.usage.cost_usd, result.usage.turns);

            if result.is_success() {
                std::process::ExitCode::SUCCESS
            } else {
                std::process::ExitCode::FAILURE
            }
        }
    }
}
