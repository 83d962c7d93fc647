#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{CommandFactory, Parser, Subcommand};
use orderlog_core::config::{self, HistoryConfig};
use orderlog_core::error::ErrorCode;
use output::{CliError, Coded, OutputMode, render_error};
use std::env;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "olog: undoable edits for order-tracking boards",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (ignored when `OLOG_LOG` is set).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override `[history] max_history` from `.orderlog/config.toml`.
    #[arg(long, global = true, value_name = "N")]
    max_history: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// History limits after applying the command-line override.
    fn history_config(&self, project: &HistoryConfig) -> HistoryConfig {
        HistoryConfig {
            max_history: self.max_history.unwrap_or(project.max_history),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Apply a script of board operations with undo/redo",
        long_about = "Load a board, commit each scripted operation through the undo history, \
                      then perform the requested undos and redos.",
        after_help = "EXAMPLES:\n    # Apply a script and print the board\n    olog replay --board board.json --script ops.json\n\n    # Undo twice, redo once, saving after every step\n    olog replay --board board.json --script ops.json --undo 2 --redo 1 --save"
    )]
    Replay(cmd::replay::ReplayArgs),

    #[command(
        about = "Render a board file",
        after_help = "EXAMPLES:\n    olog show --board board.json\n\n    # Machine-readable\n    olog show --board board.json --json"
    )]
    Show(cmd::show::ShowArgs),

    #[command(about = "Generate shell completion scripts")]
    Completions(cmd::completions::CompletionsArgs),
}

/// Filter used when `OLOG_LOG` is unset. Covers both the library
/// (`orderlog_core`) and this binary (`olog`).
const fn default_filter(debug: bool) -> &'static str {
    if debug {
        "orderlog=debug,olog=debug,info"
    } else {
        "orderlog=info,olog=info,warn"
    }
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("OLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(default_filter(verbose || env::var("DEBUG").is_ok()))
    });

    let format = env::var("OLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode, history: &HistoryConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Replay(ref args) => cmd::replay::run_replay(args, history, output),
        Commands::Show(ref args) => cmd::show::run_show(args, output),
        Commands::Completions(ref args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn fail(output: OutputMode, err: &anyhow::Error) -> ExitCode {
    debug!(error = %format!("{err:#}"), "command failed");
    if render_error(output, &CliError::from(err)).is_err() {
        eprintln!("error: {err:#}");
    }
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let fallback = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Text
    };
    let resolved = env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|root| config::resolve_config(&root, cli.json))
        .map_err(|err| err.context(Coded(ErrorCode::ConfigParseError)));
    let effective = match resolved {
        Ok(effective) => effective,
        Err(err) => return fail(fallback, &err),
    };

    let output = OutputMode::from_resolved(&effective.resolved_output);
    let history = cli.history_config(&effective.project.history);
    debug!(
        output = %effective.resolved_output,
        max_history = history.max_history,
        "resolved configuration"
    );

    match run(&cli, output, &history) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(output, &err),
    }
}
