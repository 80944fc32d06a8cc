mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, RunArgs, SelectionArgs};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "exercise",
    about = "Exercise a telescope mount: slew to bright stars, dither around them, and guide",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: nearest exercise.yaml at or above the current directory)
    #[arg(long, global = true, env = "EXERCISE_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log debug detail, including actuator output
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Visit every star inside the altitude window, then stop tracking
    Run {
        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        run: RunArgs,
    },

    /// List the stars a run would visit, in visiting order
    Targets {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        match &cli.command {
            Commands::Run { .. } => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        }
    };

    // Logs go to stderr so `--json` output on stdout stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = root::resolve_config(cli.config.as_deref());

    let result = match cli.command {
        Commands::Run { selection, run } => {
            cmd::run::run(config_path.as_deref(), &selection, &run, cli.json)
        }
        Commands::Targets { selection } => {
            cmd::targets::run(config_path.as_deref(), &selection, cli.json)
        }
        Commands::Config { subcommand } => {
            cmd::config::run(config_path.as_deref(), subcommand, cli.json)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
