use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod settings;

use commands::{CliResult, OutputFormat, inspect, merge, render, resolve};
use settings::{LogFormat, Settings, SettingsBuilder};

#[derive(Parser, Debug)]
#[command(name = "capstan", version)]
#[command(about = "Capstan CLI - inspect capability bundles and resolve agent configuration")]
struct Cli {
    /// Bundle identifier (overrides CAPSTAN_BUNDLE)
    #[arg(long, global = true)]
    bundle: Option<String>,

    /// Log output format (overrides CAPSTAN_LOG_FORMAT)
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    /// Output format for command results
    #[arg(long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show bundle metadata, available types and defaults
    Inspect,
    /// Print a configuration document with the bundle defaults applied
    Merge {
        /// Configuration document (overrides CAPSTAN_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Resolve a configuration document and summarize the instances
    Resolve {
        /// Configuration document (overrides CAPSTAN_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn try_init_tracing(format: LogFormat) -> Result<(), InitError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
}

/// Installation failures are reported on stderr.
fn init_tracing(format: LogFormat) {
    if let Err(err) = try_init_tracing(format) {
        eprintln!("capstan: failed to install tracing subscriber: {err}");
    }
}

async fn run(cli: Cli, settings: Settings) -> CliResult<String> {
    match cli.command {
        Commands::Inspect => render(&inspect(&settings).await?, cli.output),
        Commands::Merge { .. } => render(&merge(&settings).await?, cli.output),
        Commands::Resolve { .. } => render(&resolve(&settings).await?, cli.output),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Merge { config } | Commands::Resolve { config } => config.clone(),
        Commands::Inspect => None,
    };
    let settings = SettingsBuilder::from_env().map(|builder| {
        builder
            .bundle(cli.bundle.clone())
            .config(config)
            .log_format(cli.log_format)
            .build()
    });

    let settings = match settings {
        Ok(settings) => settings,
        Err(err) => {
            init_tracing(cli.log_format.unwrap_or_default());
            tracing::error!(error = %err, "Invalid settings");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(settings.log_format);

    match run(cli, settings).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "Command failed");
            ExitCode::FAILURE
        }
    }
}
