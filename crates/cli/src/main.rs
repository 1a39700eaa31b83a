use clap::{Parser, Subcommand};

mod commands;

use commands::{ResolveArgs, RunArgs};

#[derive(Parser)]
#[command(name = "rj")]
#[command(about = "Sustained-move options trader for TD Ameritrade", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the instrument and trade sustained moves until Ctrl+C
    Run(RunArgs),
    /// Resolve the contract and bracket a trigger would trade right now, without ordering
    Resolve(ResolveArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.command {
        Commands::Run(args) => args.log_file.as_deref(),
        Commands::Resolve(_) => None,
    };

    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await?,
        Commands::Resolve(args) => commands::resolve::run(args).await?,
    }

    Ok(())
}
