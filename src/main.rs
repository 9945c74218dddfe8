use anyhow::Result;
use clap::{Parser, Subcommand};
use greenroom::Config;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(
    name = "greenroom",
    about = "AI mock-interview orchestration backend",
    version
)]
struct Cli {
    /// Path to config.toml (missing file means defaults + env)
    #[arg(short, long, default_value = "greenroom.toml")]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Validate config and print the effective non-secret settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = Config::load(&cli.config)?;
            greenroom::app::run(config).await
        }
        Command::CheckConfig => {
            let config = Config::load(&cli.config)?;
            println!("config ok: {}", config.startup_summary());
            Ok(())
        }
    }
}
