//! Chatloom CLI entry point.
//!
//! Commands:
//! - `chat`     - Interactive chat session (default when no command given)
//! - `threads`  - List stored conversation threads
//! - `clear`    - Delete all stored threads

use clap::{Parser, Subcommand};

mod session;

#[derive(Parser)]
#[command(
    name = "chatloom",
    about = "Chatloom - a tool-using chat agent for the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,

    /// List stored conversation threads, most recent first
    Threads,

    /// Delete all stored threads
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => session::run_chat().await?,
        Commands::Threads => session::list_threads().await?,
        Commands::Clear => session::clear_threads().await?,
    }

    Ok(())
}
