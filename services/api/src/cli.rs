use crate::demo::{run_demo, DemoArgs};
use crate::housekeeping::{run_cleanup, run_repair, CleanupArgs, RepairArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use coderr::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Coderr",
    about = "Run and maintain the Coderr freelance marketplace backend",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Manage throwaway guest accounts
    Guests {
        #[command(subcommand)]
        command: GuestCommand,
    },
    /// Normalize stored offer tiers and restore missing ones
    Repair(RepairArgs),
    /// Create the demo logins and a sample offer, then print their tokens
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum GuestCommand {
    /// Delete guest accounts older than the retention window
    Cleanup(CleanupArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the JSON snapshot file backing the marketplace
    #[arg(long)]
    pub(crate) data_file: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Guests {
            command: GuestCommand::Cleanup(args),
        } => run_cleanup(args),
        Command::Repair(args) => run_repair(args),
        Command::Demo(args) => run_demo(args),
    }
}
