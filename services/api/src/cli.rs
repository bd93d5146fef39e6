use crate::report::{run_rank, RankArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use shortlist::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Shortlist",
    about = "Score, rank and review real-estate listings for a household",
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
    /// Import a listing export and print the ranked shortlist
    Rank(RankArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Listing export (CSV) to load before accepting requests
    #[arg(long)]
    pub(crate) listings: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Rank(args) => run_rank(args),
    }
}
