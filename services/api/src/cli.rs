use crate::demo::{run_demo, DemoArgs};
use crate::score::{run_score, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use pmw_review::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "PMW Review Portal",
    about = "Serve, demonstrate and score the PMW proposal review workflow",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the reference portal API (default command)
    Serve(ServeArgs),
    /// Walk one reviewer through accept, reject, draft and submit
    Demo(DemoArgs),
    /// Score a JSON sheet against a stage rubric without any backend
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Distribution CSV used to seed assignments (overrides PORTAL_DISTRIBUTION_CSV)
    #[arg(long)]
    pub(crate) distribution_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
        Command::Score(args) => run_score(args),
    }
}
