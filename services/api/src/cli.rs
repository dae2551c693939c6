use crate::demo::{run_cycle_demo, CycleArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use clinic_roster::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Clinic Roster Service",
    about = "Run the staff roster service or exercise its weekly evaluation cycle",
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
    /// Run one evaluation cycle against seeded in-memory data and print the summary
    Cycle(CycleArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Cycle(args) => run_cycle_demo(args).await,
    }
}
