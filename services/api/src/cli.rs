use crate::server;
use crate::submit::{run_batch, run_submit, BatchArgs, SubmitArgs};
use clap::{Args, Parser, Subcommand};
use resume_intake::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Résumé Intake",
    about = "Store applicant résumés and record applications from the command line or over HTTP",
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
    /// Submit a single application
    Submit(SubmitArgs),
    /// Submit every applicant listed in a CSV manifest, one at a time
    Batch(BatchArgs),
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
        Command::Submit(args) => run_submit(args).await,
        Command::Batch(args) => run_batch(args).await,
    }
}
