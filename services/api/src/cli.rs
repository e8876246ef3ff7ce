use crate::demo::{
    run_demo, run_import, run_report, run_scan, DemoArgs, ImportArgs, ReportArgs, ScanArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use statekeeper::config::AppConfig;
use statekeeper::error::AppError;
use statekeeper::telemetry;

#[derive(Parser, Debug)]
#[command(
    name = "statekeeper",
    about = "Track multi-state license obligations, renewals and audit history",
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
    /// File renewal tasks for licenses expiring inside the renewal window
    Scan(ScanArgs),
    /// Manage the license roster
    Licenses {
        #[command(subcommand)]
        command: LicensesCommand,
    },
    /// Print a per-state compliance summary
    Report(ReportArgs),
    /// Run an in-memory walkthrough of the whole lifecycle
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum LicensesCommand {
    /// Merge a license roster CSV export into the stored roster
    Import(ImportArgs),
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

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match command {
        Command::Serve(args) => server::run(config, args).await,
        Command::Scan(args) => run_scan(&config, args),
        Command::Licenses {
            command: LicensesCommand::Import(args),
        } => run_import(&config, args),
        Command::Report(args) => run_report(&config, args),
        Command::Demo(args) => run_demo(&config, args),
    }
}
