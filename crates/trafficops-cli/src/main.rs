use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod console;
mod logging;

#[derive(Parser)]
#[command(name = "trafficops")]
#[command(about = "TrafficOps CLI - upload, preprocess and analyze traffic sessions", long_about = None)]
struct Cli {
    /// Configuration directory (defaults to ~/.config/trafficops)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    /// Also write logs to a daily file under <config_dir>/logs
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload both files, preprocess them and run the bottleneck model
    Analyze {
        /// Road network file (.geojson or .json)
        #[arg(long, value_name = "FILE")]
        roads: PathBuf,

        /// GPS trajectories file (.csv)
        #[arg(long, value_name = "FILE")]
        gps: PathBuf,

        /// Stop once preprocessing is complete
        #[arg(long)]
        no_run: bool,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Show the status of a session
    Status {
        session_id: String,

        /// Keep polling while the session is preprocessing
        #[arg(long)]
        wait: bool,
    },
    /// List the currently active algorithms
    Algorithms,
    /// Run the bottleneck model on an existing ready session
    Run {
        #[arg(long, value_name = "ID")]
        session: String,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Inspect or restore the backend's active session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show the backend's active session
    Active,
    /// Restore the bundled sample session
    RestoreSample,
}

/// Model run parameters; missing values come from `[defaults]` in config.toml.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Number of bottlenecks to find (5-20)
    #[arg(short, long)]
    pub k: Option<u32>,

    /// Prediction horizon in minutes (5, 15 or 30)
    #[arg(long, value_name = "MINUTES")]
    pub horizon: Option<u32>,

    /// Algorithm model type, e.g. LIM or LTM
    #[arg(short, long)]
    pub model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(cli.log_file, cli.config_dir.as_deref())?;
    let ctx = commands::CliContext::load(cli.config_dir.as_deref()).await?;

    match cli.command {
        Commands::Analyze {
            roads,
            gps,
            no_run,
            run,
        } => commands::analyze::execute(&ctx, roads, gps, no_run, &run).await?,
        Commands::Status { session_id, wait } => {
            commands::status::execute(&ctx, session_id, wait).await?
        }
        Commands::Algorithms => commands::algorithms::execute(&ctx).await?,
        Commands::Run { session, run } => commands::run::execute(&ctx, session, &run).await?,
        Commands::Session { action } => match action {
            SessionAction::Active => commands::session::active(&ctx).await?,
            SessionAction::RestoreSample => commands::session::restore_sample(&ctx).await?,
        },
    }

    Ok(())
}
