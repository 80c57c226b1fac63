use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::process::ExitCode;
use mrufx::core::config::FetchOverrides;
use mrufx::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Directory holding the rate store
    #[arg(long, global = true, env = "MRUFX_DATA_PATH")]
    data_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct FetchArgs {
    /// Currencies to fetch (e.g. USD EUR CNY)
    #[arg(long, num_args = 0.., value_delimiter = ',', env = "BCM_QUOTES")]
    quotes: Option<Vec<String>>,

    /// BCM API base URL
    #[arg(long, env = "BCM_API_BASE")]
    api_base: Option<String>,

    /// Target end date YYYY-MM-DD (default: today)
    #[arg(long, env = "BCM_TO_DATE")]
    to_date: Option<String>,

    /// Initial lookback window in days (default: 30)
    #[arg(long, env = "BCM_LOOKBACK_DAYS", allow_negative_numbers = true)]
    lookback_days: Option<i64>,

    /// Max lookback days if still empty (default: 365)
    #[arg(long, env = "BCM_MAX_LOOKBACK_DAYS", allow_negative_numbers = true)]
    max_lookback_days: Option<i64>,

    /// User-Agent header sent to the rate source
    #[arg(long, env = "BCM_USER_AGENT")]
    user_agent: Option<String>,

    /// Referer header sent to the rate source
    #[arg(long, env = "BCM_REFERER")]
    referer: Option<String>,

    /// Request timeout in seconds (default: 25)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl From<FetchArgs> for FetchOverrides {
    fn from(args: FetchArgs) -> FetchOverrides {
        FetchOverrides {
            quotes: args.quotes,
            api_base: args.api_base,
            to_date: args.to_date,
            lookback_days: args.lookback_days,
            max_lookback_days: args.max_lookback_days,
            user_agent: args.user_agent,
            referer: args.referer,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch the latest BCM reference rates and store them
    Fetch(FetchArgs),
    /// Display stored rates
    Show {
        /// Only show rates for this currency
        currency: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    exit_code(dispatch(cli).await)
}

async fn dispatch(cli: Cli) -> Result<()> {
    let config_path = cli.config_path.as_deref();
    let data_path = cli.data_path.as_deref();
    let result = match cli.command {
        Some(Commands::Setup) => mrufx::cli::setup::setup(),
        Some(Commands::Fetch(args)) => {
            mrufx::run_command(mrufx::AppCommand::Fetch(args.into()), config_path, data_path).await
        }
        Some(Commands::Show { currency }) => {
            mrufx::run_command(mrufx::AppCommand::Show { currency }, config_path, data_path).await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };
    result
}

/// Reports a failure once, through the log, and maps it to the exit status.
fn exit_code(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Application failed");
            ExitCode::FAILURE
        }
    }
}
