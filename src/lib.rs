pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::{AppConfig, FetchOverrides};
use anyhow::Result;
use tracing::{debug, error, info};

pub enum AppCommand {
    /// Resolve and store the latest rate for each requested currency
    Fetch(FetchOverrides),
    /// List stored rates, optionally for one currency
    Show { currency: Option<String> },
}

pub async fn run_command(
    command: AppCommand,
    config_path: Option<&str>,
    data_path: Option<&str>,
) -> Result<()> {
    info!("mrufx starting...");

    let mut config = AppConfig::load_or_default(config_path)?;
    if let Some(path) = data_path {
        config.data_path = Some(path.to_string());
    }
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Fetch(overrides) => {
            let today = chrono::Local::now().date_naive();
            let settings = config.fetch_settings(&overrides, today)?;
            debug!("Fetch settings: {settings:#?}");

            let provider = providers::BcmProvider::new(&settings.source)?;
            let store = store::RateStore::open(&config.default_data_path()?)?;

            let report = cli::fetch::run(&settings, &provider, &store)
                .await
                .inspect_err(|e| {
                    if cli::fetch::is_rate_error(e) {
                        error!("Rate source failed, no rates were stored in this run");
                    }
                })?;
            cli::fetch::render(&report);
            Ok(())
        }
        AppCommand::Show { currency } => {
            let store = store::RateStore::open(&config.default_data_path()?)?;
            cli::show::run(&store, currency.as_deref())
        }
    }
}
