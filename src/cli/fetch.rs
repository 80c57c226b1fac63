use super::ui;
use crate::core::config::FetchSettings;
use crate::core::{RateError, RateRow, RateSource, Resolved, WindowSearcher};
use crate::store::{RateStore, Upsert};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use indicatif::ProgressBar;
use tracing::{info, warn};

/// What happened to one requested currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyOutcome {
    Stored {
        row: RateRow,
        searched_days: u32,
        upsert: Upsert,
    },
    NotFound {
        currency: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub to_date: NaiveDate,
    pub max_lookback_days: u32,
    pub outcomes: Vec<CurrencyOutcome>,
}

impl FetchReport {
    pub fn stored_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, CurrencyOutcome::Stored { .. }))
            .count()
    }

    /// Currencies for which no rate was found within the max lookback.
    pub fn not_found(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                CurrencyOutcome::NotFound { currency } => Some(currency.as_str()),
                CurrencyOutcome::Stored { .. } => None,
            })
            .collect()
    }
}

/// Resolves every requested currency in order, then persists all found rates
/// in a single transaction.
///
/// A hard error on any currency aborts the run before anything is written.
pub async fn run(
    settings: &FetchSettings,
    source: &dyn RateSource,
    store: &RateStore,
) -> Result<FetchReport> {
    let searcher = WindowSearcher::new(source, settings.bounds);

    let pb = ui::new_progress_bar(settings.quotes.len() as u64, true);
    let resolved = resolve_quotes(&searcher, settings, &pb).await;
    pb.finish_and_clear();
    let resolved = resolved?;

    let rows: Vec<RateRow> = resolved
        .iter()
        .filter_map(|(_, found)| found.as_ref().map(|r| r.row.clone()))
        .collect();
    let mut upserts = store
        .apply(&rows)
        .context("Failed to store resolved rates")?
        .into_iter();

    // `apply` yields one upsert per row, in row order, so only found
    // currencies consume from it.
    let mut outcomes = Vec::with_capacity(resolved.len());
    for (currency, found) in resolved {
        match found {
            Some(Resolved { row, window }) => {
                let upsert = upserts
                    .next()
                    .with_context(|| format!("Missing store result for {currency}"))?;
                info!(
                    currency = %currency,
                    unit = row.weight,
                    price = %row.value,
                    date = %row.rate_date,
                    searched_days = window.days,
                    "Stored rate"
                );
                outcomes.push(CurrencyOutcome::Stored {
                    row,
                    searched_days: window.days,
                    upsert,
                });
            }
            None => outcomes.push(CurrencyOutcome::NotFound { currency }),
        }
    }

    Ok(FetchReport {
        to_date: settings.to_date,
        max_lookback_days: settings.bounds.max(),
        outcomes,
    })
}

async fn resolve_quotes(
    searcher: &WindowSearcher<'_>,
    settings: &FetchSettings,
    pb: &ProgressBar,
) -> Result<Vec<(String, Option<Resolved>)>> {
    let mut resolved = Vec::with_capacity(settings.quotes.len());
    for currency in &settings.quotes {
        pb.set_message(currency.clone());
        let found = searcher
            .resolve(currency, settings.to_date)
            .await
            .with_context(|| format!("Failed to resolve rate for {currency}"))?;
        if found.is_none() {
            warn!(
                currency = %currency,
                max_lookback_days = settings.bounds.max(),
                to_date = %settings.to_date,
                "No rate data found"
            );
        }
        pb.inc(1);
        resolved.push((currency.clone(), found));
    }
    Ok(resolved)
}

/// Prints the stored rates table, a warning per skipped currency and a summary.
pub fn render(report: &FetchReport) {
    if report.stored_count() > 0 {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Label"),
            ui::header_cell("Date"),
            ui::header_cell("Unit"),
            ui::header_cell("Price"),
            ui::header_cell("Searched (days)"),
            ui::header_cell("Status"),
        ]);
        for outcome in &report.outcomes {
            if let CurrencyOutcome::Stored {
                row,
                searched_days,
                upsert,
            } = outcome
            {
                table.add_row(vec![
                    comfy_table::Cell::new(&row.currency_code),
                    comfy_table::Cell::new(row.label()),
                    comfy_table::Cell::new(row.rate_date),
                    ui::number_cell(row.weight),
                    ui::number_cell(row.value),
                    ui::number_cell(searched_days),
                    ui::status_cell(*upsert == Upsert::Created),
                ]);
            }
        }
        println!("{table}");
    }

    for currency in report.not_found() {
        println!(
            "{}",
            ui::style_text(
                &not_found_message(report, currency),
                ui::StyleType::Warning
            )
        );
    }

    println!(
        "{}",
        ui::style_text(
            &format!("Done. Stored/updated {} rate(s).", report.stored_count()),
            ui::StyleType::Success
        )
    );
}

fn not_found_message(report: &FetchReport, currency: &str) -> String {
    format!(
        "No BCM data found for {} in the last {} day(s) ending {}.",
        currency, report.max_lookback_days, report.to_date
    )
}

/// True when `err` stems from the rate source rather than storage or setup.
pub fn is_rate_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.downcast_ref::<RateError>().is_some())
}
