//! Rate rows and the remote source abstraction

use super::error::RateError;
use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use std::fmt::Display;

/// A validated record from the rate-publishing source.
///
/// `value` is the quoted price for `weight` units of `currency_code`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateRow {
    pub rate_date: NaiveDate,
    pub currency_code: String,
    pub value: Decimal,
    pub weight: i64,
    pub display_name: String,
}

impl RateRow {
    /// Label to store for the currency: the English name, or the code itself.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.currency_code
        } else {
            &self.display_name
        }
    }
}

/// Closed date interval `[to - days, to]` used for one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub days: u32,
}

impl DateWindow {
    pub fn ending_at(to: NaiveDate, days: u32) -> Self {
        let from = to
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { from, to, days }
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.from, self.to)
    }
}

/// Fetches the raw JSON payload published for one currency over a window.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_range(
        &self,
        currency: &str,
        window: &DateWindow,
    ) -> Result<serde_json::Value, RateError>;
}
