//! Backward-expanding window search over the rate source

use super::error::{ConfigError, RateError};
use super::rate::{DateWindow, RateRow, RateSource};
use super::selector;
use chrono::NaiveDate;
use tracing::{debug, instrument};

/// Validated lookback configuration, in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackBounds {
    initial: u32,
    max: u32,
}

impl LookbackBounds {
    pub fn new(initial: i64, max: i64) -> Result<Self, ConfigError> {
        if initial <= 0 {
            return Err(ConfigError::NonPositiveLookback(initial));
        }
        if max < initial {
            return Err(ConfigError::MaxBelowInitial { initial, max });
        }
        let initial = u32::try_from(initial).unwrap_or(u32::MAX);
        let max = u32::try_from(max).unwrap_or(u32::MAX);
        Ok(Self { initial, max })
    }

    pub fn initial(&self) -> u32 {
        self.initial
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

/// Window sizes queried in order: `initial`, `2 * initial`, ... and finally
/// exactly `max`, which is always the last window.
pub fn window_schedule(bounds: LookbackBounds) -> impl Iterator<Item = u32> {
    let LookbackBounds { initial, max } = bounds;
    std::iter::successors(Some(initial), move |&window| {
        (window < max).then(|| window.saturating_add(initial).min(max))
    })
}

/// A row found by [`WindowSearcher::resolve`] and the window that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub row: RateRow,
    pub window: DateWindow,
}

pub struct WindowSearcher<'a> {
    source: &'a dyn RateSource,
    bounds: LookbackBounds,
}

impl<'a> WindowSearcher<'a> {
    pub fn new(source: &'a dyn RateSource, bounds: LookbackBounds) -> Self {
        Self { source, bounds }
    }

    /// Queries progressively wider windows ending at `target` until one yields
    /// a valid row. `Ok(None)` means the max lookback was exhausted.
    ///
    /// Transport and parse failures are returned immediately and never retried.
    #[instrument(name = "WindowSearch", skip(self), fields(currency = %currency, target = %target))]
    pub async fn resolve(
        &self,
        currency: &str,
        target: NaiveDate,
    ) -> Result<Option<Resolved>, RateError> {
        for days in window_schedule(self.bounds) {
            let window = DateWindow::ending_at(target, days);
            debug!(%window, days, "Querying rate source");

            let payload = self.source.fetch_range(currency, &window).await?;
            if let Some(row) = selector::select(&payload, currency)? {
                debug!(date = %row.rate_date, value = %row.value, "Found rate");
                return Ok(Some(Resolved { row, window }));
            }
        }
        Ok(None)
    }
}
