//! Durable storage for currencies and their resolved rates.

use crate::core::RateRow;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use fjall::{PartitionCreateOptions, PersistMode, TxKeyspace, TxPartitionHandle};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRecord {
    pub code: String,
    pub label: String,
}

/// Price of `unit` units of `currency` on `date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRecord {
    pub currency: String,
    pub date: NaiveDate,
    pub unit: i64,
    pub price: Decimal,
}

impl RateRecord {
    fn key(&self) -> String {
        rate_key(&self.currency, self.date)
    }
}

fn rate_key(currency: &str, date: NaiveDate) -> String {
    format!("{currency}/{date}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Created,
    Updated,
}

/// A fjall keyspace with one partition per entity, keyed by natural key.
pub struct RateStore {
    keyspace: TxKeyspace,
    currencies: TxPartitionHandle,
    rates: TxPartitionHandle,
}

impl RateStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        std::fs::create_dir_all(db_path)
            .with_context(|| format!("Failed to create data directory: {}", db_path.display()))?;

        let keyspace = fjall::Config::new(db_path.join("fjall_db"))
            .open_transactional()
            .with_context(|| format!("Failed to open rate store at {}", db_path.display()))?;
        let currencies =
            keyspace.open_partition("currencies", PartitionCreateOptions::default())?;
        let rates = keyspace.open_partition("rates", PartitionCreateOptions::default())?;

        Ok(Self {
            keyspace,
            currencies,
            rates,
        })
    }

    /// Upserts the currency and rate for every row in one write transaction.
    ///
    /// Nothing is visible until the final commit; an error on any row drops the
    /// transaction and discards every write staged before it.
    pub fn apply(&self, rows: &[RateRow]) -> Result<Vec<Upsert>> {
        let mut tx = self.keyspace.write_tx();
        let mut outcomes = Vec::with_capacity(rows.len());

        for row in rows {
            let currency = CurrencyRecord {
                code: row.currency_code.clone(),
                label: row.label().to_string(),
            };
            tx.insert(
                &self.currencies,
                currency.code.as_bytes(),
                serde_json::to_vec(&currency)?,
            );

            let rate = RateRecord {
                currency: row.currency_code.clone(),
                date: row.rate_date,
                unit: row.weight,
                price: row.value,
            };
            let key = rate.key();
            let outcome = if tx.get(&self.rates, key.as_bytes())?.is_some() {
                Upsert::Updated
            } else {
                Upsert::Created
            };
            tx.insert(&self.rates, key.as_bytes(), serde_json::to_vec(&rate)?);
            debug!(key = %key, ?outcome, "Staged rate upsert");
            outcomes.push(outcome);
        }

        tx.commit().context("Failed to commit rates")?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to flush rate store")?;
        Ok(outcomes)
    }

    pub fn currency(&self, code: &str) -> Result<Option<CurrencyRecord>> {
        match self.currencies.get(code.to_uppercase().as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn rate(&self, code: &str, date: NaiveDate) -> Result<Option<RateRecord>> {
        let key = rate_key(&code.to_uppercase(), date);
        match self.rates.get(key.as_bytes())? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// All stored rates, or those of one currency, ordered by currency then date.
    pub fn rates(&self, currency: Option<&str>) -> Result<Vec<RateRecord>> {
        let prefix = currency
            .map(|code| format!("{}/", code.to_uppercase()))
            .unwrap_or_default();
        let tx = self.keyspace.read_tx();

        let mut records = Vec::new();
        for item in tx.prefix(&self.rates, prefix.as_bytes()) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }

    pub fn currencies(&self) -> Result<Vec<CurrencyRecord>> {
        let tx = self.keyspace.read_tx();

        let mut records = Vec::new();
        for item in tx.iter(&self.currencies) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use tempfile::tempdir;

    fn row(code: &str, date: &str, value: &str, weight: i64, name: &str) -> RateRow {
        RateRow {
            rate_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            currency_code: code.to_string(),
            value: Decimal::from_str(value).unwrap(),
            weight,
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_apply_creates_records() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        let outcomes = store
            .apply(&[row("USD", "2024-03-08", "36.5", 1, "US Dollar")])
            .unwrap();

        assert_eq!(outcomes, vec![Upsert::Created]);
        assert_eq!(
            store.currency("usd").unwrap(),
            Some(CurrencyRecord {
                code: "USD".to_string(),
                label: "US Dollar".to_string(),
            })
        );
        let rate = store
            .rate("USD", NaiveDate::from_ymd_opt(2024, 3, 8).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(rate.unit, 1);
        assert_eq!(rate.price, Decimal::from_str("36.5").unwrap());
    }

    #[test]
    fn test_apply_is_idempotent_and_overwrites() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        store
            .apply(&[row("EUR", "2024-03-08", "43.0", 1, "")])
            .unwrap();
        let outcomes = store
            .apply(&[row("EUR", "2024-03-08", "43.2", 10, "Euro")])
            .unwrap();

        assert_eq!(outcomes, vec![Upsert::Updated]);
        let rates = store.rates(Some("EUR")).unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].unit, 10);
        assert_eq!(rates[0].price, Decimal::from_str("43.2").unwrap());
        assert_eq!(store.currency("EUR").unwrap().unwrap().label, "Euro");
        assert_eq!(store.currencies().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_label_falls_back_to_code() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        store.apply(&[row("CNY", "2024-03-08", "5.1", 1, "")]).unwrap();

        assert_eq!(store.currency("CNY").unwrap().unwrap().label, "CNY");
    }

    #[test]
    fn test_rates_ordered_and_filtered() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();

        store
            .apply(&[
                row("USD", "2024-03-08", "36.5", 1, "US Dollar"),
                row("EUR", "2024-03-07", "43.0", 1, "Euro"),
                row("EUR", "2024-03-05", "42.8", 1, "Euro"),
            ])
            .unwrap();

        let all = store.rates(None).unwrap();
        let keys: Vec<String> = all.iter().map(RateRecord::key).collect();
        assert_eq!(keys, vec!["EUR/2024-03-05", "EUR/2024-03-07", "USD/2024-03-08"]);

        assert_eq!(store.rates(Some("usd")).unwrap().len(), 1);
        assert!(store.rates(Some("GBP")).unwrap().is_empty());
    }
}
