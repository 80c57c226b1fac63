use super::ui;
use crate::store::RateStore;
use anyhow::Result;
use comfy_table::{Cell, Table};
use std::collections::HashMap;

/// Builds the stored-rates table, `None` when nothing matches.
pub fn rates_table(store: &RateStore, currency: Option<&str>) -> Result<Option<Table>> {
    let rates = store.rates(currency)?;
    if rates.is_empty() {
        return Ok(None);
    }

    let labels: HashMap<String, String> = store
        .currencies()?
        .into_iter()
        .map(|c| (c.code, c.label))
        .collect();

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Label"),
        ui::header_cell("Date"),
        ui::header_cell("Unit"),
        ui::header_cell("Price"),
    ]);
    for rate in &rates {
        let label = labels.get(&rate.currency).map_or("", String::as_str);
        table.add_row(vec![
            Cell::new(&rate.currency),
            Cell::new(label),
            Cell::new(rate.date),
            ui::number_cell(rate.unit),
            ui::number_cell(rate.price),
        ]);
    }
    Ok(Some(table))
}

pub fn run(store: &RateStore, currency: Option<&str>) -> Result<()> {
    match rates_table(store, currency)? {
        Some(table) => {
            println!("{}", ui::style_text("Stored rates", ui::StyleType::Title));
            println!("{table}");
        }
        None => println!(
            "{}",
            ui::style_text("No stored rates.", ui::StyleType::Subtle)
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RateRow;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tempfile::tempdir;

    #[test]
    fn test_rates_table() {
        let dir = tempdir().unwrap();
        let store = RateStore::open(dir.path()).unwrap();
        assert!(rates_table(&store, None).unwrap().is_none());

        store
            .apply(&[RateRow {
                rate_date: NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
                currency_code: "USD".to_string(),
                value: Decimal::from_str("36.5").unwrap(),
                weight: 1,
                display_name: "US Dollar".to_string(),
            }])
            .unwrap();

        let table = rates_table(&store, Some("usd")).unwrap().unwrap();
        let rendered = table.to_string();
        assert!(rendered.contains("US Dollar"));
        assert!(rendered.contains("2024-03-08"));
        assert!(rendered.contains("36.5"));

        assert!(rates_table(&store, Some("EUR")).unwrap().is_none());
    }
}
