#![allow(dead_code)]

use rust_decimal::Decimal;
use stratbench::domain::backtest::BacktestConfig;
use stratbench::domain::error::StratbenchError;
use stratbench::domain::exact::Exact;
use stratbench::domain::price_series::{PriceObservation, PriceSeries};
use stratbench::ports::price_port::PriceSource;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const MINUTE: i64 = 60;
pub const DAY: i64 = 86_400;

pub struct MockPriceSource {
    pub windows: BTreeMap<String, PriceSeries>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            windows: BTreeMap::new(),
        }
    }

    pub fn with_window(mut self, series: PriceSeries) -> Self {
        self.windows.insert(series.name().to_string(), series);
        self
    }
}

impl PriceSource for MockPriceSource {
    fn load_window(&self, name: &str) -> Result<PriceSeries, StratbenchError> {
        self.windows
            .get(name)
            .cloned()
            .ok_or_else(|| StratbenchError::NoData {
                what: format!("price window {name}"),
            })
    }

    fn list_windows(&self) -> Result<Vec<String>, StratbenchError> {
        Ok(self.windows.keys().cloned().collect())
    }
}

pub fn ex(s: &str) -> Exact {
    s.parse().unwrap()
}

/// `(timestamp, price)` pairs with integer prices.
pub fn make_series(name: &str, points: &[(i64, i64)]) -> PriceSeries {
    PriceSeries::new(
        name,
        points
            .iter()
            .map(|&(t, p)| PriceObservation::from_display(t, Decimal::from(p)))
            .collect(),
    )
    .unwrap()
}

/// `count` rows `spacing` seconds apart starting at `start`, all at `price`.
pub fn flat_series(name: &str, start: i64, spacing: i64, count: usize, price: i64) -> PriceSeries {
    let points: Vec<(i64, i64)> = (0..count as i64).map(|i| (start + i * spacing, price)).collect();
    make_series(name, &points)
}

pub fn sample_config(step_interval: i64) -> BacktestConfig {
    BacktestConfig {
        step_interval,
        ..BacktestConfig::default()
    }
}

/// Write a `<dir>/<window>.csv` price file with fraction and decimal prices.
pub fn write_price_csv(dir: &Path, window: &str, rows: &[(i64, &str, &str)]) {
    let mut content = String::from("index,timestamp,fraction_price,decimal_price\n");
    for (i, (ts, fraction, decimal)) in rows.iter().enumerate() {
        content.push_str(&format!("{i},{ts},{fraction},{decimal}\n"));
    }
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(format!("{window}.csv")), content).unwrap();
}

/// Write a daily sentiment file, one row per `(MM-DD-YYYY, value)`.
pub fn write_sentiment_csv(path: &Path, rows: &[(&str, u8)]) {
    let mut content = String::from("index,date,value\n");
    for (i, (date, value)) in rows.iter().enumerate() {
        content.push_str(&format!("{i},{date},{value}\n"));
    }
    fs::write(path, content).unwrap();
}
