//! CSV file price and sentiment adapter.
//!
//! A price window is `<base_path>/<window>.csv` with a header row naming at
//! least `timestamp` and one of `fraction_price` / `decimal_price`. Any other
//! column (such as a leading `index`) is ignored.

use crate::domain::error::StratbenchError;
use crate::domain::exact::{DISPLAY_DIGITS, Exact};
use crate::domain::price_series::{PriceObservation, PriceSeries};
use crate::domain::sentiment::{SENTIMENT_DATE_FORMAT, SentimentIndex};
use crate::ports::price_port::PriceSource;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

pub struct CsvPriceAdapter {
    base_path: PathBuf,
}

impl CsvPriceAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, window: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", window))
    }
}

struct PriceColumns {
    timestamp: usize,
    fraction: Option<usize>,
    decimal: Option<usize>,
}

fn column(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

fn parse_timestamp(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        // pandas writes integral floats as `1514764800.0`
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.is_finite())
            .map(|v| v as i64)
    })
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

impl PriceSource for CsvPriceAdapter {
    fn load_window(&self, name: &str) -> Result<PriceSeries, StratbenchError> {
        let path = self.csv_path(name);
        if !path.is_file() {
            return Err(StratbenchError::NoData {
                what: format!("price window {} ({})", name, path.display()),
            });
        }
        let content = fs::read_to_string(&path)?;
        let bad = |reason: String| StratbenchError::InvalidSeries {
            window: name.to_string(),
            reason,
        };

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| bad(format!("CSV header error: {}", e)))?
            .clone();
        let columns = PriceColumns {
            timestamp: column(&headers, "timestamp")
                .ok_or_else(|| bad("missing timestamp column".into()))?,
            fraction: column(&headers, "fraction_price"),
            decimal: column(&headers, "decimal_price"),
        };
        if columns.fraction.is_none() && columns.decimal.is_none() {
            return Err(bad("needs a fraction_price or decimal_price column".into()));
        }

        let mut rows = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| bad(format!("CSV parse error: {}", e)))?;
            let field = |idx: usize, what: &str| {
                record
                    .get(idx)
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| bad(format!("row {}: missing {}", line + 1, what)))
            };

            let raw_ts = field(columns.timestamp, "timestamp")?;
            let timestamp = parse_timestamp(raw_ts)
                .ok_or_else(|| bad(format!("row {}: invalid timestamp '{}'", line + 1, raw_ts)))?;

            let display = match columns.decimal {
                Some(idx) => {
                    let raw = field(idx, "decimal_price")?;
                    Some(parse_decimal(raw).ok_or_else(|| {
                        bad(format!("row {}: invalid decimal_price '{}'", line + 1, raw))
                    })?)
                }
                None => None,
            };
            let exact = match columns.fraction {
                Some(idx) => {
                    let raw = field(idx, "fraction_price")?;
                    Some(Exact::from_str(raw).map_err(|_| {
                        bad(format!("row {}: invalid fraction_price '{}'", line + 1, raw))
                    })?)
                }
                None => None,
            };

            let observation = match (exact, display) {
                (Some(exact_price), Some(display_price)) => PriceObservation {
                    timestamp,
                    exact_price,
                    display_price,
                },
                (Some(exact_price), None) => PriceObservation {
                    timestamp,
                    display_price: exact_price.to_display(DISPLAY_DIGITS)?,
                    exact_price,
                },
                (None, Some(display_price)) => PriceObservation::from_display(timestamp, display_price),
                (None, None) => return Err(bad(format!("row {}: no price", line + 1))),
            };
            rows.push(observation);
        }

        debug!(window = name, rows = rows.len(), path = %path.display(), "loaded price window");
        PriceSeries::new(name, rows)
    }

    fn list_windows(&self) -> Result<Vec<String>, StratbenchError> {
        let mut windows = Vec::new();
        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                windows.push(stem.to_string());
            }
        }
        windows.sort();
        Ok(windows)
    }
}

/// Load a daily sentiment file with `date` (`%m-%d-%Y`) and `value` columns.
pub fn load_sentiment(path: &Path) -> Result<SentimentIndex, StratbenchError> {
    if !path.is_file() {
        return Err(StratbenchError::NoData {
            what: format!("sentiment file {}", path.display()),
        });
    }
    let content = fs::read_to_string(path)?;
    let bad = |reason: String| StratbenchError::InvalidSeries {
        window: "sentiment".to_string(),
        reason,
    };

    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| bad(format!("CSV header error: {}", e)))?
        .clone();
    let date_idx = column(&headers, "date").ok_or_else(|| bad("missing date column".into()))?;
    let value_idx = column(&headers, "value").ok_or_else(|| bad("missing value column".into()))?;

    let mut readings = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| bad(format!("CSV parse error: {}", e)))?;
        let raw_date = record.get(date_idx).unwrap_or_default().trim();
        let raw_value = record.get(value_idx).unwrap_or_default().trim();
        let date = NaiveDate::parse_from_str(raw_date, SENTIMENT_DATE_FORMAT)
            .map_err(|e| bad(format!("invalid date '{}': {}", raw_date, e)))?;
        let value: u8 = raw_value
            .parse()
            .map_err(|_| bad(format!("invalid value '{}' on {}", raw_value, raw_date)))?;
        readings.push((date, value));
    }
    SentimentIndex::new(readings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        fs::write(
            path.join("Flat Week.csv"),
            "index,timestamp,fraction_price,decimal_price\n\
             0,0,3397925/4,849.4812\n\
             1,60,850,850.0\n\
             2,120,851,851.0\n",
        )
        .unwrap();
        fs::write(
            path.join("Decimal Only.csv"),
            "timestamp,decimal_price\n0,10.5\n60,11\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "not a window").unwrap();

        (dir, path)
    }

    #[test]
    fn load_window_prefers_fraction_price() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let series = adapter.load_window("Flat Week").unwrap();
        assert_eq!(series.name(), "Flat Week");
        assert_eq!(series.len(), 3);
        assert_eq!(series.first().exact_price, Exact::ratio(3397925, 4).unwrap());
        assert_eq!(series.first().display_price, Decimal::new(8494812, 4));
        assert_eq!(series.end_time(), 120);
    }

    #[test]
    fn load_window_with_decimal_only() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);

        let series = adapter.load_window("Decimal Only").unwrap();
        assert_eq!(series.first().exact_price, Exact::ratio(21, 2).unwrap());
    }

    #[test]
    fn missing_window_is_no_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        assert!(matches!(
            adapter.load_window("Nope"),
            Err(StratbenchError::NoData { .. })
        ));
    }

    #[test]
    fn malformed_rows_are_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.csv"), "timestamp,decimal_price\nabc,1\n").unwrap();
        fs::write(dir.path().join("noprice.csv"), "timestamp,volume\n0,1\n").unwrap();
        fs::write(dir.path().join("backwards.csv"), "timestamp,decimal_price\n60,1\n0,1\n").unwrap();
        let adapter = CsvPriceAdapter::new(dir.path().to_path_buf());

        for window in ["bad", "noprice", "backwards"] {
            assert!(matches!(
                adapter.load_window(window),
                Err(StratbenchError::InvalidSeries { .. })
            ));
        }
    }

    #[test]
    fn float_timestamps_accepted() {
        assert_eq!(parse_timestamp("1514764800.0"), Some(1_514_764_800));
        assert_eq!(parse_timestamp("1514764800.5"), None);
    }

    #[test]
    fn list_windows_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvPriceAdapter::new(path);
        assert_eq!(adapter.list_windows().unwrap(), vec!["Decimal Only", "Flat Week"]);
    }

    #[test]
    fn sentiment_file_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fear_and_greed.csv");
        fs::write(&path, "index,date,value\n0,02-01-2018,30\n1,02-02-2018,15\n").unwrap();

        let index = load_sentiment(&path).unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.on(NaiveDate::from_ymd_opt(2018, 2, 2).unwrap()), Some(15));
    }

    #[test]
    fn sentiment_bad_date_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fng.csv");
        fs::write(&path, "date,value\n2018-02-01,30\n").unwrap();
        assert!(matches!(
            load_sentiment(&path),
            Err(StratbenchError::InvalidSeries { .. })
        ));
    }
}
