//! CSV file result store.
//!
//! Layout under the base directory:
//! - `price_periods/<window>.csv`: one row per policy, keyed by `Strategy`
//! - `strategies/<policy>.csv`: one row per window, keyed by `Price Period`
//! - `returns_history/<policy>_<window>_returns_history.csv`

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::engine::HistoryRow;
use crate::domain::error::StratbenchError;
use crate::domain::metrics::{HISTORY_COLUMNS, SUMMARY_COLUMNS, SummaryRecord, history_fields};
use crate::ports::result_port::ResultStore;

pub const WINDOW_TABLE_DIR: &str = "price_periods";
pub const POLICY_TABLE_DIR: &str = "strategies";
pub const HISTORY_DIR: &str = "returns_history";

const WINDOW_TABLE_KEY: &str = "Strategy";
const POLICY_TABLE_KEY: &str = "Price Period";

pub struct CsvResultStore {
    base_path: PathBuf,
}

/// Percent-escape path separators, `:` and `%` itself, plus any of `extra`,
/// so distinct names never share a file.
fn escape_name(name: &str, extra: &[char]) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '/' | '\\' | ':' | '%') || extra.contains(&c) {
            out.push_str(&format!("%{:02X}", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

fn file_stem(name: &str) -> String {
    escape_name(name, &[])
}

fn csv_error(path: &Path, e: csv::Error) -> StratbenchError {
    StratbenchError::Io(std::io::Error::other(format!("{}: {}", path.display(), e)))
}

/// Keyed rows of one table. A table whose header differs from `header` is
/// an error and is left as it is.
fn read_table(path: &Path, header: &[String]) -> Result<BTreeMap<String, Vec<String>>, StratbenchError> {
    let mut rows = BTreeMap::new();
    if !path.is_file() {
        return Ok(rows);
    }
    let mut rdr = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    let existing: Vec<String> = rdr
        .headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if existing != header {
        return Err(StratbenchError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "{}: unexpected result table header [{}], expected [{}]",
                path.display(),
                existing.join(", "),
                header.join(", ")
            ),
        )));
    }
    for record in rdr.records() {
        let record = record.map_err(|e| csv_error(path, e))?;
        let mut fields = record.iter().map(str::to_string);
        if let Some(key) = fields.next() {
            rows.insert(key, fields.collect());
        }
    }
    Ok(rows)
}

fn write_rows<I, R>(path: &Path, header: &[String], rows: I) -> Result<(), StratbenchError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = String>,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut wtr = csv::Writer::from_path(&tmp).map_err(|e| csv_error(&tmp, e))?;
        wtr.write_record(header).map_err(|e| csv_error(&tmp, e))?;
        for row in rows {
            wtr.write_record(row.into_iter()).map_err(|e| csv_error(&tmp, e))?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

impl CsvResultStore {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn window_table_path(&self, window_name: &str) -> PathBuf {
        self.base_path
            .join(WINDOW_TABLE_DIR)
            .join(format!("{}.csv", file_stem(window_name)))
    }

    pub fn policy_table_path(&self, policy_name: &str) -> PathBuf {
        self.base_path
            .join(POLICY_TABLE_DIR)
            .join(format!("{}.csv", file_stem(policy_name)))
    }

    pub fn history_path(&self, policy_name: &str, window_name: &str) -> PathBuf {
        self.base_path.join(HISTORY_DIR).join(format!(
            "{}_{}_returns_history.csv",
            escape_name(policy_name, &['_']),
            escape_name(window_name, &['_'])
        ))
    }

    fn upsert_row(&self, path: &Path, key_column: &str, key: &str, fields: Vec<String>) -> Result<(), StratbenchError> {
        let header: Vec<String> = std::iter::once(key_column)
            .chain(SUMMARY_COLUMNS.iter().map(|(_, h)| *h))
            .map(str::to_string)
            .collect();
        let mut rows = read_table(path, &header)?;
        rows.insert(key.to_string(), fields);
        write_rows(
            path,
            &header,
            rows.into_iter().map(|(k, v)| std::iter::once(k).chain(v)),
        )
    }
}

impl ResultStore for CsvResultStore {
    fn upsert_summary(&mut self, summary: &SummaryRecord) -> Result<(), StratbenchError> {
        let fields = summary.fields()?;
        self.upsert_row(
            &self.window_table_path(&summary.window_name),
            WINDOW_TABLE_KEY,
            &summary.policy_name,
            fields.clone(),
        )?;
        self.upsert_row(
            &self.policy_table_path(&summary.policy_name),
            POLICY_TABLE_KEY,
            &summary.window_name,
            fields,
        )?;
        debug!(policy = %summary.policy_name, window = %summary.window_name, "summary written");
        Ok(())
    }

    fn write_history(
        &mut self,
        policy_name: &str,
        window_name: &str,
        history: &[HistoryRow],
    ) -> Result<(), StratbenchError> {
        let header: Vec<String> = HISTORY_COLUMNS.iter().map(|c| c.to_string()).collect();
        write_rows(
            &self.history_path(policy_name, window_name),
            &header,
            history.iter().map(history_fields),
        )
    }
}
