//! SQLite result store.
//!
//! Both summary tables hold the same rendered columns; `policy_results` is
//! keyed `(policy_name, window_name)` and `window_results` is keyed
//! `(window_name, policy_name)`. Values are stored as the exported text so
//! exact quantities keep their rounding.

use crate::domain::engine::HistoryRow;
use crate::domain::error::StratbenchError;
use crate::domain::metrics::{HISTORY_COLUMNS, SUMMARY_COLUMNS, SummaryRecord, history_fields};
use crate::ports::config_port::ConfigPort;
use crate::ports::result_port::ResultStore;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, params_from_iter};

pub struct SqliteResultStore {
    pool: Pool<SqliteConnectionManager>,
}

fn query_error(e: rusqlite::Error) -> StratbenchError {
    StratbenchError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn summary_columns_sql() -> String {
    SUMMARY_COLUMNS
        .iter()
        .map(|(name, _)| format!("{name} TEXT NOT NULL"))
        .collect::<Vec<_>>()
        .join(",\n                ")
}

fn summary_insert_sql(table: &str, first_key: &str, second_key: &str) -> String {
    let names: Vec<&str> = SUMMARY_COLUMNS.iter().map(|(name, _)| *name).collect();
    let placeholders: Vec<String> = (1..=names.len() + 2).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT OR REPLACE INTO {table} ({first_key}, {second_key}, {})
         VALUES ({})",
        names.join(", "),
        placeholders.join(", ")
    )
}

impl SqliteResultStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StratbenchError> {
        let db_path =
            config
                .get_string("results", "sqlite_path")
                .ok_or_else(|| StratbenchError::ConfigMissing {
                    section: "results".into(),
                    key: "sqlite_path".into(),
                })?;
        Self::from_path(&db_path)
    }

    pub fn from_path(db_path: &str) -> Result<Self, StratbenchError> {
        let manager = SqliteConnectionManager::file(db_path);
        // single writer
        let pool =
            Pool::builder()
                .max_size(1)
                .build(manager)
                .map_err(|e: r2d2::Error| StratbenchError::Database {
                    reason: e.to_string(),
                })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self, StratbenchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e: r2d2::Error| StratbenchError::Database {
                reason: e.to_string(),
            })?;

        let store = Self { pool };
        store.initialize_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StratbenchError> {
        self.pool.get().map_err(|e: r2d2::Error| StratbenchError::Database {
            reason: e.to_string(),
        })
    }

    pub fn initialize_schema(&self) -> Result<(), StratbenchError> {
        let conn = self.conn()?;
        let columns = summary_columns_sql();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS policy_results (
                policy_name TEXT NOT NULL,
                window_name TEXT NOT NULL,
                {columns},
                PRIMARY KEY (policy_name, window_name)
            );
            CREATE TABLE IF NOT EXISTS window_results (
                window_name TEXT NOT NULL,
                policy_name TEXT NOT NULL,
                {columns},
                PRIMARY KEY (window_name, policy_name)
            );
            CREATE TABLE IF NOT EXISTS return_history (
                policy_name TEXT NOT NULL,
                window_name TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                price TEXT NOT NULL,
                cash TEXT NOT NULL,
                asset TEXT NOT NULL,
                total_value TEXT NOT NULL,
                annualized_return_pct TEXT NOT NULL,
                PRIMARY KEY (policy_name, window_name, row_index)
            );"
        ))
        .map_err(query_error)?;

        Ok(())
    }

    /// `(window_name, columns)` rows for one policy, sorted by window.
    pub fn policy_table(&self, policy_name: &str) -> Result<Vec<(String, Vec<String>)>, StratbenchError> {
        self.select_table("policy_results", "policy_name", "window_name", policy_name)
    }

    /// `(policy_name, columns)` rows for one window, sorted by policy.
    pub fn window_table(&self, window_name: &str) -> Result<Vec<(String, Vec<String>)>, StratbenchError> {
        self.select_table("window_results", "window_name", "policy_name", window_name)
    }

    fn select_table(
        &self,
        table: &str,
        key: &str,
        row_key: &str,
        value: &str,
    ) -> Result<Vec<(String, Vec<String>)>, StratbenchError> {
        let conn = self.conn()?;
        let names: Vec<&str> = SUMMARY_COLUMNS.iter().map(|(name, _)| *name).collect();
        let query = format!(
            "SELECT {row_key}, {} FROM {table} WHERE {key} = ?1 ORDER BY {row_key}",
            names.join(", ")
        );
        let mut stmt = conn.prepare(&query).map_err(query_error)?;
        let rows = stmt
            .query_map(params![value], |row| {
                let mut fields = Vec::with_capacity(names.len());
                for i in 0..names.len() {
                    fields.push(row.get::<_, String>(i + 1)?);
                }
                Ok((row.get::<_, String>(0)?, fields))
            })
            .map_err(query_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(query_error)?);
        }
        Ok(out)
    }

    /// History rows in export form, ordered by step.
    pub fn history(&self, policy_name: &str, window_name: &str) -> Result<Vec<Vec<String>>, StratbenchError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM return_history
             WHERE policy_name = ?1 AND window_name = ?2
             ORDER BY row_index",
            HISTORY_COLUMNS.join(", ")
        );
        let mut stmt = conn.prepare(&query).map_err(query_error)?;
        let rows = stmt
            .query_map(params![policy_name, window_name], |row| {
                let mut fields = vec![row.get::<_, i64>(0)?.to_string()];
                for i in 1..HISTORY_COLUMNS.len() {
                    fields.push(row.get::<_, String>(i)?);
                }
                Ok(fields)
            })
            .map_err(query_error)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(query_error)?);
        }
        Ok(out)
    }
}

impl ResultStore for SqliteResultStore {
    fn upsert_summary(&mut self, summary: &SummaryRecord) -> Result<(), StratbenchError> {
        let fields = summary.fields()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        let by_policy = std::iter::once(summary.policy_name.as_str())
            .chain(std::iter::once(summary.window_name.as_str()))
            .chain(fields.iter().map(String::as_str));
        tx.execute(
            &summary_insert_sql("policy_results", "policy_name", "window_name"),
            params_from_iter(by_policy),
        )
        .map_err(query_error)?;

        let by_window = std::iter::once(summary.window_name.as_str())
            .chain(std::iter::once(summary.policy_name.as_str()))
            .chain(fields.iter().map(String::as_str));
        tx.execute(
            &summary_insert_sql("window_results", "window_name", "policy_name"),
            params_from_iter(by_window),
        )
        .map_err(query_error)?;

        tx.commit().map_err(query_error)?;
        Ok(())
    }

    fn write_history(
        &mut self,
        policy_name: &str,
        window_name: &str,
        history: &[HistoryRow],
    ) -> Result<(), StratbenchError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        tx.execute(
            "DELETE FROM return_history WHERE policy_name = ?1 AND window_name = ?2",
            params![policy_name, window_name],
        )
        .map_err(query_error)?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO return_history (policy_name, window_name, row_index, timestamp,
                        price, cash, asset, total_value, annualized_return_pct)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                )
                .map_err(query_error)?;
            for (index, row) in history.iter().enumerate() {
                let f = history_fields(row);
                stmt.execute(params![
                    policy_name,
                    window_name,
                    index as i64,
                    row.timestamp,
                    f[1],
                    f[2],
                    f[3],
                    f[4],
                    f[5]
                ])
                .map_err(query_error)?;
            }
        }

        tx.commit().map_err(query_error)?;
        Ok(())
    }
}
