//! In-memory result store.

use std::collections::BTreeMap;

use crate::domain::engine::HistoryRow;
use crate::domain::error::StratbenchError;
use crate::domain::metrics::SummaryRecord;
use crate::ports::result_port::ResultStore;

/// Rows keyed by name inside each table, so every table stays sorted and a
/// repeated key replaces its row.
#[derive(Debug, Default)]
pub struct MemoryResultStore {
    by_policy: BTreeMap<String, BTreeMap<String, SummaryRecord>>,
    by_window: BTreeMap<String, BTreeMap<String, SummaryRecord>>,
    histories: BTreeMap<(String, String), Vec<HistoryRow>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per window the policy ran on.
    pub fn policy_table(&self, policy_name: &str) -> Option<&BTreeMap<String, SummaryRecord>> {
        self.by_policy.get(policy_name)
    }

    /// One row per policy run on the window.
    pub fn window_table(&self, window_name: &str) -> Option<&BTreeMap<String, SummaryRecord>> {
        self.by_window.get(window_name)
    }

    pub fn summary(&self, policy_name: &str, window_name: &str) -> Option<&SummaryRecord> {
        self.by_policy.get(policy_name)?.get(window_name)
    }

    pub fn history(&self, policy_name: &str, window_name: &str) -> Option<&[HistoryRow]> {
        self.histories
            .get(&(policy_name.to_string(), window_name.to_string()))
            .map(Vec::as_slice)
    }
}

impl ResultStore for MemoryResultStore {
    fn upsert_summary(&mut self, summary: &SummaryRecord) -> Result<(), StratbenchError> {
        self.by_policy
            .entry(summary.policy_name.clone())
            .or_default()
            .insert(summary.window_name.clone(), summary.clone());
        self.by_window
            .entry(summary.window_name.clone())
            .or_default()
            .insert(summary.policy_name.clone(), summary.clone());
        Ok(())
    }

    fn write_history(
        &mut self,
        policy_name: &str,
        window_name: &str,
        history: &[HistoryRow],
    ) -> Result<(), StratbenchError> {
        self.histories.insert(
            (policy_name.to_string(), window_name.to_string()),
            history.to_vec(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{BacktestConfig, run_and_store};
    use crate::domain::policy::fixtures::series;
    use crate::domain::policy::{AllIn, AllInAtExtreme};

    fn config() -> BacktestConfig {
        BacktestConfig {
            step_interval: 60,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn rerun_replaces_row() {
        let s = series(&[(0, 10), (60, 20)]);
        let mut store = MemoryResultStore::new();
        run_and_store(&mut AllIn, &s, &config(), &mut store).unwrap();
        let second = run_and_store(&mut AllIn, &s, &config(), &mut store).unwrap();

        assert_eq!(store.policy_table("All in").unwrap().len(), 1);
        assert_eq!(store.window_table("fixture").unwrap().len(), 1);
        assert_eq!(store.summary("All in", "fixture"), Some(&second.summary));
        assert_eq!(store.history("All in", "fixture").unwrap().len(), 2);
    }

    #[test]
    fn window_table_sorted_by_policy() {
        let s = series(&[(0, 10), (60, 5), (120, 20)]);
        let mut store = MemoryResultStore::new();
        run_and_store(&mut AllInAtExtreme::top(), &s, &config(), &mut store).unwrap();
        run_and_store(&mut AllIn, &s, &config(), &mut store).unwrap();
        run_and_store(&mut AllInAtExtreme::bottom(), &s, &config(), &mut store).unwrap();

        let keys: Vec<&String> = store.window_table("fixture").unwrap().keys().collect();
        assert_eq!(keys, vec!["All in", "All in bottom", "All in top"]);
        assert!(store.policy_table("All in top").is_some());
        assert!(store.history("All in", "elsewhere").is_none());
    }
}
