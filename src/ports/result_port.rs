//! Result persistence port trait.
//!
//! Writers take `&mut self`: a store has exactly one writer at a time, which
//! is what keeps keyed upserts free of lost updates.

use crate::domain::engine::HistoryRow;
use crate::domain::error::StratbenchError;
use crate::domain::metrics::SummaryRecord;

pub trait ResultStore {
    /// Replace the row keyed by `(policy_name, window_name)` in both the
    /// per-policy and the per-window table.
    fn upsert_summary(&mut self, summary: &SummaryRecord) -> Result<(), StratbenchError>;

    /// Replace the full return history of one `(policy, window)` run.
    fn write_history(
        &mut self,
        policy_name: &str,
        window_name: &str,
        history: &[HistoryRow],
    ) -> Result<(), StratbenchError>;
}
