//! Run orchestration: one policy over one price window.
//!
//! [`run_policy`] returns the summary and history in memory and never
//! touches persistent tables; [`run_and_store`] also writes them through a
//! [`ResultStore`] when `save_results` is set.

use std::time::Instant;

use tracing::{info, warn};

use super::engine::{HistoryRow, SimState, Simulation, SimulationParams};
use super::error::StratbenchError;
use super::exact::Exact;
use super::metrics::{DEFAULT_RISK_FREE_RATE, SummaryRecord};
use super::policy::Policy;
use super::price_series::PriceSeries;
use crate::ports::result_port::ResultStore;

pub const DEFAULT_STEP_INTERVAL: i64 = 86_400;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub starting_cash: Exact,
    pub starting_asset: Exact,
    /// Fraction of the received leg kept after fees, in (0, 1].
    pub fee_rate: Exact,
    pub step_interval: i64,
    pub risk_free_rate: f64,
    pub save_results: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            starting_cash: Exact::from(100),
            starting_asset: Exact::zero(),
            fee_rate: Exact::ratio(997, 1000).unwrap_or_else(|_| Exact::one()),
            step_interval: DEFAULT_STEP_INTERVAL,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            save_results: true,
        }
    }
}

impl BacktestConfig {
    pub fn simulation_params(&self) -> SimulationParams {
        SimulationParams {
            starting_cash: self.starting_cash.clone(),
            starting_asset: self.starting_asset.clone(),
            fee_rate: self.fee_rate.clone(),
            step_interval: self.step_interval,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub summary: SummaryRecord,
    pub history: Vec<HistoryRow>,
}

pub fn run_policy(
    policy: &mut dyn Policy,
    series: &PriceSeries,
    config: &BacktestConfig,
) -> Result<BacktestResult, StratbenchError> {
    let policy_name = policy.name();
    let started = Instant::now();
    info!(policy = %policy_name, window = series.name(), "started");

    let mut sim = Simulation::new(series, &config.simulation_params())?;
    policy.run(&mut sim)?;
    if sim.state() != SimState::Complete {
        warn!(policy = %policy_name, "policy returned before the series was exhausted");
    }
    let summary = SummaryRecord::compute(&sim, &policy_name, config.risk_free_rate)?;

    info!(
        policy = %policy_name,
        window = series.name(),
        trades = summary.trade_count,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "completed"
    );
    Ok(BacktestResult {
        summary,
        history: sim.history().to_vec(),
    })
}

pub fn run_and_store(
    policy: &mut dyn Policy,
    series: &PriceSeries,
    config: &BacktestConfig,
    store: &mut dyn ResultStore,
) -> Result<BacktestResult, StratbenchError> {
    let result = run_policy(policy, series, config)?;
    if config.save_results {
        store.upsert_summary(&result.summary)?;
        store.write_history(
            &result.summary.policy_name,
            &result.summary.window_name,
            &result.history,
        )?;
    }
    Ok(result)
}
