//! Time-stepping simulation over one price series.
//!
//! Each [`Simulation::advance`] consumes every price row inside
//! `[current_time, current_time + step_interval)` and records one
//! return-history row per consumed price row. Batching a whole window per
//! call keeps a run linear in series length however coarse the step is.

use rust_decimal::Decimal;
use tracing::trace;

use super::error::StratbenchError;
use super::exact::{DISPLAY_DIGITS, Exact};
use super::ledger::{Fill, Ledger, Order};
use super::metrics::annualized_return_pct;
use super::price_series::PriceSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimState {
    Running,
    Complete,
}

/// Outcome of one [`Simulation::advance`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Advanced,
    /// The series is exhausted; the clock sits on the last row.
    Complete,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Clock {
    pub index: usize,
    pub time: i64,
    pub price: Exact,
}

/// One return-history entry, held at export precision
/// ([`DISPLAY_DIGITS`]); the exact state lives in the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub timestamp: i64,
    pub price: Decimal,
    pub cash: Decimal,
    pub asset: Decimal,
    pub total_value: Decimal,
    pub annualized_return_pct: Decimal,
}

/// Starting balances and trading terms for one run.
#[derive(Debug, Clone)]
pub struct SimulationParams {
    pub starting_cash: Exact,
    pub starting_asset: Exact,
    pub fee_rate: Exact,
    /// Seconds per step; must be positive.
    pub step_interval: i64,
}

/// What a policy is allowed to do to a running simulation.
pub trait Market {
    fn buy(&mut self, order: &Order) -> Result<Fill, StratbenchError>;
    fn sell(&mut self, order: &Order) -> Result<Fill, StratbenchError>;
    fn advance(&mut self) -> Result<Step, StratbenchError>;
    fn total_value(&self) -> Exact;
    /// Mark the ledger at `price` until the next step.
    fn reprice(&mut self, price: Exact) -> Result<(), StratbenchError>;
    fn clock(&self) -> &Clock;
    fn series(&self) -> &PriceSeries;
    fn cash(&self) -> &Exact;
    fn asset(&self) -> &Exact;
    fn starting_cash(&self) -> &Exact;
    fn step_interval(&self) -> i64;
}

pub struct Simulation<'a> {
    series: &'a PriceSeries,
    ledger: Ledger,
    clock: Clock,
    state: SimState,
    step_interval: i64,
    starting_cash: Exact,
    starting_asset: Exact,
    starting_total_value: Exact,
    history: Vec<HistoryRow>,
}

impl<'a> Simulation<'a> {
    pub fn new(series: &'a PriceSeries, params: &SimulationParams) -> Result<Self, StratbenchError> {
        if params.step_interval <= 0 {
            return Err(StratbenchError::invalid_argument(format!(
                "step interval must be positive, got {}",
                params.step_interval
            )));
        }
        let first = series.first();
        let ledger = Ledger::new(
            params.starting_cash.clone(),
            params.starting_asset.clone(),
            first.exact_price.clone(),
            params.fee_rate.clone(),
        )?;
        let starting_total_value = ledger.total_value();

        let mut sim = Simulation {
            series,
            clock: Clock {
                index: 0,
                time: first.timestamp,
                price: first.exact_price.clone(),
            },
            ledger,
            state: SimState::Running,
            step_interval: params.step_interval,
            starting_cash: params.starting_cash.clone(),
            starting_asset: params.starting_asset.clone(),
            starting_total_value,
            history: Vec::with_capacity(series.len()),
        };
        sim.record_rows(0, 1)?;
        Ok(sim)
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn history(&self) -> &[HistoryRow] {
        &self.history
    }

    pub fn starting_asset(&self) -> &Exact {
        &self.starting_asset
    }

    pub fn starting_total_value(&self) -> &Exact {
        &self.starting_total_value
    }

    /// Annualized return of the ledger as it stands on the clock right now.
    pub fn current_annualized_return_pct(&self) -> Exact {
        annualized_return_pct(
            self.series.start_time(),
            self.clock.time,
            &self.starting_total_value,
            &self.ledger.total_value(),
        )
    }

    /// Rows `from..to` of the series, valued with the ledger as it stands.
    /// A row already recorded (the seed) is replaced.
    fn record_rows(&mut self, from: usize, to: usize) -> Result<(), StratbenchError> {
        let series = self.series;
        let start_time = series.start_time();
        let cash = self.ledger.cash().to_display(DISPLAY_DIGITS)?;
        let asset = self.ledger.asset().to_display(DISPLAY_DIGITS)?;
        for index in from..to {
            let Some(obs) = series.get(index) else {
                break;
            };
            let total_value = self.ledger.cash() + self.ledger.asset() * &obs.exact_price;
            let annualized = if index == 0 {
                Exact::zero()
            } else {
                annualized_return_pct(
                    start_time,
                    obs.timestamp,
                    &self.starting_total_value,
                    &total_value,
                )
            };
            let row = HistoryRow {
                timestamp: obs.timestamp,
                price: obs.display_price,
                cash,
                asset,
                total_value: total_value.to_display(DISPLAY_DIGITS)?,
                annualized_return_pct: annualized.to_display(DISPLAY_DIGITS)?,
            };
            match self.history.get_mut(index) {
                Some(slot) => *slot = row,
                None => self.history.push(row),
            }
        }
        Ok(())
    }

    fn move_clock(&mut self, index: usize) -> Result<(), StratbenchError> {
        let series = self.series;
        let obs = &series.rows()[index];
        self.clock = Clock {
            index,
            time: obs.timestamp,
            price: obs.exact_price.clone(),
        };
        self.ledger.set_price(obs.exact_price.clone())
    }
}

impl Market for Simulation<'_> {
    fn buy(&mut self, order: &Order) -> Result<Fill, StratbenchError> {
        self.ledger.buy(order)
    }

    fn sell(&mut self, order: &Order) -> Result<Fill, StratbenchError> {
        self.ledger.sell(order)
    }

    fn advance(&mut self) -> Result<Step, StratbenchError> {
        if self.state == SimState::Complete {
            return Ok(Step::Complete);
        }

        let window_close = self.clock.time.saturating_add(self.step_interval);
        let next = self.series.window_end(self.clock.index, window_close);
        self.record_rows(self.clock.index, next)?;

        let last = self.series.last_index();
        if next > last {
            self.move_clock(last)?;
            self.state = SimState::Complete;
            trace!(index = last, time = self.clock.time, "series exhausted");
            return Ok(Step::Complete);
        }

        self.move_clock(next)?;
        trace!(index = next, time = self.clock.time, "advanced");
        Ok(Step::Advanced)
    }

    fn total_value(&self) -> Exact {
        self.ledger.total_value()
    }

    fn reprice(&mut self, price: Exact) -> Result<(), StratbenchError> {
        self.ledger.set_price(price.clone())?;
        self.clock.price = price;
        Ok(())
    }

    fn clock(&self) -> &Clock {
        &self.clock
    }

    fn series(&self) -> &PriceSeries {
        self.series
    }

    fn cash(&self) -> &Exact {
        self.ledger.cash()
    }

    fn asset(&self) -> &Exact {
        self.ledger.asset()
    }

    fn starting_cash(&self) -> &Exact {
        &self.starting_cash
    }

    fn step_interval(&self) -> i64 {
        self.step_interval
    }
}
