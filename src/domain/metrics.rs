//! Annualized returns, risk-adjusted ratios and the per-run summary record.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::engine::{HistoryRow, Market, Simulation};
use super::error::StratbenchError;
use super::exact::{DISPLAY_DIGITS, Exact};
use super::price_series::sample_stddev;

/// 365.25 days.
pub const SECONDS_PER_YEAR: i64 = 31_557_600;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.03;

/// Rendered in place of a ratio that has no finite value.
pub const UNDEFINED: &str = "undefined";

/// Cumulative % return since `start_time`, scaled to one year.
///
/// Zero when no time has elapsed, when the return itself is zero, or when
/// the starting value is zero.
pub fn annualized_return_pct(
    start_time: i64,
    time: i64,
    starting_total_value: &Exact,
    total_value: &Exact,
) -> Exact {
    let elapsed = time - start_time;
    if elapsed <= 0 {
        return Exact::zero();
    }
    let Ok(growth) = total_value.checked_div(starting_total_value) else {
        return Exact::zero();
    };
    let raw = growth * Exact::from(100) - Exact::from(100);
    if raw.is_zero() {
        return Exact::zero();
    }
    (raw * Exact::from(SECONDS_PER_YEAR))
        .checked_div(&Exact::from(elapsed))
        .unwrap_or_else(|_| Exact::zero())
}

/// `value / trade_count`, failing with `DivisionByZero` when no trade was made.
pub fn per_trade(value: &Exact, trade_count: u64) -> Result<Exact, StratbenchError> {
    value.checked_div(&Exact::from(trade_count))
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Standard deviation that is `None` when undefined or zero.
fn risk(values: &[f64]) -> Option<f64> {
    let first = values.first()?;
    if values.iter().all(|v| v == first) {
        return None;
    }
    sample_stddev(values).filter(|sd| *sd > 0.0 && sd.is_finite())
}

/// `(mean(r) - rf) / stddev(r)` over annualized % returns scaled to fractions.
pub fn sharpe_ratio(returns_pct: &[f64], risk_free_rate: f64) -> Option<f64> {
    let returns: Vec<f64> = returns_pct.iter().map(|r| r / 100.0).collect();
    let sigma = risk(&returns)?;
    Some((mean(&returns)? - risk_free_rate) / sigma)
}

/// Sharpe with the risk term taken over strictly negative returns only.
pub fn sortino_ratio(returns_pct: &[f64], risk_free_rate: f64) -> Option<f64> {
    let returns: Vec<f64> = returns_pct.iter().map(|r| r / 100.0).collect();
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sigma = risk(&downside)?;
    Some((mean(&returns)? - risk_free_rate) / sigma)
}

fn history_returns(history: &[HistoryRow]) -> Vec<f64> {
    history
        .iter()
        .filter_map(|row| row.annualized_return_pct.to_f64())
        .collect()
}

/// Terminal result of one (policy, price window) run.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRecord {
    pub policy_name: String,
    pub window_name: String,
    pub price_delta: Exact,
    pub pct_price_delta: Exact,
    pub starting_cash: Exact,
    pub starting_asset: Exact,
    pub ending_cash: Exact,
    pub ending_asset: Exact,
    pub total_value: Exact,
    pub returns: Exact,
    pub mean_annual_return_pct: f64,
    pub median_annual_return_pct: f64,
    pub final_annual_return_pct: Exact,
    pub trade_count: u64,
    pub fees_paid: Exact,
    pub flat_return_per_trade: Option<Exact>,
    pub pct_return_per_trade: Option<Exact>,
    pub sharpe: Option<f64>,
    pub sortino: Option<f64>,
    pub price_stddev: Option<f64>,
}

/// `(column name, display header)` in export order.
pub const SUMMARY_COLUMNS: [(&str, &str); 19] = [
    ("price_delta", "Price Delta"),
    ("pct_price_delta", "% Price Delta"),
    ("starting_cash", "Starting Cash"),
    ("starting_asset", "Starting Asset"),
    ("ending_cash", "Ending Cash"),
    ("ending_asset", "Ending Asset"),
    ("total_value", "Total Value in Cash"),
    ("returns", "Returns in Cash"),
    ("mean_annual_return_pct", "Mean Annual % Return"),
    ("median_annual_return_pct", "Median Annual % Return"),
    ("final_annual_return_pct", "Final Annual % Return"),
    ("median_minus_mean_pct", "Median-Mean % Return"),
    ("trade_count", "Trades Made"),
    ("fees_paid", "Fees Paid"),
    ("flat_return_per_trade", "Flat Return Per Trade"),
    ("pct_return_per_trade", "% Return Per Trade"),
    ("sharpe", "Sharpe of Returns"),
    ("sortino", "Sortino of Returns"),
    ("price_stddev", "Std of Price"),
];

impl SummaryRecord {
    /// Summarize a finished (or abandoned) run at its current clock.
    pub fn compute(
        sim: &Simulation<'_>,
        policy_name: &str,
        risk_free_rate: f64,
    ) -> Result<Self, StratbenchError> {
        let series = sim.series();
        let ledger = sim.ledger();
        let total_value = ledger.total_value();
        let returns = &total_value - sim.starting_total_value();
        let final_annual_return_pct = sim.current_annualized_return_pct();
        let trade_count = ledger.trade_count();
        let annual_returns = history_returns(sim.history());

        Ok(SummaryRecord {
            policy_name: policy_name.to_string(),
            window_name: series.name().to_string(),
            price_delta: series.price_delta(),
            pct_price_delta: series.pct_price_delta()?,
            starting_cash: sim.starting_cash().clone(),
            starting_asset: sim.starting_asset().clone(),
            ending_cash: ledger.cash().clone(),
            ending_asset: ledger.asset().clone(),
            mean_annual_return_pct: mean(&annual_returns).unwrap_or(0.0),
            median_annual_return_pct: median(&annual_returns).unwrap_or(0.0),
            flat_return_per_trade: per_trade(&returns, trade_count).ok(),
            pct_return_per_trade: per_trade(&final_annual_return_pct, trade_count).ok(),
            trade_count,
            fees_paid: ledger.fees_paid().clone(),
            sharpe: sharpe_ratio(&annual_returns, risk_free_rate),
            sortino: sortino_ratio(&annual_returns, risk_free_rate),
            price_stddev: series.display_price_stddev(),
            total_value,
            returns,
            final_annual_return_pct,
        })
    }

    pub fn median_minus_mean_pct(&self) -> f64 {
        self.median_annual_return_pct - self.mean_annual_return_pct
    }

    /// Every column of [`SUMMARY_COLUMNS`] rendered for export.
    pub fn fields(&self) -> Result<Vec<String>, StratbenchError> {
        let exact = |v: &Exact| -> Result<String, StratbenchError> {
            Ok(v.to_display(DISPLAY_DIGITS)?.normalize().to_string())
        };
        let maybe_exact = |v: &Option<Exact>| -> Result<String, StratbenchError> {
            match v {
                Some(v) => exact(v),
                None => Ok(UNDEFINED.to_string()),
            }
        };
        let ratio = |v: Option<f64>, digits: usize| match v {
            Some(v) => format!("{v:.digits$}"),
            None => UNDEFINED.to_string(),
        };

        Ok(vec![
            exact(&self.price_delta)?,
            exact(&self.pct_price_delta)?,
            exact(&self.starting_cash)?,
            exact(&self.starting_asset)?,
            exact(&self.ending_cash)?,
            exact(&self.ending_asset)?,
            exact(&self.total_value)?,
            exact(&self.returns)?,
            format!("{:.4}", self.mean_annual_return_pct),
            format!("{:.4}", self.median_annual_return_pct),
            exact(&self.final_annual_return_pct)?,
            format!("{:.4}", self.median_minus_mean_pct()),
            self.trade_count.to_string(),
            exact(&self.fees_paid)?,
            maybe_exact(&self.flat_return_per_trade)?,
            maybe_exact(&self.pct_return_per_trade)?,
            ratio(self.sharpe, 4),
            ratio(self.sortino, 4),
            ratio(self.price_stddev, 2),
        ])
    }
}

/// Render one history row for export.
pub fn history_fields(row: &HistoryRow) -> Vec<String> {
    let d = |v: Decimal| v.normalize().to_string();
    vec![
        row.timestamp.to_string(),
        d(row.price),
        d(row.cash),
        d(row.asset),
        d(row.total_value),
        d(row.annualized_return_pct),
    ]
}

pub const HISTORY_COLUMNS: [&str; 6] = [
    "timestamp",
    "price",
    "cash",
    "asset",
    "total_value",
    "annualized_return_pct",
];
