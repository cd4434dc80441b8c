//! Trading policies that drive a [`Market`] from start to completion.
//!
//! Each policy is an independent implementation of [`Policy`]; it only sees
//! the capability surface of [`Market`] and never the simulation internals.
//! - `AllIn`: spend all starting cash on the first row
//! - `AllInAtExtreme`: spend it at the window's lowest (or highest) price
//! - `Dca`: an initial share, then equal buys after every step
//! - `FearGreed`: buy on greed and sell on fear from a daily sentiment index

pub mod all_in;
pub mod dca;
pub mod extreme;
pub mod fear_greed;

use std::fmt;
use std::str::FromStr;

use crate::domain::engine::{Market, Step};
use crate::domain::error::StratbenchError;

pub use all_in::AllIn;
pub use dca::Dca;
pub use extreme::{AllInAtExtreme, Extreme};
pub use fear_greed::FearGreed;

pub trait Policy {
    /// Name used as the policy key in result tables.
    fn name(&self) -> String;

    /// Trade and step until the market reports completion.
    fn run(&mut self, market: &mut dyn Market) -> Result<(), StratbenchError>;
}

/// Advance until the series is exhausted.
pub(crate) fn step_to_end(market: &mut dyn Market) -> Result<(), StratbenchError> {
    while market.advance()? == Step::Advanced {}
    Ok(())
}

const PERIOD_UNITS: [(&str, i64); 4] = [("day", 86_400), ("hour", 3_600), ("minute", 60), ("second", 1)];

/// Largest whole unit in `seconds`: `1 day`, `28 days`, `6 hours`.
pub fn display_period(seconds: i64) -> String {
    for (unit, size) in PERIOD_UNITS {
        let count = seconds / size;
        if count > 0 {
            let plural = if count == 1 { "" } else { "s" };
            return format!("{count} {unit}{plural}");
        }
    }
    "0 seconds".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    AllIn,
    AllInBottom,
    AllInTop,
    Dca,
    FearGreed,
}

impl PolicyKind {
    pub const ALL: [PolicyKind; 5] = [
        PolicyKind::AllIn,
        PolicyKind::AllInBottom,
        PolicyKind::AllInTop,
        PolicyKind::Dca,
        PolicyKind::FearGreed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::AllIn => "all_in",
            PolicyKind::AllInBottom => "all_in_bottom",
            PolicyKind::AllInTop => "all_in_top",
            PolicyKind::Dca => "dca",
            PolicyKind::FearGreed => "fear_greed",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = StratbenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        PolicyKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = PolicyKind::ALL.iter().map(|k| k.as_str()).collect();
                StratbenchError::invalid_argument(format!(
                    "unknown policy '{s}', expected one of: {}",
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use rust_decimal::Decimal;

    use crate::domain::engine::SimulationParams;
    use crate::domain::exact::Exact;
    use crate::domain::price_series::{PriceObservation, PriceSeries};

    pub fn series(points: &[(i64, i64)]) -> PriceSeries {
        PriceSeries::new(
            "fixture",
            points
                .iter()
                .map(|&(t, p)| PriceObservation::from_display(t, Decimal::from(p)))
                .collect(),
        )
        .unwrap()
    }

    pub fn params(starting_cash: i64, step_interval: i64) -> SimulationParams {
        SimulationParams {
            starting_cash: Exact::from(starting_cash),
            starting_asset: Exact::zero(),
            fee_rate: "0.997".parse().unwrap(),
            step_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_uses_largest_unit_only() {
        assert_eq!(display_period(86_400), "1 day");
        assert_eq!(display_period(28 * 86_400), "28 days");
        assert_eq!(display_period(86_400 + 3_600), "1 day");
        assert_eq!(display_period(6 * 3_600), "6 hours");
        assert_eq!(display_period(60), "1 minute");
        assert_eq!(display_period(59), "59 seconds");
        assert_eq!(display_period(0), "0 seconds");
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("DCA".parse::<PolicyKind>().unwrap(), PolicyKind::Dca);
        assert_eq!(" all_in_top ".parse::<PolicyKind>().unwrap(), PolicyKind::AllInTop);
        for kind in PolicyKind::ALL {
            assert_eq!(kind.to_string().parse::<PolicyKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_kind_lists_choices() {
        let err = "hodl".parse::<PolicyKind>().unwrap_err();
        assert!(err.to_string().contains("fear_greed"));
    }
}
