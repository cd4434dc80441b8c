use tracing::debug;

use super::{Policy, display_period};
use crate::domain::engine::{Market, Step};
use crate::domain::error::StratbenchError;
use crate::domain::exact::Exact;
use crate::domain::ledger::Order;

/// Dollar-cost averaging: an initial share of starting cash, then the rest
/// in equal buys after every step so cash runs out by the end of the window.
#[derive(Debug, Clone)]
pub struct Dca {
    step_interval: i64,
    initial_buy_pct: Exact,
}

impl Dca {
    pub const DEFAULT_INITIAL_BUY_PCT: i64 = 30;

    /// `initial_buy_pct` is a percentage of starting cash in `[0, 100]`.
    pub fn new(step_interval: i64, initial_buy_pct: Exact) -> Result<Self, StratbenchError> {
        if initial_buy_pct.is_negative() || initial_buy_pct > Exact::from(100) {
            return Err(StratbenchError::invalid_argument(format!(
                "initial buy percentage must be within 0..=100, got {initial_buy_pct}"
            )));
        }
        Ok(Dca {
            step_interval,
            initial_buy_pct,
        })
    }

    pub fn with_default_split(step_interval: i64) -> Self {
        Dca {
            step_interval,
            initial_buy_pct: Exact::from(Self::DEFAULT_INITIAL_BUY_PCT),
        }
    }
}

impl Policy for Dca {
    fn name(&self) -> String {
        format!("DCA every {}", display_period(self.step_interval))
    }

    fn run(&mut self, market: &mut dyn Market) -> Result<(), StratbenchError> {
        let series = market.series();
        let span = series.end_time() - series.start_time();
        let step = market.step_interval();
        let buys = span / step;
        if buys == 0 {
            return Err(StratbenchError::invalid_argument(format!(
                "window {} spans {} which is shorter than one DCA period of {}",
                series.name(),
                display_period(span),
                display_period(step)
            )));
        }

        let initial = (market.starting_cash() * &self.initial_buy_pct).checked_div(&Exact::from(100))?;
        if initial.is_positive() {
            market.buy(&Order::cash(initial))?;
        }

        let per_buy = market.cash().checked_div(&Exact::from(buys))?;
        debug!(buys, per_buy = %per_buy, "dca schedule");
        while market.advance()? == Step::Advanced {
            if per_buy.is_positive() {
                market.buy(&Order::cash(per_buy.clone()))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine::Simulation;
    use crate::domain::policy::fixtures::{params, series};

    #[test]
    fn spends_all_cash_by_the_end() {
        let s = series(&[(0, 10), (60, 20), (120, 40), (180, 20), (240, 10)]);
        let mut sim = Simulation::new(&s, &params(100, 60)).unwrap();
        Dca::with_default_split(60).run(&mut sim).unwrap();

        assert!(sim.ledger().cash().is_zero());
        // one initial buy plus one per non-terminal step
        assert_eq!(sim.ledger().trade_count(), 5);
    }

    #[test]
    fn initial_share_then_equal_buys() {
        let s = series(&[(0, 10), (120, 10)]);
        let mut sim = Simulation::new(&s, &params(100, 60)).unwrap();
        Dca::with_default_split(60).run(&mut sim).unwrap();

        // 30 up front; 70 over 2 planned buys, but the gap leaves room for one
        assert_eq!(sim.ledger().trade_count(), 2);
        assert_eq!(sim.ledger().cash(), &Exact::from(35));
    }

    #[test]
    fn window_shorter_than_period_fails_before_trading() {
        let s = series(&[(0, 10), (60, 10)]);
        let mut sim = Simulation::new(&s, &params(100, 86_400)).unwrap();
        let err = Dca::with_default_split(86_400).run(&mut sim).unwrap_err();

        assert!(matches!(err, StratbenchError::InvalidArgument { .. }));
        assert_eq!(sim.ledger().trade_count(), 0);
    }

    #[test]
    fn custom_split() {
        let s = series(&[(0, 10), (60, 10)]);
        let mut sim = Simulation::new(&s, &params(100, 60)).unwrap();
        Dca::new(60, Exact::from(100)).unwrap().run(&mut sim).unwrap();
        assert_eq!(sim.ledger().trade_count(), 1);
        assert!(sim.ledger().cash().is_zero());
    }

    #[test]
    fn split_out_of_range_rejected() {
        assert!(Dca::new(60, Exact::from(101)).is_err());
        assert!(Dca::new(60, Exact::from(-1)).is_err());
    }

    #[test]
    fn name_carries_period() {
        assert_eq!(Dca::with_default_split(86_400).name(), "DCA every 1 day");
        assert_eq!(Dca::with_default_split(7 * 86_400).name(), "DCA every 7 days");
    }
}
