use tracing::debug;

use super::Policy;
use crate::domain::engine::{Market, Step};
use crate::domain::error::StratbenchError;
use crate::domain::exact::Exact;
use crate::domain::ledger::Order;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Bottom,
    Top,
}

/// Spend all starting cash at the window's lowest or highest price.
///
/// The buy happens on the first step whose clock has reached the extreme
/// row, marked at the extreme's exact price. A coarse step may land past the
/// row; the history then shows the holdings from that step onwards. When the
/// extreme is in the last window the buy happens after completion.
#[derive(Debug, Clone)]
pub struct AllInAtExtreme {
    extreme: Extreme,
}

impl AllInAtExtreme {
    pub fn new(extreme: Extreme) -> Self {
        AllInAtExtreme { extreme }
    }

    pub fn bottom() -> Self {
        Self::new(Extreme::Bottom)
    }

    pub fn top() -> Self {
        Self::new(Extreme::Top)
    }

    fn buy_at(market: &mut dyn Market, price: Exact) -> Result<(), StratbenchError> {
        let amount = market.starting_cash().clone();
        if !amount.is_positive() {
            return Ok(());
        }
        debug!(%price, "buying at extreme");
        market.reprice(price)?;
        market.buy(&Order::cash(amount))?;
        Ok(())
    }
}

impl Policy for AllInAtExtreme {
    fn name(&self) -> String {
        match self.extreme {
            Extreme::Bottom => "All in bottom".to_string(),
            Extreme::Top => "All in top".to_string(),
        }
    }

    fn run(&mut self, market: &mut dyn Market) -> Result<(), StratbenchError> {
        let series = market.series();
        let target = match self.extreme {
            Extreme::Bottom => series.index_of_min_price(),
            Extreme::Top => series.index_of_max_price(),
        };
        let extreme_price = series.rows()[target].exact_price.clone();
        let last_price = series.last().exact_price.clone();

        let mut bought = false;
        loop {
            if !bought && market.clock().index >= target {
                Self::buy_at(market, extreme_price.clone())?;
                bought = true;
            }
            if market.advance()? == Step::Complete {
                break;
            }
        }

        if !bought {
            Self::buy_at(market, extreme_price)?;
            // value the final holdings at the closing price
            market.reprice(last_price)?;
        }
        Ok(())
    }
}
