use std::cmp::{max, min};

use tracing::debug;

use super::{Policy, display_period};
use crate::domain::engine::{Market, Step};
use crate::domain::error::StratbenchError;
use crate::domain::exact::Exact;
use crate::domain::ledger::Order;
use crate::domain::sentiment::SentimentIndex;

/// Swing trader driven by a daily sentiment index.
///
/// At or above `buy_threshold` it buys `reading / 2` percent of the larger of
/// starting and current cash; at or below `sell_threshold` it sells
/// `50 - reading / 2` percent of the larger of starting cash and the value
/// of its holdings. Each trade is capped at what the ledger holds.
#[derive(Debug, Clone)]
pub struct FearGreed {
    sentiment: SentimentIndex,
    step_interval: i64,
    buy_threshold: u8,
    sell_threshold: u8,
}

impl FearGreed {
    pub const DEFAULT_BUY_THRESHOLD: u8 = 60;
    pub const DEFAULT_SELL_THRESHOLD: u8 = 40;

    pub fn new(
        sentiment: SentimentIndex,
        step_interval: i64,
        buy_threshold: u8,
        sell_threshold: u8,
    ) -> Result<Self, StratbenchError> {
        if sell_threshold >= buy_threshold || buy_threshold > 100 {
            return Err(StratbenchError::invalid_argument(format!(
                "need sell threshold < buy threshold <= 100, got {sell_threshold} and {buy_threshold}"
            )));
        }
        Ok(FearGreed {
            sentiment,
            step_interval,
            buy_threshold,
            sell_threshold,
        })
    }

    fn act(&self, market: &mut dyn Market) -> Result<(), StratbenchError> {
        let reading = self.sentiment.at(market.clock().time)?;

        if reading >= self.buy_threshold {
            let share = Exact::ratio(i64::from(reading), 200)?;
            let cash = market.cash().clone();
            let wanted = max(market.starting_cash().clone(), cash.clone()) * share;
            let amount = min(wanted, cash);
            if amount.is_positive() {
                debug!(reading, %amount, "greed: buying");
                market.buy(&Order::cash(amount))?;
            }
        } else if reading <= self.sell_threshold {
            let share = Exact::ratio(100 - i64::from(reading), 200)?;
            let holdings = market.asset() * &market.clock().price;
            let wanted = max(market.starting_cash().clone(), holdings.clone()) * share;
            let amount = min(wanted, holdings);
            if amount.is_positive() {
                debug!(reading, %amount, "fear: selling");
                market.sell(&Order::cash(amount))?;
            }
        }
        Ok(())
    }
}

impl Policy for FearGreed {
    fn name(&self) -> String {
        format!("Fear and Greed every {}", display_period(self.step_interval))
    }

    fn run(&mut self, market: &mut dyn Market) -> Result<(), StratbenchError> {
        loop {
            self.act(market)?;
            if market.advance()? == Step::Complete {
                return Ok(());
            }
        }
    }
}
