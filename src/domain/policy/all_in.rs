use tracing::debug;

use super::{Policy, step_to_end};
use crate::domain::engine::Market;
use crate::domain::error::StratbenchError;
use crate::domain::ledger::Order;

/// Spend all starting cash on the first row, then hold.
#[derive(Debug, Clone, Default)]
pub struct AllIn;

impl Policy for AllIn {
    fn name(&self) -> String {
        "All in".to_string()
    }

    fn run(&mut self, market: &mut dyn Market) -> Result<(), StratbenchError> {
        let amount = market.starting_cash().clone();
        if amount.is_positive() {
            let fill = market.buy(&Order::cash(amount))?;
            debug!(asset = %fill.asset_delta, "all in");
        }
        step_to_end(market)
    }
}
