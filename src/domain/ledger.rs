//! Cash/asset ledger with proportional trading fees.
//!
//! Fees always come out of the received leg: a buy receives less asset, a
//! sell receives less cash. The given leg moves by the full order amount.

use tracing::debug;

use super::error::StratbenchError;
use super::exact::Exact;

/// A trade size, denominated in exactly one of asset or cash.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub asset_amount: Exact,
    pub cash_amount: Exact,
}

impl Order {
    pub fn cash(amount: Exact) -> Self {
        Order {
            asset_amount: Exact::zero(),
            cash_amount: amount,
        }
    }

    pub fn asset(amount: Exact) -> Self {
        Order {
            asset_amount: amount,
            cash_amount: Exact::zero(),
        }
    }

    fn validate(&self, side: &str) -> Result<(), StratbenchError> {
        if self.asset_amount.is_negative() || self.cash_amount.is_negative() {
            return Err(StratbenchError::invalid_argument(format!(
                "{side} amounts must not be negative"
            )));
        }
        match (self.asset_amount.is_zero(), self.cash_amount.is_zero()) {
            (true, true) => Err(StratbenchError::invalid_argument(format!(
                "must {side} a non-zero amount"
            ))),
            (false, false) => Err(StratbenchError::invalid_argument(format!(
                "{side} takes an asset amount or a cash amount, not both"
            ))),
            _ => Ok(()),
        }
    }
}

/// Signed balance changes of one executed trade; `fee` is in cash terms.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub asset_delta: Exact,
    pub cash_delta: Exact,
    pub fee: Exact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    cash: Exact,
    asset: Exact,
    price: Exact,
    fee_rate: Exact,
    trade_count: u64,
    fees_paid: Exact,
}

impl Ledger {
    /// `fee_rate` is the retained fraction of the received leg, e.g. `0.997`.
    pub fn new(cash: Exact, asset: Exact, price: Exact, fee_rate: Exact) -> Result<Self, StratbenchError> {
        if cash.is_negative() || asset.is_negative() {
            return Err(StratbenchError::invalid_argument(
                "starting balances must not be negative",
            ));
        }
        if !fee_rate.is_positive() || fee_rate > Exact::one() {
            return Err(StratbenchError::invalid_argument(format!(
                "fee rate {fee_rate} must lie in (0, 1]"
            )));
        }
        let mut ledger = Ledger {
            cash,
            asset,
            price: Exact::one(),
            fee_rate,
            trade_count: 0,
            fees_paid: Exact::zero(),
        };
        ledger.set_price(price)?;
        Ok(ledger)
    }

    pub fn cash(&self) -> &Exact {
        &self.cash
    }

    pub fn asset(&self) -> &Exact {
        &self.asset
    }

    pub fn price(&self) -> &Exact {
        &self.price
    }

    pub fn fee_rate(&self) -> &Exact {
        &self.fee_rate
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    pub fn fees_paid(&self) -> &Exact {
        &self.fees_paid
    }

    pub fn set_price(&mut self, price: Exact) -> Result<(), StratbenchError> {
        if !price.is_positive() {
            return Err(StratbenchError::invalid_argument(format!(
                "price {price} must be positive"
            )));
        }
        self.price = price;
        Ok(())
    }

    /// Mark-to-market value; no fee applies.
    pub fn total_value(&self) -> Exact {
        &self.cash + &self.asset * &self.price
    }

    pub fn buy(&mut self, order: &Order) -> Result<Fill, StratbenchError> {
        order.validate("buy")?;
        let cash_amount = if order.asset_amount.is_zero() {
            order.cash_amount.clone()
        } else {
            &order.asset_amount * &self.price
        };

        if (&self.cash - &cash_amount).is_negative() {
            return Err(StratbenchError::InsufficientFunds {
                requested: cash_amount,
                available: self.cash.clone(),
            });
        }

        let fee_share = Exact::one() - &self.fee_rate;
        let gross_asset = cash_amount.checked_div(&self.price)?;
        let asset_fee = &gross_asset * &fee_share;
        let cash_fee = &cash_amount * &fee_share;
        let received = gross_asset - &asset_fee;

        self.asset += &received;
        self.cash -= &cash_amount;
        self.fees_paid += &cash_fee;
        self.trade_count += 1;

        debug!(
            cash = %cash_amount,
            asset = %received,
            fee = %cash_fee,
            trades = self.trade_count,
            "buy"
        );

        Ok(Fill {
            asset_delta: received,
            cash_delta: -cash_amount,
            fee: cash_fee,
        })
    }

    pub fn sell(&mut self, order: &Order) -> Result<Fill, StratbenchError> {
        order.validate("sell")?;
        let asset_amount = if order.cash_amount.is_zero() {
            order.asset_amount.clone()
        } else {
            order.cash_amount.checked_div(&self.price)?
        };

        if (&self.asset - &asset_amount).is_negative() {
            return Err(StratbenchError::InsufficientAsset {
                requested: asset_amount,
                available: self.asset.clone(),
            });
        }

        let gross_cash = &asset_amount * &self.price;
        let cash_fee = &gross_cash * (Exact::one() - &self.fee_rate);
        let received = gross_cash - &cash_fee;

        self.asset -= &asset_amount;
        self.cash += &received;
        self.fees_paid += &cash_fee;
        self.trade_count += 1;

        debug!(
            asset = %asset_amount,
            cash = %received,
            fee = %cash_fee,
            trades = self.trade_count,
            "sell"
        );

        Ok(Fill {
            asset_delta: -asset_amount,
            cash_delta: received,
            fee: cash_fee,
        })
    }
}
