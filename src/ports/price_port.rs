//! Price data access port trait.

use crate::domain::error::StratbenchError;
use crate::domain::price_series::PriceSeries;

pub trait PriceSource {
    /// Load one named price window.
    fn load_window(&self, name: &str) -> Result<PriceSeries, StratbenchError>;

    /// Names of every window this source can load, sorted.
    fn list_windows(&self) -> Result<Vec<String>, StratbenchError>;
}
