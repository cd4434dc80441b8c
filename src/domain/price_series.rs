//! Timestamp-indexed price observations for one price window.

use rust_decimal::Decimal;

use super::error::StratbenchError;
use super::exact::Exact;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceObservation {
    /// Unix seconds.
    pub timestamp: i64,
    pub exact_price: Exact,
    pub display_price: Decimal,
}

impl PriceObservation {
    /// Observation whose exact price is the display price itself.
    pub fn from_display(timestamp: i64, display_price: Decimal) -> Self {
        PriceObservation {
            timestamp,
            exact_price: Exact::from(display_price),
            display_price,
        }
    }
}

/// A named, non-empty, strictly time-ordered slice of history.
///
/// Gaps between samples are allowed; lookups always compare timestamps and
/// never assume a fixed stride.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    name: String,
    rows: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(name: impl Into<String>, rows: Vec<PriceObservation>) -> Result<Self, StratbenchError> {
        let name = name.into();
        if rows.is_empty() {
            return Err(StratbenchError::NoData {
                what: format!("price window {name}"),
            });
        }
        if let Some(pair) = rows.windows(2).find(|w| w[1].timestamp <= w[0].timestamp) {
            return Err(StratbenchError::InvalidSeries {
                window: name,
                reason: format!(
                    "timestamps must be strictly ascending ({} then {})",
                    pair[0].timestamp, pair[1].timestamp
                ),
            });
        }
        if let Some(row) = rows.iter().find(|r| !r.exact_price.is_positive()) {
            return Err(StratbenchError::InvalidSeries {
                window: name,
                reason: format!("non-positive price {} at {}", row.exact_price, row.timestamp),
            });
        }
        Ok(PriceSeries { name, rows })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PriceObservation] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&PriceObservation> {
        self.rows.get(index)
    }

    pub fn first(&self) -> &PriceObservation {
        &self.rows[0]
    }

    pub fn last(&self) -> &PriceObservation {
        &self.rows[self.last_index()]
    }

    pub fn last_index(&self) -> usize {
        self.rows.len() - 1
    }

    pub fn start_time(&self) -> i64 {
        self.first().timestamp
    }

    pub fn end_time(&self) -> i64 {
        self.last().timestamp
    }

    /// One past the last row at or after `from` whose timestamp is below
    /// `end_exclusive`.
    pub fn window_end(&self, from: usize, end_exclusive: i64) -> usize {
        let from = from.min(self.rows.len());
        from + self.rows[from..].partition_point(|r| r.timestamp < end_exclusive)
    }

    /// First row holding the lowest display price.
    pub fn index_of_min_price(&self) -> usize {
        let mut best = 0;
        for (i, row) in self.rows.iter().enumerate().skip(1) {
            if row.display_price < self.rows[best].display_price {
                best = i;
            }
        }
        best
    }

    /// First row holding the highest display price.
    pub fn index_of_max_price(&self) -> usize {
        let mut best = 0;
        for (i, row) in self.rows.iter().enumerate().skip(1) {
            if row.display_price > self.rows[best].display_price {
                best = i;
            }
        }
        best
    }

    pub fn price_delta(&self) -> Exact {
        &self.last().exact_price - &self.first().exact_price
    }

    /// Ending price as a percentage of the starting price.
    pub fn pct_price_delta(&self) -> Result<Exact, StratbenchError> {
        Ok(self
            .last()
            .exact_price
            .checked_div(&self.first().exact_price)?
            * Exact::from(100))
    }

    /// Sample standard deviation of the display price.
    pub fn display_price_stddev(&self) -> Option<f64> {
        let prices: Vec<f64> = self
            .rows
            .iter()
            .map(|r| Exact::from(r.display_price).to_f64())
            .collect();
        sample_stddev(&prices)
    }
}

/// Sample (n - 1) standard deviation; `None` below two samples.
pub(crate) fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(timestamp: i64, price: i64) -> PriceObservation {
        PriceObservation::from_display(timestamp, Decimal::from(price))
    }

    fn gapped_series() -> PriceSeries {
        // 180 and 240 are missing
        PriceSeries::new(
            "gapped",
            vec![obs(0, 10), obs(60, 12), obs(120, 8), obs(300, 15), obs(360, 8)],
        )
        .unwrap()
    }

    #[test]
    fn empty_series_is_no_data() {
        let err = PriceSeries::new("empty", vec![]).unwrap_err();
        assert!(matches!(err, StratbenchError::NoData { .. }));
    }

    #[test]
    fn unordered_timestamps_rejected() {
        let err = PriceSeries::new("bad", vec![obs(60, 1), obs(0, 1)]).unwrap_err();
        assert!(matches!(err, StratbenchError::InvalidSeries { .. }));

        let err = PriceSeries::new("dup", vec![obs(60, 1), obs(60, 1)]).unwrap_err();
        assert!(matches!(err, StratbenchError::InvalidSeries { .. }));
    }

    #[test]
    fn non_positive_price_rejected() {
        let err = PriceSeries::new("zero", vec![obs(0, 1), obs(60, 0)]).unwrap_err();
        assert!(matches!(err, StratbenchError::InvalidSeries { .. }));
    }

    #[test]
    fn accessors() {
        let s = gapped_series();
        assert_eq!(s.name(), "gapped");
        assert_eq!(s.len(), 5);
        assert_eq!(s.last_index(), 4);
        assert_eq!(s.start_time(), 0);
        assert_eq!(s.end_time(), 360);
        assert_eq!(s.get(3).unwrap().timestamp, 300);
        assert!(s.get(5).is_none());
    }

    #[test]
    fn window_end_uses_timestamps_not_stride() {
        let s = gapped_series();
        assert_eq!(s.window_end(0, 60), 1);
        assert_eq!(s.window_end(0, 121), 3);
        // the gap swallows nothing
        assert_eq!(s.window_end(3, 200), 3);
        assert_eq!(s.window_end(2, 301), 4);
        assert_eq!(s.window_end(0, i64::MAX), 5);
        assert_eq!(s.window_end(5, i64::MAX), 5);
    }

    #[test]
    fn extremes_take_first_occurrence() {
        let s = gapped_series();
        assert_eq!(s.index_of_min_price(), 2);
        assert_eq!(s.index_of_max_price(), 3);
    }

    #[test]
    fn price_deltas() {
        let s = gapped_series();
        assert_eq!(s.price_delta(), Exact::from(-2));
        assert_eq!(s.pct_price_delta().unwrap(), Exact::from(80));
    }

    #[test]
    fn stddev_of_display_price() {
        let s = gapped_series();
        // mean 10.6, squared deviations sum 35.2, / 4 = 8.8
        approx::assert_relative_eq!(s.display_price_stddev().unwrap(), 8.8_f64.sqrt(), epsilon = 1e-12);

        let single = PriceSeries::new("one", vec![obs(0, 5)]).unwrap();
        assert!(single.display_price_stddev().is_none());
    }
}
