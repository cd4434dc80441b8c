//! Daily market-sentiment readings (0 = extreme fear, 100 = extreme greed).

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};

use super::error::StratbenchError;

/// Date format used by sentiment files.
pub const SENTIMENT_DATE_FORMAT: &str = "%m-%d-%Y";

#[derive(Debug, Clone, Default)]
pub struct SentimentIndex {
    by_day: BTreeMap<NaiveDate, u8>,
}

impl SentimentIndex {
    /// Build from `(day, value)` pairs. A day listed twice or a value above
    /// 100 is rejected.
    pub fn new(
        readings: impl IntoIterator<Item = (NaiveDate, u8)>,
    ) -> Result<Self, StratbenchError> {
        let mut by_day = BTreeMap::new();
        for (day, value) in readings {
            if value > 100 {
                return Err(StratbenchError::InvalidSeries {
                    window: "sentiment".into(),
                    reason: format!("value {value} on {day} is above 100"),
                });
            }
            if by_day.insert(day, value).is_some() {
                return Err(StratbenchError::InvalidSeries {
                    window: "sentiment".into(),
                    reason: format!("more than one value for {day}"),
                });
            }
        }
        Ok(SentimentIndex { by_day })
    }

    pub fn len(&self) -> usize {
        self.by_day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_day.is_empty()
    }

    pub fn on(&self, day: NaiveDate) -> Option<u8> {
        self.by_day.get(&day).copied()
    }

    /// Reading for the UTC day containing `timestamp`.
    pub fn at(&self, timestamp: i64) -> Result<u8, StratbenchError> {
        let day = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| StratbenchError::invalid_argument(format!("bad timestamp {timestamp}")))?
            .date_naive();
        self.on(day).ok_or_else(|| StratbenchError::NoData {
            what: format!("sentiment for {}", day.format(SENTIMENT_DATE_FORMAT)),
        })
    }
}
