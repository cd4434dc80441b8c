//! Configuration access port trait.

use crate::domain::error::StratbenchError;
use crate::domain::exact::Exact;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Exact value parsed from the raw text, so `0.997` stays `997/1000`.
    fn get_exact(&self, section: &str, key: &str, default: Exact) -> Result<Exact, StratbenchError> {
        match self.get_string(section, key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| StratbenchError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("'{raw}' is not a number"),
            }),
        }
    }
}
