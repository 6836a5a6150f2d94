//! Pricing wire models: exchange rates and geolocation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Exchange rates against a base currency, as served by `/pricing/rates`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateTable {
    pub base: String,
    pub rates: HashMap<String, f64>,
}

impl RateTable {
    /// Look up the multiplier for a currency code.
    ///
    /// Returns None for unknown codes and for unusable rates (zero,
    /// negative, NaN); callers must never multiply by a bad rate.
    pub fn rate(&self, code: &str) -> Option<f64> {
        if code.eq_ignore_ascii_case(&self.base) {
            return Some(1.0);
        }
        self.rates
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(code))
            .map(|(_, rate)| *rate)
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }
}

/// Geolocation hint used to pick a display currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLocation {
    pub country: String,
    pub currency: String,
}
