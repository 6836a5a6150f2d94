//! Currency conversion and display formatting for plan prices.
//!
//! Prices are stored in USD; conversion multiplies by a cached exchange
//! rate and formatting follows per-currency decimal and grouping
//! conventions. A missing or unusable rate falls back to USD display;
//! the amount is never run through a bad rate.

use crate::models::pricing::RateTable;

/// Display conventions for one currency.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyFormat {
    pub code: &'static str,
    pub symbol: &'static str,
    pub decimals: u32,
    pub decimal_sep: char,
    pub group_sep: char,
    /// Indian numbering: first group of three, then groups of two.
    pub indian_grouping: bool,
}

pub const CURRENCIES: [CurrencyFormat; 7] = [
    CurrencyFormat {
        code: "USD",
        symbol: "$",
        decimals: 2,
        decimal_sep: '.',
        group_sep: ',',
        indian_grouping: false,
    },
    CurrencyFormat {
        code: "EUR",
        symbol: "€",
        decimals: 2,
        decimal_sep: ',',
        group_sep: '.',
        indian_grouping: false,
    },
    CurrencyFormat {
        code: "GBP",
        symbol: "£",
        decimals: 2,
        decimal_sep: '.',
        group_sep: ',',
        indian_grouping: false,
    },
    CurrencyFormat {
        code: "JPY",
        symbol: "¥",
        decimals: 0,
        decimal_sep: '.',
        group_sep: ',',
        indian_grouping: false,
    },
    CurrencyFormat {
        code: "INR",
        symbol: "₹",
        decimals: 2,
        decimal_sep: '.',
        group_sep: ',',
        indian_grouping: true,
    },
    CurrencyFormat {
        code: "BRL",
        symbol: "R$",
        decimals: 2,
        decimal_sep: ',',
        group_sep: '.',
        indian_grouping: false,
    },
    CurrencyFormat {
        code: "AUD",
        symbol: "A$",
        decimals: 2,
        decimal_sep: '.',
        group_sep: ',',
        indian_grouping: false,
    },
];

/// Look up display conventions by currency code, case-insensitively.
pub fn currency_format(code: &str) -> Option<&'static CurrencyFormat> {
    CURRENCIES
        .iter()
        .find(|format| format.code.eq_ignore_ascii_case(code))
}

/// Convert a USD amount into the target currency.
pub fn convert(usd: f64, code: &str, rates: &RateTable) -> Option<f64> {
    rates.rate(code).map(|rate| usd * rate)
}

/// Convert and format, falling back to USD display when the currency is
/// unknown or no usable rate exists.
pub fn display_price(usd: f64, code: &str, rates: &RateTable) -> String {
    match (currency_format(code), convert(usd, code, rates)) {
        (Some(format), Some(amount)) => format_price(amount, format),
        _ => {
            tracing::debug!(code, "no usable rate or format, falling back to USD");
            format_price(usd, &CURRENCIES[0])
        }
    }
}

/// Format an amount per the currency's display conventions.
pub fn format_price(amount: f64, format: &CurrencyFormat) -> String {
    let negative = amount < 0.0;
    let factor = 10u64.pow(format.decimals);
    let scaled = (amount.abs() * factor as f64).round() as u64;
    let units = scaled / factor;
    let fraction = scaled % factor;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(format.symbol);
    out.push_str(&group_digits(units, format));
    if format.decimals > 0 {
        out.push(format.decimal_sep);
        out.push_str(&format!(
            "{fraction:0width$}",
            width = format.decimals as usize
        ));
    }
    out
}

fn group_digits(units: u64, format: &CurrencyFormat) -> String {
    let digits = units.to_string();
    let mut grouped = Vec::new();
    let mut count = 0;
    let mut group_size = 3;

    for ch in digits.chars().rev() {
        if count == group_size {
            grouped.push(format.group_sep);
            count = 0;
            if format.indian_grouping {
                group_size = 2;
            }
        }
        grouped.push(ch);
        count += 1;
    }

    grouped.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn rates() -> RateTable {
        RateTable {
            base: "USD".to_string(),
            rates: HashMap::from([
                ("EUR".to_string(), 0.9),
                ("JPY".to_string(), 150.0),
                ("INR".to_string(), 83.0),
            ]),
        }
    }

    fn fmt(code: &str) -> &'static CurrencyFormat {
        currency_format(code).unwrap()
    }

    #[test]
    fn convert_multiplies_by_rate() {
        assert_eq!(convert(100.0, "EUR", &rates()), Some(90.0));
        assert_eq!(convert(100.0, "USD", &rates()), Some(100.0));
    }

    #[test]
    fn convert_missing_rate_is_none() {
        assert_eq!(convert(100.0, "GBP", &rates()), None);
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_price(1234567.89, fmt("USD")), "$1,234,567.89");
        assert_eq!(format_price(29.0, fmt("USD")), "$29.00");
    }

    #[test]
    fn eur_swaps_separators() {
        assert_eq!(format_price(1234567.89, fmt("EUR")), "€1.234.567,89");
    }

    #[test]
    fn jpy_has_no_decimals() {
        assert_eq!(format_price(1234567.0, fmt("JPY")), "¥1,234,567");
        assert_eq!(format_price(99.6, fmt("JPY")), "¥100");
    }

    #[test]
    fn inr_uses_indian_grouping() {
        assert_eq!(format_price(1234567.89, fmt("INR")), "₹12,34,567.89");
        assert_eq!(format_price(123.45, fmt("INR")), "₹123.45");
    }

    #[test]
    fn rounding_carries_into_units() {
        assert_eq!(format_price(9.999, fmt("USD")), "$10.00");
    }

    #[test]
    fn negative_amounts_keep_the_sign_outside() {
        assert_eq!(format_price(-29.99, fmt("USD")), "-$29.99");
    }

    #[test]
    fn display_price_converts_known_currency() {
        assert_eq!(display_price(100.0, "JPY", &rates()), "¥15,000");
        assert_eq!(display_price(29.0, "eur", &rates()), "€26,10");
    }

    #[test]
    fn display_price_falls_back_to_usd_without_a_rate() {
        assert_eq!(display_price(29.0, "GBP", &rates()), "$29.00");
    }

    #[test]
    fn display_price_falls_back_for_unknown_currency() {
        let mut table = rates();
        table.rates.insert("XTS".to_string(), 2.0);
        assert_eq!(display_price(10.0, "XTS", &table), "$10.00");
    }
}
