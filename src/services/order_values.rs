//! Monetary order-value extraction from free text.
//!
//! Every pattern family is applied and the matches are unioned, so the same
//! amount written twice in different phrasings collapses on its
//! (value, unit) key while the same amount written in two different unit
//! systems does not.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{round_to, OrderValueMatch};

/// Unit classes understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyUnit {
    Crore,
    Lakh,
    Million,
    Billion,
}

impl CurrencyUnit {
    /// Classify a lowercased unit token.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "crore" | "crores" | "cr" => Some(Self::Crore),
            "lakh" | "lakhs" => Some(Self::Lakh),
            "million" | "mn" | "m" => Some(Self::Million),
            "billion" | "bn" | "b" => Some(Self::Billion),
            _ => None,
        }
    }

    /// Convert an amount in this unit to crores.
    pub fn to_crores(self, value: f64) -> f64 {
        match self {
            Self::Crore => value,
            Self::Lakh => value * 0.01,
            Self::Million => value / 10.0,
            Self::Billion => value * 100.0,
        }
    }
}

/// Pattern families in priority order. Group 1 is the number, group 2 the unit.
static VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const NUM: &str = r"([\d,]+(?:\.\d+)?)";
    const CURRENCY: &str = r"(?:rs\.?|inr|₹)";
    const ANY_UNIT: &str = r"(crore|crores|cr|lakh|lakhs|million|mn|m|billion|bn|b)\b";

    [
        format!(r"{CURRENCY}\s*{NUM}\s*(crore|crores|cr)\b"),
        format!(r"{NUM}\s*(crore|crores|cr)\b"),
        format!(r"{CURRENCY}\s*{NUM}\s*(lakh|lakhs)\b"),
        format!(r"{NUM}\s*(lakh|lakhs)\b"),
        format!(r"{NUM}\s*(million|mn|m)\b"),
        format!(r"{NUM}\s*(billion|bn|b)\b"),
        format!(r"(?:worth|value|amount)\s*(?:of\s*)?{CURRENCY}?\s*{NUM}\s*{ANY_UNIT}"),
        format!(r"(?:contract|order)\s*(?:worth|value|amount)?\s*{CURRENCY}?\s*{NUM}\s*{ANY_UNIT}"),
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
    .collect()
});

/// Extract every distinct order value mentioned in `text`.
pub fn extract_order_values(text: &str) -> Vec<OrderValueMatch> {
    let lower = text.to_lowercase();
    let mut seen: HashSet<(i64, String)> = HashSet::new();
    let mut found = Vec::new();
    let mut total = 0.0_f64;

    for pattern in VALUE_PATTERNS.iter() {
        for caps in pattern.captures_iter(&lower) {
            let (Some(number), Some(unit)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let Ok(value) = number.as_str().replace(',', "").parse::<f64>() else {
                continue;
            };
            let unit = unit.as_str().to_lowercase();
            let Some(class) = CurrencyUnit::from_token(&unit) else {
                continue;
            };
            // Rounding scales by 1e4, so huge garbled amounts overflow here.
            let crores = round_to(class.to_crores(value), 4);
            let rounded = round_to(value, 4);
            if crores <= 0.0 || !crores.is_finite() || !rounded.is_finite() {
                continue;
            }
            if !(total + crores).is_finite() {
                continue;
            }

            let key = ((rounded * 10_000.0).round() as i64, unit.clone());
            if !seen.insert(key) {
                continue;
            }

            total += crores;
            found.push(OrderValueMatch {
                value,
                formatted: format!("₹{} {}", format_amount(value), unit),
                unit,
                value_in_crores: crores,
            });
        }
    }

    found
}

/// Two decimals with comma-grouped thousands, e.g. `1,250.00`.
pub fn format_amount(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(fixed.len() + digits.len() / 3 + 1);
    if value < 0.0 {
        grouped.push('-');
    }
    for (i, c) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    grouped.push('.');
    grouped.push_str(frac_part);
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str) -> OrderValueMatch {
        let values = extract_order_values(text);
        assert_eq!(values.len(), 1, "expected one match in {text:?}: {values:?}");
        values.into_iter().next().unwrap()
    }

    #[test]
    fn test_overflowing_amounts_are_skipped() {
        let text = format!("{} crore", "9".repeat(306));
        assert!(extract_order_values(&text).is_empty());

        let mixed = format!("{} crore and Rs. 5 crore", "9".repeat(306));
        let values = extract_order_values(&mixed);
        assert!(values.iter().all(|v| v.value_in_crores.is_finite()));
        assert!(values.iter().any(|v| v.value_in_crores == 5.0));
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(single("10 crore").value_in_crores, 10.0);
        assert_eq!(single("1000 lakh").value_in_crores, 10.0);
        assert_eq!(single("50 million").value_in_crores, 5.0);
        assert_eq!(single("2 billion").value_in_crores, 200.0);
    }

    #[test]
    fn test_phrasings_of_one_amount_collapse() {
        let m = single("XYZ Ltd has received a work order worth Rs. 120.50 crore");
        assert_eq!(m.value, 120.5);
        assert_eq!(m.unit, "crore");
        assert_eq!(m.value_in_crores, 120.5);
        assert_eq!(m.formatted, "₹120.50 crore");
    }

    #[test]
    fn test_thousands_separators() {
        let m = single("Order value INR 1,250 Cr");
        assert_eq!(m.value, 1250.0);
        assert_eq!(m.unit, "cr");
        assert_eq!(m.formatted, "₹1,250.00 cr");
    }

    #[test]
    fn test_cross_unit_amounts_are_not_merged() {
        let values = extract_order_values("worth Rs 100 crore (1000 million)");
        let units: Vec<&str> = values.iter().map(|v| v.unit.as_str()).collect();
        assert!(units.contains(&"crore"));
        assert!(units.contains(&"million"));
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_spelling_variants_are_distinct_keys() {
        let values = extract_order_values("10 crore and also 10 crores");
        assert_eq!(values.len(), 2);
    }

    #[test]
    fn test_non_positive_and_garbage() {
        assert!(extract_order_values("0 crore").is_empty());
        assert!(extract_order_values(", crore").is_empty());
        assert!(extract_order_values("").is_empty());
        assert!(extract_order_values("no amounts in here").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "Contract worth ₹ 45.5 crore and 300 lakhs; total 2 bn";
        assert_eq!(extract_order_values(text), extract_order_values(text));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.5), "0.50");
        assert_eq!(format_amount(999.999), "1,000.00");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
    }
}
