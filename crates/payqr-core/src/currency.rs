//! ISO 4217 alphabetic → numeric currency codes (EMV tag 53)

/// Numeric code used when the currency is missing or unknown (INR).
pub const DEFAULT_NUMERIC: &str = "356";

const CURRENCIES: &[(&str, &str)] = &[
    ("AED", "784"),
    ("AUD", "036"),
    ("CNY", "156"),
    ("EUR", "978"),
    ("GBP", "826"),
    ("HKD", "344"),
    ("IDR", "360"),
    ("INR", "356"),
    ("JPY", "392"),
    ("MYR", "458"),
    ("PHP", "608"),
    ("SGD", "702"),
    ("THB", "764"),
    ("USD", "840"),
    ("VND", "704"),
];

/// Resolves an alphabetic code (case-insensitive) to its numeric code.
///
/// Unknown or empty codes fall back to [`DEFAULT_NUMERIC`].
pub fn numeric_code(alpha: &str) -> &'static str {
    let upper = alpha.trim().to_ascii_uppercase();
    match CURRENCIES.iter().find(|(a, _)| *a == upper) {
        Some((_, numeric)) => *numeric,
        None => {
            if !upper.is_empty() {
                log::warn!("Unknown currency {:?}, falling back to {}", alpha, DEFAULT_NUMERIC);
            }
            DEFAULT_NUMERIC
        }
    }
}

/// Reverse lookup, numeric → alphabetic.
pub fn alpha_code(numeric: &str) -> Option<&'static str> {
    CURRENCIES
        .iter()
        .find(|(_, n)| *n == numeric)
        .map(|(alpha, _)| *alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(numeric_code("INR"), "356");
        assert_eq!(numeric_code("SGD"), "702");
        assert_eq!(numeric_code("USD"), "840");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(numeric_code("sgd"), "702");
        assert_eq!(numeric_code(" usd "), "840");
    }

    #[test]
    fn test_unknown_falls_back_to_inr() {
        assert_eq!(numeric_code("XYZ"), numeric_code("INR"));
        assert_eq!(numeric_code(""), DEFAULT_NUMERIC);
    }

    #[test]
    fn test_reverse_lookup() {
        assert_eq!(alpha_code("702"), Some("SGD"));
        assert_eq!(alpha_code("999"), None);
    }

    #[test]
    fn test_table_is_consistent() {
        for (alpha, numeric) in CURRENCIES {
            assert_eq!(alpha.len(), 3);
            assert_eq!(numeric.len(), 3);
            assert_eq!(alpha_code(numeric), Some(*alpha));
        }
    }
}
