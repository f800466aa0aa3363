use serde::{Deserialize, Serialize};

/// Currency dimension row. `currency_key` is a durable surrogate: a code
/// keeps its key across reseeding, new codes get the next unused key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyRow {
    pub currency_key: i64,
    pub currency_code: String,
    pub currency_name: String,
}

impl CurrencyRow {
    pub fn new(currency_key: i64, currency_code: impl Into<String>, currency_name: impl Into<String>) -> Self {
        Self {
            currency_key,
            currency_code: currency_code.into(),
            currency_name: currency_name.into(),
        }
    }
}

/// Accepts exactly three ASCII letters, normalized to uppercase.
pub fn normalize_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" usd "), Some("USD".to_string()));
        assert_eq!(normalize_code("US"), None);
        assert_eq!(normalize_code("U5D"), None);
        assert_eq!(normalize_code("USDX"), None);
    }
}
