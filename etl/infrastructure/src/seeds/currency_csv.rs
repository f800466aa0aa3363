use std::path::Path;

use csv::ReaderBuilder;
use etl_application::currency_service::CurrencySeed;
use etl_domain::currency::normalize_code;
use tracing::warn;

/// Fallback list used when no seed CSV is supplied.
pub fn default_currency_seeds() -> Vec<CurrencySeed> {
    vec![
        CurrencySeed::new("EUR", "Euro"),
        CurrencySeed::new("GBP", "British Pound"),
        CurrencySeed::new("AUD", "Australian Dollar"),
        CurrencySeed::new("USD", "US Dollar"),
        CurrencySeed::new("SGD", "Singapore Dollar"),
    ]
}

/// Reads `currency_code,currency_name` rows, skipping the header and any row
/// whose code is not three letters.
pub fn load_currency_seeds(path: &Path) -> Result<Vec<CurrencySeed>, SeedFileError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut seeds = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(raw_code) = record.get(0) else {
            continue;
        };
        let Some(code) = normalize_code(raw_code) else {
            warn!(code = %raw_code, "skipping seed row with malformed currency code");
            continue;
        };
        let name = record.get(1).unwrap_or("").trim().to_string();
        seeds.push(CurrencySeed::new(code, name));
    }
    Ok(seeds)
}

#[derive(Debug, thiserror::Error)]
pub enum SeedFileError {
    #[error("Seed file error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_csv(name: &str, contents: &str) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("fx-seeds-{}-{}.csv", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_header_skipped_and_codes_normalized() {
        let path = temp_csv(
            "basic",
            "currency_code,currency_name\nusd,US Dollar\nEUR, Euro \n",
        );

        let seeds = load_currency_seeds(&path).unwrap();
        assert_eq!(
            seeds,
            vec![
                CurrencySeed::new("USD", "US Dollar"),
                CurrencySeed::new("EUR", "Euro"),
            ]
        );

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_rows_dropped() {
        let path = temp_csv(
            "malformed",
            "currency_code,currency_name\nUS,Too Short\nJPY,Japanese Yen\n,\n",
        );

        let seeds = load_currency_seeds(&path).unwrap();
        assert_eq!(seeds, vec![CurrencySeed::new("JPY", "Japanese Yen")]);

        fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("fx-seeds-does-not-exist.csv");
        assert!(load_currency_seeds(&path).is_err());
    }
}
