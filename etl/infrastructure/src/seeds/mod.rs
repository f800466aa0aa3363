pub mod currency_csv;

pub use currency_csv::{default_currency_seeds, load_currency_seeds, SeedFileError};
