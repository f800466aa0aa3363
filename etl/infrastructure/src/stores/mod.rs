pub mod postgres;
pub mod sqlite;

pub use postgres::PostgresRateStore;
pub use sqlite::SqliteRateStore;
