pub mod calendar;
pub mod currency;
pub mod date_range;
pub mod fact;
pub mod flatten;
pub mod payload;

pub use calendar::{build_calendar, date_from_key, date_key, CalendarIndex, CalendarRow};
pub use currency::CurrencyRow;
pub use date_range::{DateRange, DateRangeError};
pub use fact::{DateKeyRange, FactKey, FactRow, FactRowError};
pub use flatten::{flatten_all, flatten_payload, FlattenOutcome};
pub use payload::RatePayload;
