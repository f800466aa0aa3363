use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::StartAfterEnd);
        }
        Ok(Self { start, end })
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> u32 {
        (self.end - self.start).num_days() as u32 + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Splits the range into at most `count` contiguous sub-ranges of
    /// near-equal size. The last chunk absorbs the remainder. The chunks
    /// partition the full range: no gaps, no overlaps.
    pub fn chunk(&self, count: usize) -> Vec<DateRange> {
        let count = count.max(1);
        let total_days = self.days() as u64;
        let chunk_size = (total_days / count as u64).max(1);

        let mut ranges = Vec::new();
        let mut chunk_start = self.start;
        for idx in 0..count {
            let mut chunk_end = chunk_start
                .checked_add_days(Days::new(chunk_size - 1))
                .expect("date overflow in valid range");
            if idx == count - 1 || chunk_end > self.end {
                chunk_end = self.end;
            }
            ranges.push(DateRange {
                start: chunk_start,
                end: chunk_end,
            });
            match chunk_end.checked_add_days(Days::new(1)) {
                Some(next) if next <= self.end => chunk_start = next,
                _ => break,
            }
        }
        ranges
    }

    /// Ascending dates, inclusive of both ends.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        let mut current = Some(self.start);
        std::iter::from_fn(move || {
            let date = current?;
            if date > end {
                return None;
            }
            current = date.checked_add_days(Days::new(1));
            Some(date)
        })
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DateRangeError {
    #[error("Start date must be before or equal to end date")]
    StartAfterEnd,
}
