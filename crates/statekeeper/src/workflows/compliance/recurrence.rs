use chrono::{Days, Months, NaiveDate};

use super::domain::{Frequency, RecurrencePattern};
use crate::workflows::errors::EngineError;

impl RecurrencePattern {
    pub fn new(frequency: Frequency, interval: u32) -> Self {
        Self {
            frequency,
            interval,
            end_by_date: None,
            end_after_occurrences: None,
        }
    }

    pub fn ending_by(mut self, date: NaiveDate) -> Self {
        self.end_by_date = Some(date);
        self
    }

    pub fn ending_after(mut self, occurrences: u32) -> Self {
        self.end_after_occurrences = Some(occurrences);
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.interval == 0 {
            return Err(EngineError::validation(
                "recurrence interval must be at least 1",
            ));
        }
        if self.end_after_occurrences == Some(0) {
            return Err(EngineError::validation(
                "recurrence must allow at least one occurrence",
            ));
        }
        Ok(())
    }

    /// Advance `from` by one step of this pattern.
    ///
    /// Month-based frequencies clamp to the last day of the target month
    /// (Jan 31 + 1 month = Feb 28/29).
    pub fn advance(&self, from: NaiveDate) -> Result<NaiveDate, EngineError> {
        self.validate()?;
        let overflow = || EngineError::validation("recurrence overflows the calendar");

        let next = match self.frequency {
            Frequency::Daily => from.checked_add_days(Days::new(u64::from(self.interval))),
            Frequency::Weekly => from.checked_add_days(Days::new(7 * u64::from(self.interval))),
            Frequency::Monthly => from.checked_add_months(Months::new(self.interval)),
            Frequency::Quarterly => self
                .interval
                .checked_mul(3)
                .and_then(|months| from.checked_add_months(Months::new(months))),
            Frequency::Yearly => self
                .interval
                .checked_mul(12)
                .and_then(|months| from.checked_add_months(Months::new(months))),
        };

        next.ok_or_else(overflow)
    }

    pub fn describe(&self) -> String {
        let unit = match self.frequency {
            Frequency::Daily => "day",
            Frequency::Weekly => "week",
            Frequency::Monthly => "month",
            Frequency::Quarterly => "quarter",
            Frequency::Yearly => "year",
        };
        if self.interval == 1 {
            format!("every {unit}")
        } else {
            format!("every {} {unit}s", self.interval)
        }
    }
}

/// Due date of the next generated instance, or `None` once either bound is hit.
///
/// `generated` is the number of instances already spawned from the lineage.
pub fn next_occurrence(
    pattern: &RecurrencePattern,
    due_date: NaiveDate,
    generated: usize,
) -> Result<Option<NaiveDate>, EngineError> {
    pattern.validate()?;

    if let Some(limit) = pattern.end_after_occurrences {
        if generated >= limit as usize {
            return Ok(None);
        }
    }

    let next = pattern.advance(due_date)?;
    if let Some(end) = pattern.end_by_date {
        if next > end {
            return Ok(None);
        }
    }

    Ok(Some(next))
}
