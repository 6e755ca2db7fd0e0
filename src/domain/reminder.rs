use crate::infrastructure::bluetooth::protocol::{truncate_to_minute, TIME_FORMAT};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReminderError {
    #[error("Please enter a reminder name.")]
    BlankName,
}

/// What the user asked the device to remind them of, and when
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    name: String,
    target: NaiveDateTime,
}

impl Reminder {
    /// Build from picker-style inputs; the name is trimmed and must not be blank
    pub fn new(name: &str, date: NaiveDate, time: NaiveTime) -> Result<Self, ReminderError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReminderError::BlankName);
        }
        Ok(Self {
            name: name.to_string(),
            target: truncate_to_minute(date.and_time(time)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> NaiveDateTime {
        self.target
    }

    /// Confirmation shown once the device accepted the reminder
    pub fn confirmation(&self) -> String {
        format!(
            "Reminder: {}\nTime: {}",
            self.name,
            self.target.format(TIME_FORMAT)
        )
    }
}
