//! Calendar task categories and validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarCategory {
    Work,
    Study,
    Fitness,
    Personal,
    #[default]
    Other,
}

impl CalendarCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalendarCategory::Work => "work",
            CalendarCategory::Study => "study",
            CalendarCategory::Fitness => "fitness",
            CalendarCategory::Personal => "personal",
            CalendarCategory::Other => "other",
        }
    }
}

impl fmt::Display for CalendarCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalendarCategory {
    type Err = CalendarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(CalendarCategory::Work),
            "study" => Ok(CalendarCategory::Study),
            "fitness" => Ok(CalendarCategory::Fitness),
            "personal" => Ok(CalendarCategory::Personal),
            "other" => Ok(CalendarCategory::Other),
            other => Err(CalendarError::UnknownCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("title is required")]
    MissingTitle,
    #[error("title is longer than {0} characters")]
    TitleTooLong(usize),
    #[error("end_time is before start_time")]
    EndBeforeStart,
    #[error("unknown category: {0}")]
    UnknownCategory(String),
}

/// Unsaved calendar entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: CalendarCategory,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub reminder_time: Option<DateTime<Utc>>,
}

impl CalendarEntry {
    /// Trim text fields and check the time range
    pub fn validated(mut self) -> Result<Self, CalendarError> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(CalendarError::MissingTitle);
        }
        if self.title.chars().count() > MAX_TITLE_CHARS {
            return Err(CalendarError::TitleTooLong(MAX_TITLE_CHARS));
        }
        if self.end_time < self.start_time {
            return Err(CalendarError::EndBeforeStart);
        }
        self.description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Ok(self)
    }
}
