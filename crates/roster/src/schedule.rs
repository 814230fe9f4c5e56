use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Nightly at 02:00:00.
pub const DEFAULT_CRON: &str = "0 0 2 * * *";

/// Time zone in which cron fields are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleTimezone {
    /// The host's local time zone.
    #[default]
    Local,
    Utc,
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("invalid cron expression {expression:?}: {reason}")]
    InvalidCron { expression: String, reason: String },
}

/// A cron expression bound to a time zone.
///
/// Expressions use the six-field form with seconds first
/// (`sec min hour day-of-month month day-of-week`).
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: cron::Schedule,
    timezone: ScheduleTimezone,
}

impl CronSchedule {
    pub fn parse(expression: &str, timezone: ScheduleTimezone) -> Result<Self, ScheduleError> {
        let schedule =
            cron::Schedule::from_str(expression).map_err(|e| ScheduleError::InvalidCron {
                expression: expression.to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_owned(),
            schedule,
            timezone,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn timezone(&self) -> ScheduleTimezone {
        self.timezone
    }

    /// First fire time strictly after `after`.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self.timezone {
            ScheduleTimezone::Utc => self.schedule.after(&after).next(),
            ScheduleTimezone::Local => self
                .schedule
                .after(&after.with_timezone(&Local))
                .next()
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}
