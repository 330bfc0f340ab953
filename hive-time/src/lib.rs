// Copyright (c) 2024 HIVE LABS <contact@hivelabs.dev>
//! Unsigned millisecond time used for work-order timestamps and timeouts
#![warn(missing_docs)]

mod error;
pub use error::TimeError;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Time structure used everywhere.
/// milliseconds since 01/01/1970.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HiveTime(u64);

impl fmt::Display for HiveTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_millis())
    }
}

impl TryFrom<Duration> for HiveTime {
    type Error = TimeError;

    /// Conversion from `std::time::Duration`.
    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Ok(HiveTime(
            value
                .as_millis()
                .try_into()
                .map_err(|_| TimeError::ConversionError)?,
        ))
    }
}

impl From<HiveTime> for Duration {
    fn from(value: HiveTime) -> Self {
        value.to_duration()
    }
}

impl FromStr for HiveTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HiveTime(
            u64::from_str(s).map_err(|_| Self::Err::ConversionError)?,
        ))
    }
}

impl HiveTime {
    /// Conversion from `u64`, representing timestamp in milliseconds.
    /// ```
    /// # use hive_time::*;
    /// let time: HiveTime = HiveTime::from_millis(42);
    /// ```
    pub const fn from_millis(value: u64) -> Self {
        HiveTime(value)
    }

    /// Gets current UNIX timestamp (resolution: milliseconds).
    pub fn now() -> Result<Self, TimeError> {
        let now: u64 = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| TimeError::TimeOverflowError)?
            .as_millis()
            .try_into()
            .map_err(|_| TimeError::TimeOverflowError)?;
        Ok(HiveTime(now))
    }

    /// Conversion to `std::time::Duration`.
    /// ```
    /// # use std::time::Duration;
    /// # use hive_time::*;
    /// let time: HiveTime = HiveTime::from_millis(42);
    /// assert_eq!(time.to_duration(), Duration::from_millis(42));
    /// ```
    pub fn to_duration(&self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Conversion to `u64`, representing milliseconds.
    pub const fn to_millis(&self) -> u64 {
        self.0
    }

    /// Maps this timestamp onto the monotonic `Instant` scale,
    /// for use as a deadline in blocking waits.
    pub fn estimate_instant(self) -> Result<Instant, TimeError> {
        let (cur_timestamp, cur_instant) = (HiveTime::now()?, Instant::now());
        if self >= cur_timestamp {
            cur_instant.checked_add(self.saturating_sub(cur_timestamp).to_duration())
        } else {
            cur_instant.checked_sub(cur_timestamp.saturating_sub(self).to_duration())
        }
        .ok_or(TimeError::TimeOverflowError)
    }

    /// ```
    /// # use hive_time::*;
    /// let time_1: HiveTime = HiveTime::from_millis(42);
    /// let time_2: HiveTime = HiveTime::from_millis(7);
    /// assert_eq!(time_1.saturating_sub(time_2), HiveTime::from_millis(42 - 7))
    /// ```
    #[must_use]
    pub fn saturating_sub(self, t: HiveTime) -> Self {
        HiveTime(self.0.saturating_sub(t.0))
    }

    /// ```
    /// # use hive_time::*;
    /// let time_1: HiveTime = HiveTime::from_millis(42);
    /// let time_2: HiveTime = HiveTime::from_millis(7);
    /// assert_eq!(time_1.saturating_add(time_2), HiveTime::from_millis(42 + 7))
    /// ```
    #[must_use]
    pub fn saturating_add(self, t: HiveTime) -> Self {
        HiveTime(self.0.saturating_add(t.0))
    }

    /// Checked subtraction.
    pub fn checked_sub(self, t: HiveTime) -> Result<Self, TimeError> {
        self.0
            .checked_sub(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("subtraction error".to_string()))
            .map(HiveTime)
    }

    /// Checked addition.
    pub fn checked_add(self, t: HiveTime) -> Result<Self, TimeError> {
        self.0
            .checked_add(t.0)
            .ok_or_else(|| TimeError::CheckedOperationError("addition error".to_string()))
            .map(HiveTime)
    }

    /// ```
    /// # use hive_time::*;
    /// let time1 = HiveTime::from_millis(42);
    /// let time2 = HiveTime::from_millis(84);
    /// assert_eq!(time1.abs_diff(time2), HiveTime::from_millis(42));
    /// assert_eq!(time2.abs_diff(time1), HiveTime::from_millis(42));
    /// ```
    pub fn abs_diff(&self, t: HiveTime) -> HiveTime {
        HiveTime(self.0.abs_diff(t.0))
    }

    /// ```
    /// # use hive_time::*;
    /// let time: HiveTime = HiveTime::from_millis(1_640_995_200_000);
    /// assert_eq!(time.format_instant(), String::from("2022-01-01T00:00:00Z"))
    /// ```
    pub fn format_instant(&self) -> String {
        let naive = OffsetDateTime::from_unix_timestamp((self.to_millis() / 1000) as i64).unwrap();
        naive.format(&Rfc3339).unwrap()
    }

    /// Get max HiveTime value
    pub fn max() -> HiveTime {
        HiveTime::from_millis(u64::MAX)
    }
}
