//! Time buckets.
//!
//! Every upload in a pass is placed under the same `YYYY/MM/DD/HH` prefix,
//! derived from the pass's start time in UTC.

use derive_more::Display;
use time::UtcDateTime;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub struct TimeBucket(String);

impl TimeBucket {
    /// Bucket containing the given instant.
    ///
    /// ```
    /// use retrosync_sync::TimeBucket;
    /// use time::macros::utc_datetime;
    /// assert_eq!(TimeBucket::at(utc_datetime!(2024-01-17 12:59:59)).as_str(), "2024/01/17/12");
    /// ```
    pub fn at(instant: UtcDateTime) -> Self {
        Self(format!(
            "{:04}/{:02}/{:02}/{:02}",
            instant.year(),
            u8::from(instant.month()),
            instant.day(),
            instant.hour()
        ))
    }

    pub fn now() -> Self {
        Self::at(UtcDateTime::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl AsRef<str> for TimeBucket {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
