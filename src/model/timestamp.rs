use chrono::{Datelike, Duration};
use derive_more::{AsRef, Deref, From};
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::ops::Sub;

pub fn now() -> Timestamp {
    chrono::Utc::now().into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, new, From, Deref, AsRef)]
pub struct Timestamp(chrono::DateTime<chrono::Utc>);

impl Timestamp {
    /// Whole calendar months between `self` and `later`, ignoring the day of month.
    ///
    /// January 31st to February 1st counts as one month, March 1st to March 31st as zero.
    pub fn calendar_months_until(self, later: Timestamp) -> i64 {
        let years = i64::from(later.0.year()) - i64::from(self.0.year());
        let months = i64::from(later.0.month()) - i64::from(self.0.month());
        years * 12 + months
    }

    /// Whole elapsed days (86400 s periods) between `self` and `later`, floored.
    ///
    /// A `later` before `self` gives a negative count rounded away from zero.
    pub fn days_until(self, later: Timestamp) -> i64 {
        (later - self).num_seconds().div_euclid(86_400)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.to_rfc3339().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        chrono::DateTime::parse_from_rfc3339(&s)
            .map(|dt| Self(dt.into()))
            .map_err(serde::de::Error::custom)
    }
}

impl Sub<Timestamp> for Timestamp {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Self::Output {
        self.0 - rhs.0
    }
}
