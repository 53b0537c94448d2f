// Copyright 2026 The crap-clone Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Wall-clock timestamps used throughout the history reconstruction engine.
//!
//! Design Note 9 calls for "a well-defined 64-bit signed integer" in place of
//! the legacy `TIME_MIN`/`TIME_MAX` sentinel pair; [`Timestamp`] is that type,
//! and the bounds below exist only to validate incoming revisions, never as a
//! stand-in for "absent" (that's `Option<Timestamp>`, e.g. in
//! [`crate::fixup::FixupVersion`]).

use std::fmt;

use chrono::DateTime;
use chrono::TimeZone as _;
use chrono::Utc;

/// Sentinel extremes a revision timestamp can never legitimately equal.
/// Values outside `[TIME_MIN + 1, TIME_MAX - 1]` are rejected as malformed
/// input per spec §4.1's "Failure" clause.
pub const TIME_MIN: i64 = i64::MIN;
pub const TIME_MAX: i64 = i64::MAX;

/// Signed wall-clock seconds since the Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Constructs a `Timestamp`, without validating it against
    /// [`TIME_MIN`]/[`TIME_MAX`]; callers that parse untrusted revision logs
    /// should use [`Timestamp::from_log_seconds`] instead.
    pub fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    /// Constructs a `Timestamp` from a revision log's recorded seconds,
    /// rejecting values outside the representable range.
    pub fn from_log_seconds(seconds: i64) -> Option<Self> {
        if (TIME_MIN + 1..=TIME_MAX - 1).contains(&seconds) {
            Some(Self(seconds))
        } else {
            None
        }
    }

    pub fn seconds(self) -> i64 {
        self.0
    }

    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }

    /// Formats as `YYYY-MM-DD HH:MM:SS TZ`, the progress-line format required
    /// by spec §6.
    pub fn format_progress_line(self) -> String {
        self.to_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| format!("<out-of-range:{}>", self.0))
    }

    fn to_datetime(self) -> Option<DateTime<Utc>> {
        match Utc.timestamp_opt(self.0, 0) {
            chrono::LocalResult::Single(dt) => Some(dt),
            chrono::LocalResult::Ambiguous(dt, _) => Some(dt),
            chrono::LocalResult::None => None,
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_seconds() {
        assert!(Timestamp::from_log_seconds(1000).is_some());
        assert!(Timestamp::from_log_seconds(TIME_MIN).is_none());
        assert!(Timestamp::from_log_seconds(TIME_MAX).is_none());
    }

    #[test]
    fn max_picks_the_later_timestamp() {
        let a = Timestamp::new(100);
        let b = Timestamp::new(200);
        assert_eq!(a.max(b), b);
    }
}
