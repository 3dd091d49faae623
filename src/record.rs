// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persisted per-channel rate limit record.
//!
//! Stored as JSON under the channel's storage key:
//!
//! ```json
//! {"lastSubmission": 1700000000000, "submissionCount": 3, "recentTimestamps": [1700000000000]}
//! ```
//!
//! Older records written by the site used `hourlySubmissions` (guestbook)
//! or `hourlyComments` (blog comments) for the timestamp list; both are read.

use serde::{Deserialize, Deserializer, Serialize};

/// Length of the trailing window used for the hourly cap.
pub const WINDOW_MS: i64 = 60 * 60 * 1000;

/// Rate limit state for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRecord {
    /// Most recent accepted submission in epoch ms, 0 if none
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_submission: i64,

    /// Lifetime count of accepted submissions
    #[serde(default, deserialize_with = "null_as_default")]
    pub submission_count: u64,

    /// Accepted submissions inside the trailing window
    #[serde(
        default,
        alias = "hourlySubmissions",
        alias = "hourlyComments",
        deserialize_with = "null_as_default"
    )]
    pub recent_timestamps: Vec<i64>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RateLimitRecord {
    /// Drop timestamps that have left the window ending at `now`.
    ///
    /// A timestamp exactly [`WINDOW_MS`] old is dropped.
    pub fn prune(&mut self, now: i64) {
        let cutoff = now.saturating_sub(WINDOW_MS);
        self.recent_timestamps.retain(|&t| t > cutoff);
    }

    /// Copy of this record pruned to the window ending at `now`.
    pub fn pruned(&self, now: i64) -> Self {
        let mut record = self.clone();
        record.prune(now);
        record
    }

    /// Oldest timestamp still counted.
    pub fn oldest(&self) -> Option<i64> {
        self.recent_timestamps.iter().copied().min()
    }

    /// The record after an accepted submission at `now`.
    pub fn with_submission(&self, now: i64) -> Self {
        let mut record = self.pruned(now);
        record.last_submission = record.last_submission.max(now);
        record.submission_count = record.submission_count.saturating_add(1);
        record.recent_timestamps.push(now);
        record
    }
}

/// Outcome of loading a record from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredRecord {
    /// Nothing stored under the key
    Missing,
    /// Something is stored, but it is not a record
    Corrupt(String),
    /// A readable record
    Present(RateLimitRecord),
}

impl StoredRecord {
    /// Interpret a raw stored value.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => Self::Missing,
            Some(raw) => match serde_json::from_str(raw) {
                Ok(record) => Self::Present(record),
                Err(e) => Self::Corrupt(e.to_string()),
            },
        }
    }

    /// The record to evaluate. Missing and corrupt values both start fresh.
    pub fn into_record(self) -> RateLimitRecord {
        match self {
            Self::Present(record) => record,
            Self::Missing | Self::Corrupt(_) => RateLimitRecord::default(),
        }
    }
}
