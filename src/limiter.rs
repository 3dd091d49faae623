// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission rate limiter.
//!
//! Implements two independent limits per channel, evaluated against the
//! channel's persisted [`RateLimitRecord`]:
//! 1. Minimum interval between accepted submissions
//! 2. Maximum accepted submissions in any trailing hour
//!
//! The limiter is advisory. It throttles honest users and accidental double
//! posts; anyone can clear local storage to bypass it. Two contexts sharing
//! a store may both pass a check before either records.

use crate::clock::{Clock, SystemClock};
use crate::config::{Channel, ChannelConfig, LimiterConfig};
use crate::record::{RateLimitRecord, StoredRecord, WINDOW_MS};
use crate::storage::KeyValueStore;
use serde::{Serialize, Serializer};
use std::fmt;
use tracing::{debug, warn};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitStatus {
    /// Submission may proceed
    Allowed,
    /// Submission must wait
    Limited {
        /// Which limit was hit
        reason: LimitReason,
        /// Whole seconds to wait before retrying, rounded up
        wait_time_secs: u64,
    },
}

impl LimitStatus {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Seconds to wait; 0 when allowed.
    pub fn wait_time_secs(&self) -> u64 {
        match self {
            Self::Allowed => 0,
            Self::Limited { wait_time_secs, .. } => *wait_time_secs,
        }
    }

    pub fn reason(&self) -> Option<&LimitReason> {
        match self {
            Self::Allowed => None,
            Self::Limited { reason, .. } => Some(reason),
        }
    }
}

/// Reason for rate limiting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitReason {
    /// Last submission was too recent
    MinInterval { unit: String },
    /// Hourly cap reached
    HourlyCap { limit: u32, unit: String },
}

impl fmt::Display for LimitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinInterval { unit } => write!(f, "Please wait a moment between {}", unit),
            Self::HourlyCap { limit, unit } => {
                write!(f, "Hourly limit reached ({} {} per hour)", limit, unit)
            }
        }
    }
}

/// Wire shape handed to the submission flow.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LimitStatusBody<'a> {
    allowed: bool,
    wait_time_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "display_opt")]
    reason: Option<&'a LimitReason>,
}

fn display_opt<S: Serializer>(reason: &Option<&LimitReason>, s: S) -> Result<S::Ok, S::Error> {
    match reason {
        Some(reason) => s.collect_str(reason),
        None => s.serialize_none(),
    }
}

impl Serialize for LimitStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LimitStatusBody {
            allowed: self.is_allowed(),
            wait_time_seconds: self.wait_time_secs(),
            reason: self.reason(),
        }
        .serialize(serializer)
    }
}

/// Round a millisecond span up to whole seconds, clamping negatives to 0.
fn ceil_secs(ms: i64) -> u64 {
    if ms <= 0 {
        0
    } else {
        (ms as u64).div_ceil(1000)
    }
}

/// Decide whether a submission at `now` may proceed.
///
/// Pure function of its inputs. The minimum interval is checked first since
/// it is by far the more common rejection.
pub fn evaluate(now: i64, record: &RateLimitRecord, config: &ChannelConfig) -> LimitStatus {
    let min_interval_ms = config.min_interval_ms();

    if record.last_submission != 0 {
        let elapsed = now.saturating_sub(record.last_submission);
        if elapsed < min_interval_ms {
            return LimitStatus::Limited {
                reason: LimitReason::MinInterval {
                    unit: config.unit.clone(),
                },
                wait_time_secs: ceil_secs(min_interval_ms.saturating_sub(elapsed)),
            };
        }
    }

    let recent = record.pruned(now);
    if recent.recent_timestamps.len() >= config.max_per_hour as usize {
        // max_per_hour of 0 blocks everything; wait a full window in that case
        let oldest = recent.oldest().unwrap_or(now);
        return LimitStatus::Limited {
            reason: LimitReason::HourlyCap {
                limit: config.max_per_hour,
                unit: config.unit.clone(),
            },
            wait_time_secs: ceil_secs(oldest.saturating_add(WINDOW_MS).saturating_sub(now)),
        };
    }

    LimitStatus::Allowed
}

/// Rate limiter over an injected store and clock.
pub struct RateLimiter<S, C = SystemClock> {
    config: LimiterConfig,
    store: S,
    clock: C,
}

impl<S: KeyValueStore> RateLimiter<S> {
    /// Create a limiter using the system clock.
    pub fn new(config: LimiterConfig, store: S) -> Self {
        Self::with_clock(config, store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> RateLimiter<S, C> {
    pub fn with_clock(config: LimiterConfig, store: S, clock: C) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Load a channel's record as stored, without interpreting failures.
    pub fn load(&self, channel: Channel) -> StoredRecord {
        let key = channel.storage_key();
        match self.store.get(&key) {
            Ok(raw) => StoredRecord::parse(raw.as_deref()),
            Err(e) => {
                warn!(%channel, error = %e, "Rate limit storage unreadable, treating as empty");
                StoredRecord::Missing
            }
        }
    }

    /// The record the limiter will evaluate for `channel`.
    pub fn record(&self, channel: Channel) -> RateLimitRecord {
        let stored = self.load(channel);
        if let StoredRecord::Corrupt(ref error) = stored {
            warn!(%channel, %error, "Rate limit record corrupt, treating as empty");
        }
        stored.into_record()
    }

    /// Check whether `channel` may accept a submission now.
    ///
    /// Never writes to storage.
    pub fn check_limit(&self, channel: Channel) -> LimitStatus {
        let now = self.clock.now_millis();
        let record = self.record(channel);
        let status = evaluate(now, &record, self.config.channel(channel));

        match &status {
            LimitStatus::Allowed => debug!(%channel, "Submission allowed"),
            LimitStatus::Limited {
                reason,
                wait_time_secs,
            } => debug!(%channel, %reason, wait_time_secs, "Submission rate limited"),
        }

        status
    }

    /// Record an accepted submission for `channel`.
    ///
    /// Call only after the remote store has accepted the submission. Write
    /// failures are logged and swallowed.
    pub fn record_submission(&self, channel: Channel) {
        let now = self.clock.now_millis();
        let record = self.record(channel).with_submission(now);

        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                warn!(%channel, error = %e, "Failed to encode rate limit record");
                return;
            }
        };

        match self.store.set(&channel.storage_key(), &json) {
            Ok(()) => debug!(
                %channel,
                submission_count = record.submission_count,
                recent = record.recent_timestamps.len(),
                "Submission recorded"
            ),
            Err(e) => warn!(%channel, error = %e, "Failed to persist rate limit record"),
        }
    }
}
