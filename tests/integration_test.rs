// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Integration tests for the submission rate limiter.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use submission_rate_limiter::{
    config::{Channel, LimiterConfig},
    limiter::{LimitReason, LimitStatus, RateLimiter},
    record::RateLimitRecord,
    storage::{FileStore, KeyValueStore, MemoryStore},
    ManualClock,
};

// Far enough from the epoch that a zero lastSubmission never looks recent
const START: i64 = 1_700_000_000_000;

fn limiter_at(
    secs: i64,
) -> (
    RateLimiter<Arc<MemoryStore>, Arc<ManualClock>>,
    Arc<MemoryStore>,
    Arc<ManualClock>,
) {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(START + secs * 1000));
    let limiter = RateLimiter::with_clock(LimiterConfig::default(), store.clone(), clock.clone());
    (limiter, store, clock)
}

fn at(clock: &ManualClock, secs: i64) {
    clock.set_millis(START + secs * 1000);
}

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("{}-{}-{}.json", name, std::process::id(), nanos))
}

#[test]
fn test_no_record_is_allowed() {
    let (limiter, _, _) = limiter_at(0);

    for channel in Channel::ALL {
        let status = limiter.check_limit(channel);
        assert_eq!(status, LimitStatus::Allowed);
        assert_eq!(status.wait_time_secs(), 0);
    }
}

#[test]
fn test_min_interval_after_record() {
    let (limiter, _, clock) = limiter_at(0);
    limiter.record_submission(Channel::BlogComment);

    at(&clock, 60);
    let status = limiter.check_limit(Channel::BlogComment);
    assert_eq!(
        status,
        LimitStatus::Limited {
            reason: LimitReason::MinInterval {
                unit: "comments".to_string()
            },
            wait_time_secs: 60,
        }
    );

    at(&clock, 121);
    assert_eq!(limiter.check_limit(Channel::BlogComment), LimitStatus::Allowed);
}

#[test]
fn test_waiting_the_reported_time_is_enough() {
    let (limiter, _, clock) = limiter_at(0);
    limiter.record_submission(Channel::Guestbook);

    clock.set_millis(START + 12_345);
    let wait = limiter.check_limit(Channel::Guestbook).wait_time_secs();
    assert_eq!(wait, 288);

    clock.set_millis(START + 12_345 + wait as i64 * 1000);
    assert!(limiter.check_limit(Channel::Guestbook).is_allowed());
}

#[test]
fn test_hourly_cap() {
    let (limiter, _, clock) = limiter_at(0);

    // 20 comments, three minutes apart
    for i in 0..20 {
        at(&clock, i * 180);
        assert!(
            limiter.check_limit(Channel::BlogComment).is_allowed(),
            "comment {} should pass",
            i + 1
        );
        limiter.record_submission(Channel::BlogComment);
    }

    // Straight after the 20th the minimum interval still applies
    at(&clock, 3421);
    let status = limiter.check_limit(Channel::BlogComment);
    assert!(matches!(status.reason(), Some(LimitReason::MinInterval { .. })));
    assert_eq!(status.wait_time_secs(), 119);

    // Once the interval has passed, the hourly cap takes over until the
    // first comment leaves the window at t=3600
    at(&clock, 3540);
    let status = limiter.check_limit(Channel::BlogComment);
    assert_eq!(
        status,
        LimitStatus::Limited {
            reason: LimitReason::HourlyCap {
                limit: 20,
                unit: "comments".to_string()
            },
            wait_time_secs: 60,
        }
    );
    assert_eq!(
        status.reason().map(ToString::to_string).as_deref(),
        Some("Hourly limit reached (20 comments per hour)")
    );

    at(&clock, 3600);
    assert!(limiter.check_limit(Channel::BlogComment).is_allowed());
}

#[test]
fn test_guestbook_hourly_cap() {
    let (limiter, _, clock) = limiter_at(0);

    // 10 entries, six minutes apart
    for i in 0..10 {
        at(&clock, i * 360);
        assert!(
            limiter.check_limit(Channel::Guestbook).is_allowed(),
            "entry {} should pass",
            i + 1
        );
        limiter.record_submission(Channel::Guestbook);
    }

    // Five minutes after the 10th entry
    at(&clock, 3240 + 299);
    let status = limiter.check_limit(Channel::Guestbook);
    assert_eq!(
        status.reason().map(ToString::to_string).as_deref(),
        Some("Please wait a moment between submissions")
    );
    assert_eq!(status.wait_time_secs(), 1);

    at(&clock, 3240 + 300);
    let status = limiter.check_limit(Channel::Guestbook);
    assert_eq!(
        status,
        LimitStatus::Limited {
            reason: LimitReason::HourlyCap {
                limit: 10,
                unit: "submissions".to_string()
            },
            wait_time_secs: 60,
        }
    );
    assert_eq!(
        status.reason().map(ToString::to_string).as_deref(),
        Some("Hourly limit reached (10 submissions per hour)")
    );

    // Blog comments are unaffected
    assert!(limiter.check_limit(Channel::BlogComment).is_allowed());

    at(&clock, 3600);
    assert!(limiter.check_limit(Channel::Guestbook).is_allowed());
}

#[test]
fn test_extreme_stored_timestamps_do_not_panic() {
    let (limiter, store, _) = limiter_at(0);
    let record = RateLimitRecord {
        last_submission: 0,
        submission_count: 20,
        recent_timestamps: vec![i64::MAX; 20],
    };
    store
        .set("blogCommentRateLimit", &serde_json::to_string(&record).unwrap())
        .unwrap();

    let status = limiter.check_limit(Channel::BlogComment);
    assert!(matches!(status.reason(), Some(LimitReason::HourlyCap { limit: 20, .. })));
    assert!(status.wait_time_secs() > 0);

    let far_future = r#"{"lastSubmission":9223372036854775807,"recentTimestamps":[]}"#;
    store.set("guestbookRateLimit", far_future).unwrap();
    let status = limiter.check_limit(Channel::Guestbook);
    assert!(matches!(status.reason(), Some(LimitReason::MinInterval { .. })));
}

#[test]
fn test_file_store_recovers_from_corrupt_file() {
    let path = temp_path("limiter-corrupt-store");
    fs::write(&path, "{not json").unwrap();

    let clock = Arc::new(ManualClock::new(START));
    let limiter =
        RateLimiter::with_clock(LimiterConfig::default(), FileStore::new(&path), clock.clone());

    assert!(limiter.check_limit(Channel::Guestbook).is_allowed());
    limiter.record_submission(Channel::Guestbook);

    let record = limiter.record(Channel::Guestbook);
    assert_eq!(record.submission_count, 1);
    assert_eq!(record.recent_timestamps, vec![START]);
    assert!(!limiter.check_limit(Channel::Guestbook).is_allowed());

    // The rewritten file is a valid store for every channel
    at(&clock, 10);
    limiter.record_submission(Channel::BlogComment);
    assert_eq!(limiter.record(Channel::BlogComment).submission_count, 1);
    assert_eq!(limiter.record(Channel::Guestbook).submission_count, 1);

    fs::remove_file(&path).unwrap();
}

#[test]
fn test_hourly_wait_rounds_up() {
    let (limiter, _, clock) = limiter_at(0);
    for i in 0..20 {
        clock.set_millis(START + i * 180_000 + 250);
        limiter.record_submission(Channel::BlogComment);
    }

    at(&clock, 3541);
    // Oldest at START + 250ms leaves the window 59.25s from now
    assert_eq!(limiter.check_limit(Channel::BlogComment).wait_time_secs(), 60);
}

#[test]
fn test_check_is_idempotent() {
    let (limiter, store, clock) = limiter_at(0);
    limiter.record_submission(Channel::Guestbook);
    let stored = store.get("guestbookRateLimit").unwrap();

    at(&clock, 10);
    let first = limiter.check_limit(Channel::Guestbook);
    let second = limiter.check_limit(Channel::Guestbook);
    let third = limiter.check_limit(Channel::Guestbook);

    assert_eq!(first, second);
    assert_eq!(second, third);
    assert_eq!(store.get("guestbookRateLimit").unwrap(), stored);
}

#[test]
fn test_record_prunes_old_timestamps() {
    let (limiter, store, clock) = limiter_at(0);
    limiter.record_submission(Channel::Guestbook);

    at(&clock, 3600);
    limiter.record_submission(Channel::Guestbook);

    let raw = store.get("guestbookRateLimit").unwrap().unwrap();
    let record: RateLimitRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(record.submission_count, 2);
    assert_eq!(record.last_submission, START + 3_600_000);
    assert_eq!(record.recent_timestamps, vec![START + 3_600_000]);
}

#[test]
fn test_corrupt_record_fails_open() {
    let (limiter, store, _) = limiter_at(0);
    store.set("blogCommentRateLimit", "{not json").unwrap();

    assert_eq!(limiter.check_limit(Channel::BlogComment), LimitStatus::Allowed);

    limiter.record_submission(Channel::BlogComment);
    let raw = store.get("blogCommentRateLimit").unwrap().unwrap();
    let record: RateLimitRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(
        record,
        RateLimitRecord {
            last_submission: START,
            submission_count: 1,
            recent_timestamps: vec![START],
        }
    );
}

#[test]
fn test_legacy_record_is_honoured() {
    let (limiter, store, _) = limiter_at(0);
    let legacy = format!(
        r#"{{"lastSubmission":{},"submissionCount":4,"hourlySubmissions":[{}]}}"#,
        START - 60_000,
        START - 60_000
    );
    store.set("guestbookRateLimit", &legacy).unwrap();

    let status = limiter.check_limit(Channel::Guestbook);
    assert_eq!(status.wait_time_secs(), 240);

    limiter.record_submission(Channel::Guestbook);
    let record = limiter.record(Channel::Guestbook);
    assert_eq!(record.submission_count, 5);
    assert_eq!(record.recent_timestamps, vec![START - 60_000, START]);
}

#[test]
fn test_write_failure_is_swallowed() {
    let store = Arc::new(MemoryStore::with_quota(8));
    let clock = Arc::new(ManualClock::new(START));
    let limiter = RateLimiter::with_clock(LimiterConfig::default(), store.clone(), clock);

    limiter.record_submission(Channel::Guestbook);

    assert_eq!(store.get("guestbookRateLimit").unwrap(), None);
    assert!(limiter.check_limit(Channel::Guestbook).is_allowed());
}

#[test]
fn test_limiters_sharing_a_store_see_each_other() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(START));
    let tab_a = RateLimiter::with_clock(LimiterConfig::default(), store.clone(), clock.clone());
    let tab_b = RateLimiter::with_clock(LimiterConfig::default(), store.clone(), clock.clone());

    // Both pass before either records; the limiter does not prevent this
    assert!(tab_a.check_limit(Channel::Guestbook).is_allowed());
    assert!(tab_b.check_limit(Channel::Guestbook).is_allowed());
    tab_a.record_submission(Channel::Guestbook);
    tab_b.record_submission(Channel::Guestbook);

    assert_eq!(tab_a.record(Channel::Guestbook).submission_count, 2);
    assert!(!tab_b.check_limit(Channel::Guestbook).is_allowed());
}
