// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission Rate Limiter
//!
//! This crate gates guestbook entries and blog comments before they are
//! written to the site's remote store:
//!
//! - Minimum interval between accepted submissions, per channel
//! - Maximum accepted submissions per trailing hour, per channel
//! - State kept in local key-value storage, one JSON record per channel
//! - Fail-open on unreadable or unwritable storage
//! - Input validation for names, messages and post identifiers

pub mod clock;
pub mod config;
pub mod error;
pub mod limiter;
pub mod record;
pub mod storage;
pub mod submission;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Channel, Config};
pub use limiter::{LimitReason, LimitStatus, RateLimiter};
pub use record::{RateLimitRecord, StoredRecord};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use submission::{RemoteStore, SubmissionRequest, SubmissionService, SubmitError};
pub use validator::{SubmissionValidator, ValidationError, ValidationResult};
