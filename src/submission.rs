// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Guestbook and blog comment submission flow.
//!
//! Each submission is validated, gated by the rate limiter, written to the
//! remote store, and only then recorded against the channel's limit. A
//! rejected or failed write leaves the limiter untouched.

use crate::clock::Clock;
use crate::config::{Channel, ValidationConfig};
use crate::limiter::{LimitReason, LimitStatus, RateLimiter};
use crate::storage::KeyValueStore;
use crate::validator::{SubmissionValidator, ValidationError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A guestbook entry ready for the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestbookEntry {
    pub display_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A blog comment ready for the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogComment {
    pub post_id: String,
    pub name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A validated submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Submission {
    Guestbook(GuestbookEntry),
    BlogComment(BlogComment),
}

impl Submission {
    /// The rate limit channel this submission counts against.
    pub fn channel(&self) -> Channel {
        match self {
            Self::Guestbook(_) => Channel::Guestbook,
            Self::BlogComment(_) => Channel::BlogComment,
        }
    }
}

/// Raw form input for a submission.
#[derive(Debug, Clone)]
pub enum SubmissionRequest {
    Guestbook {
        display_name: String,
        message: String,
    },
    BlogComment {
        post_id: String,
        name: String,
        message: String,
    },
}

impl SubmissionRequest {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Guestbook { .. } => Channel::Guestbook,
            Self::BlogComment { .. } => Channel::BlogComment,
        }
    }
}

/// Error reported by the remote store.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct RemoteError(pub String);

/// The remote store holding guestbook entries and comments.
pub trait RemoteStore: Send + Sync {
    /// Persist a submission. Success means the entry was accepted.
    fn insert(
        &self,
        submission: &Submission,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Why a submission did not go through.
#[derive(Debug, Clone, Error)]
pub enum SubmitError {
    #[error("Invalid submission: {}", join(.0))]
    Invalid(Vec<ValidationError>),

    #[error("{reason}")]
    RateLimited {
        reason: LimitReason,
        wait_time_secs: u64,
    },

    #[error("Failed to submit entry: {0}")]
    Remote(#[from] RemoteError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SubmitError {
    /// Seconds the user should wait before retrying, if rate limited.
    pub fn wait_time_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { wait_time_secs, .. } => Some(*wait_time_secs),
            _ => None,
        }
    }
}

/// Runs submissions through validation, rate limiting and the remote store.
pub struct SubmissionService<S, C, R> {
    limiter: RateLimiter<S, C>,
    validator: SubmissionValidator,
    remote: R,
}

impl<S, C, R> SubmissionService<S, C, R>
where
    S: KeyValueStore,
    C: Clock,
    R: RemoteStore,
{
    pub fn new(limiter: RateLimiter<S, C>, validation: ValidationConfig, remote: R) -> Self {
        Self {
            limiter,
            validator: SubmissionValidator::new(validation),
            remote,
        }
    }

    pub fn limiter(&self) -> &RateLimiter<S, C> {
        &self.limiter
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Validate the request and build the entry, stamped with the current time.
    pub fn prepare(&self, request: &SubmissionRequest) -> Result<Submission, SubmitError> {
        let created_at = self.limiter.clock().now();
        match request {
            SubmissionRequest::Guestbook {
                display_name,
                message,
            } => {
                let input = self
                    .validator
                    .validate_guestbook(display_name, message)
                    .into_result()
                    .map_err(SubmitError::Invalid)?;
                Ok(Submission::Guestbook(GuestbookEntry {
                    display_name: input.display_name,
                    message: input.message,
                    created_at,
                }))
            }
            SubmissionRequest::BlogComment {
                post_id,
                name,
                message,
            } => {
                let input = self
                    .validator
                    .validate_comment(post_id, name, message)
                    .into_result()
                    .map_err(SubmitError::Invalid)?;
                Ok(Submission::BlogComment(BlogComment {
                    post_id: input.post_id,
                    name: input.name,
                    message: input.message,
                    created_at,
                }))
            }
        }
    }

    /// Submit a guestbook entry or comment.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<Submission, SubmitError> {
        let channel = request.channel();

        let submission = match self.prepare(&request) {
            Ok(submission) => submission,
            Err(e) => {
                debug!(%channel, error = %e, "Submission failed validation");
                return Err(e);
            }
        };

        if let LimitStatus::Limited {
            reason,
            wait_time_secs,
        } = self.limiter.check_limit(channel)
        {
            info!(%channel, %reason, wait_time_secs, "Submission rate limited");
            return Err(SubmitError::RateLimited {
                reason,
                wait_time_secs,
            });
        }

        if let Err(e) = self.remote.insert(&submission).await {
            warn!(%channel, error = %e, "Remote store rejected submission");
            return Err(e.into());
        }

        self.limiter.record_submission(channel);
        info!(%channel, "Submission accepted");
        Ok(submission)
    }
}
