// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the submission rate limiter.
//!
//! Channel thresholds are fixed in the defaults below. The guestbook is the
//! stricter channel; blog comments allow shorter gaps and a higher hourly cap.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// A named category of rate-limited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Guestbook entries
    Guestbook,
    /// Comments on blog posts
    BlogComment,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Guestbook, Channel::BlogComment];

    /// Channel name as used in storage keys.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Guestbook => "guestbook",
            Self::BlogComment => "blogComment",
        }
    }

    /// Storage key holding this channel's record, e.g. `guestbookRateLimit`.
    pub fn storage_key(&self) -> String {
        format!("{}RateLimit", self.name())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a channel name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guestbook" => Ok(Self::Guestbook),
            "blogComment" | "blog-comment" | "comments" => Ok(Self::BlogComment),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: LimiterConfig,

    /// Validation configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Thresholds for every channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    #[serde(default = "default_guestbook")]
    pub guestbook: ChannelConfig,

    #[serde(default = "default_blog_comment")]
    pub blog_comment: ChannelConfig,
}

/// Thresholds for a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Minimum seconds between consecutive accepted submissions
    pub min_interval_secs: u64,

    /// Maximum accepted submissions in any trailing hour
    pub max_per_hour: u32,

    /// Plural noun used in caller-facing messages ("comments")
    pub unit: String,
}

/// Validation limits for submitted text, counted in characters after trimming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Maximum display name length (default: 100)
    #[serde(default = "default_max_name_chars")]
    pub max_name_chars: usize,

    /// Maximum post identifier length (default: 100)
    #[serde(default = "default_max_post_id_chars")]
    pub max_post_id_chars: usize,

    /// Maximum message length (default: 10000)
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

/// Location of the file-backed store used by the command line tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_guestbook() -> ChannelConfig {
    ChannelConfig {
        min_interval_secs: 300,
        max_per_hour: 10,
        unit: "submissions".to_string(),
    }
}

fn default_blog_comment() -> ChannelConfig {
    ChannelConfig {
        min_interval_secs: 120,
        max_per_hour: 20,
        unit: "comments".to_string(),
    }
}

fn default_max_name_chars() -> usize {
    100
}

fn default_max_post_id_chars() -> usize {
    100
}

fn default_max_message_chars() -> usize {
    10_000
}

fn default_store_path() -> PathBuf {
    PathBuf::from("rate-limits.json")
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            guestbook: default_guestbook(),
            blog_comment: default_blog_comment(),
        }
    }
}

impl LimiterConfig {
    /// Thresholds for the given channel.
    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        match channel {
            Channel::Guestbook => &self.guestbook,
            Channel::BlogComment => &self.blog_comment,
        }
    }
}

impl ChannelConfig {
    /// Minimum gap between submissions
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub(crate) fn min_interval_ms(&self) -> i64 {
        i64::try_from(self.min_interval_secs.saturating_mul(1000)).unwrap_or(i64::MAX)
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_name_chars: default_max_name_chars(),
            max_post_id_chars: default_max_post_id_chars(),
            max_message_chars: default_max_message_chars(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}
