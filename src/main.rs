// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Submission Rate Limiter inspection tool
//!
//! Runs the limiter against a file-backed store, which is handy for checking
//! thresholds and for exercising the persisted record format by hand.
//!
//! ## Usage
//!
//! ```text
//! submission-rate-limiter [--store <PATH>] check  <guestbook|blogComment>
//! submission-rate-limiter [--store <PATH>] record <guestbook|blogComment>
//! submission-rate-limiter [--store <PATH>] show   <guestbook|blogComment>
//! ```
//!
//! ## Configuration
//!
//! - `RATE_LIMIT_STORE`: Path of the JSON store file (default: rate-limits.json)
//! - `RUST_LOG`: Log filter (default: info)

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use submission_rate_limiter::{config::Config, Channel, FileStore, RateLimiter};

#[derive(Parser)]
#[command(
    name = "submission-rate-limiter",
    about = "Inspect and exercise local submission rate limits"
)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path of the JSON store file
    #[arg(long, env = "RATE_LIMIT_STORE", default_value = "rate-limits.json")]
    store: PathBuf,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Report whether the channel would accept a submission now
    Check { channel: Channel },
    /// Record an accepted submission and print the updated record
    Record { channel: Channel },
    /// Print the channel's stored record
    Show { channel: Channel },
}

impl Command {
    fn channel(&self) -> Channel {
        match self {
            Self::Check { channel } | Self::Record { channel } | Self::Show { channel } => {
                *channel
            }
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args);
    let channel = args.command.channel();
    info!(
        store = %config.storage.path.display(),
        %channel,
        command = ?args.command,
        "Starting submission rate limiter"
    );

    let store = FileStore::new(config.storage.path.clone());
    let limiter = RateLimiter::new(config.rate_limit.clone(), store);

    let output = match args.command {
        Command::Check { channel } => serde_json::to_string_pretty(&limiter.check_limit(channel))?,
        Command::Record { channel } => {
            limiter.record_submission(channel);
            serde_json::to_string_pretty(&limiter.record(channel))?
        }
        Command::Show { channel } => serde_json::to_string_pretty(&limiter.record(channel))?,
    };

    println!("{}", output);
    Ok(())
}

/// Build configuration from the command line and environment.
fn load_config(args: &Args) -> Config {
    let mut config = Config::default();
    config.storage.path = args.store.clone();
    config
}
