//! CLI argument parsing via clap.

use clap::{Parser, Subcommand};
use oidc_session::build_info::LONG_VERSION;

/// Inspect OIDC session settings and renewal timing.
#[derive(Debug, Parser)]
#[command(name = "oidc-session", version, long_version = LONG_VERSION)]
pub struct Args {
    /// Path to config file (default: ./oidc-session.toml or
    /// ~/.config/oidc-session/oidc-session.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate settings, then print a summary.
    Check,
    /// Show renewal timing for a session expiring at `--exp`.
    Schedule {
        /// Expiry of the hypothetical id token, in unix seconds.
        #[arg(long = "exp")]
        exp: i64,

        /// Evaluate at this unix time instead of now.
        #[arg(long = "now")]
        now: Option<i64>,

        /// Slip tolerance for the token decision (default: from config).
        #[arg(long = "slip")]
        slip: Option<u64>,
    },
}
