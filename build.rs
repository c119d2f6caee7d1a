//! Stamps `oidc-session --version` with the commit and build time.
//!
//! Either value can be pinned from the environment for reproducible builds.

use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const GIT_HASH_ENV: &str = "OIDC_SESSION_GIT_HASH";
const BUILT_AT_ENV: &str = "OIDC_SESSION_BUILT_AT";

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-env-changed={GIT_HASH_ENV}");
    println!("cargo:rerun-if-env-changed={BUILT_AT_ENV}");

    let git_hash = std::env::var(GIT_HASH_ENV)
        .ok()
        .or_else(head_commit)
        .unwrap_or_else(|| "unknown".to_string());
    let built_at = std::env::var(BUILT_AT_ENV).unwrap_or_else(|_| unix_seconds().to_string());

    println!("cargo:rustc-env={GIT_HASH_ENV}={git_hash}");
    println!("cargo:rustc-env={BUILT_AT_ENV}={built_at}");
}

fn head_commit() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=12", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

fn unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}
