//! Version text for `oidc-session --version`.

/// Commit the binary was built from, or `unknown` outside a git checkout.
pub const GIT_HASH: &str = env!("OIDC_SESSION_GIT_HASH");

/// Build time in unix seconds.
pub const BUILT_AT: &str = env!("OIDC_SESSION_BUILT_AT");

/// Shown by `--version`; `-V` keeps the bare package version.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("OIDC_SESSION_GIT_HASH"),
    ", built at unix ",
    env!("OIDC_SESSION_BUILT_AT"),
    ")"
);
