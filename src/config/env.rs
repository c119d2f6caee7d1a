//! Environment overrides.

use crate::error::ConfigError;

use super::{Config, ConfigDiagnostics};

pub(super) const ENV_AUTHORITY: &str = "OIDC_SESSION_AUTHORITY";
pub(super) const ENV_CLIENT_ID: &str = "OIDC_SESSION_CLIENT_ID";
pub(super) const ENV_TIMEOUT_EXPIRING: &str = "OIDC_SESSION_TIMEOUT_EXPIRING";
pub(super) const ENV_SLIP: &str = "OIDC_SESSION_SLIP";

pub(super) fn apply_runtime_env_overrides<FEnv>(
    config: &mut Config,
    env_lookup: &FEnv,
) -> Result<(), ConfigError>
where
    FEnv: Fn(&str) -> Option<String>,
{
    if let Some(authority) = non_empty(env_lookup(ENV_AUTHORITY)) {
        config.client.authority = authority;
    }
    if let Some(client_id) = non_empty(env_lookup(ENV_CLIENT_ID)) {
        config.client.client_id = client_id;
    }
    if let Some(raw) = env_lookup(ENV_TIMEOUT_EXPIRING) {
        config.renewal.timeout_expiring = parse_secs(ENV_TIMEOUT_EXPIRING, &raw)?;
    }
    if let Some(raw) = env_lookup(ENV_SLIP) {
        config.renewal.slip = parse_secs(ENV_SLIP, &raw)?;
    }
    Ok(())
}

/// Flag renewal timings that let `get_token` and the timer disagree.
pub(super) fn collect_renewal_warnings(config: &Config, diagnostics: &mut ConfigDiagnostics) {
    let renewal = config.renewal;
    if renewal.slip < renewal.timeout_expiring {
        diagnostics.warnings.push(format!(
            "renewal.slip ({}s) is below renewal.timeout_expiring ({}s); get_token may hand out a token the timer is about to renew",
            renewal.slip, renewal.timeout_expiring
        ));
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs(name: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| {
        ConfigError::Invalid(format!(
            "invalid {name} value `{raw}`: expected non-negative integer seconds"
        ))
    })
}
