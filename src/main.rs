//! CLI entry point for oidc-session.

mod cli;

use clap::Parser;
use oidc_session::clock::{unix_now_secs, ExpiryStatus};
use oidc_session::config::{load_config_with_diagnostics, Config, ConfigSource};
use oidc_session::session::{Claims, Session, EXPIRY_CLAIM};
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    let args = cli::Args::parse();

    let loaded = match load_config_with_diagnostics(args.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    };
    for warning in &loaded.diagnostics.warnings {
        eprintln!("warning: {warning}");
    }

    let result = match args.command {
        cli::Command::Check => run_check(&loaded.config, &loaded.source),
        cli::Command::Schedule { exp, now, slip } => {
            run_schedule(&loaded.config, exp, now.unwrap_or_else(unix_now_secs), slip)
        }
    };
    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_check(config: &Config, source: &ConfigSource) -> Result<(), String> {
    config.validate().map_err(|e| e.to_string())?;
    let client = &config.client;
    println!("source:            {}", describe_source(source));
    println!("authority:         {}", client.authority);
    println!("client_id:         {}", client.client_id);
    println!("redirect_uri:      {}", client.redirect_uri);
    println!("silent_redirect:   {}", client.effective_silent_redirect_uri());
    println!("response_type:     {}", client.response_type);
    println!("scope:             {}", client.scope);
    println!(
        "metadata:          {}",
        if client.metadata.is_empty() {
            "discovery"
        } else {
            "inline"
        }
    );
    println!("signing_keys:      {}", client.signing_keys.len());
    println!("timeout_expiring:  {}s", config.renewal.timeout_expiring);
    println!("slip:              {}s", config.renewal.slip);
    Ok(())
}

fn run_schedule(config: &Config, exp: i64, now: i64, slip: Option<u64>) -> Result<(), String> {
    let mut profile = Claims::new();
    profile.insert(EXPIRY_CLAIM.to_string(), json!(exp));
    let session = Session::new("hypothetical", profile).map_err(|e| e.to_string())?;

    let lead = i64::try_from(config.renewal.timeout_expiring).unwrap_or(i64::MAX);
    let slip = slip.unwrap_or(config.renewal.slip);
    let status = ExpiryStatus::of(&session, now, lead);

    println!("expires_in:        {}s", status.expires_in);
    println!("expiring_in:       {}s", status.expiring_in);
    println!("renewal_timer:     {}s", status.expiring_in.max(0));
    let decision = if status.within_slip(i64::try_from(slip).unwrap_or(i64::MAX)) {
        "renew before use"
    } else {
        "use current token"
    };
    println!("get_token({slip}s):  {decision}");
    if status.is_expired() {
        println!("note:              token already expired");
    }
    Ok(())
}

fn describe_source(source: &ConfigSource) -> String {
    match source {
        ConfigSource::Explicit(path) => format!("{} (--config)", path.display()),
        ConfigSource::Local => "./oidc-session.toml".to_string(),
        ConfigSource::Global(path) => path.display().to_string(),
        ConfigSource::BuiltInDefaults => "built-in defaults".to_string(),
    }
}
