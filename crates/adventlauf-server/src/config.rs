use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

/// Placeholder secrets that must not survive into a real deployment.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

const DEFAULT_SESSION_DAYS: i64 = 30;
const SESSION_DAYS: std::ops::RangeInclusive<i64> = 1..=3650;

pub struct Config {
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub session_secret: String,
    pub session_ttl_days: i64,
}

impl Config {
    /// Read configuration from `ADVENTLAUF_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let session_secret = std::env::var("ADVENTLAUF_SESSION_SECRET")
            .unwrap_or_else(|_| "dev-secret-change-me".into());
        if PLACEHOLDER_SECRETS.contains(&session_secret.as_str()) {
            warn!("ADVENTLAUF_SESSION_SECRET is unset or a placeholder; sessions can be forged");
        }

        let db_path = std::env::var("ADVENTLAUF_DB_PATH")
            .unwrap_or_else(|_| "team_challenge.db".into())
            .into();
        let host = std::env::var("ADVENTLAUF_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("ADVENTLAUF_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("ADVENTLAUF_PORT must be a port number")?;
        let session_ttl_days = match std::env::var("ADVENTLAUF_SESSION_DAYS") {
            Ok(raw) => parse_session_days(&raw)?,
            Err(_) => DEFAULT_SESSION_DAYS,
        };

        let addr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            db_path,
            addr,
            session_secret,
            session_ttl_days,
        })
    }
}

fn parse_session_days(raw: &str) -> anyhow::Result<i64> {
    let days: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("ADVENTLAUF_SESSION_DAYS must be a number, got '{}'", raw))?;
    if !SESSION_DAYS.contains(&days) {
        anyhow::bail!(
            "ADVENTLAUF_SESSION_DAYS must be between {} and {}, got {}",
            SESSION_DAYS.start(),
            SESSION_DAYS.end(),
            days
        );
    }
    Ok(days)
}
