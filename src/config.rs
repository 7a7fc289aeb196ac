//! Configuration resolution
//!
//! Two-tier resolution with ENV → TOML priority, compiled defaults last.
//! The TOML file lives at `<config dir>/golive/config.toml`. Mandatory
//! credentials missing from both tiers fail startup.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// Default reconciliation interval (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

/// Default status server port
pub const DEFAULT_STATUS_PORT: u16 = 5730;

/// Service configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub twitch_client_id: String,
    pub twitch_client_secret: String,
    /// Role granted while live; id or name, resolved per community at tick time
    pub live_role: Option<String>,
    /// Role pinged in announcement content
    pub mention_role_id: Option<String>,
    pub poll_interval_secs: u64,
    pub status_port: u16,
    pub database_path: PathBuf,
}

/// TOML-file configuration shape (all keys optional; ENV wins)
#[derive(Debug, Default, Deserialize)]
struct TomlConfig {
    discord_token: Option<String>,
    twitch_client_id: Option<String>,
    twitch_client_secret: Option<String>,
    live_role: Option<String>,
    mention_role_id: Option<String>,
    poll_interval_secs: Option<u64>,
    status_port: Option<u16>,
    database_path: Option<String>,
}

impl BotConfig {
    /// Resolve configuration from ENV, then the TOML file, then defaults.
    pub fn load() -> Result<Self> {
        let toml_config = load_toml_config();

        let discord_token = resolve_required("DISCORD_TOKEN", toml_config.discord_token)?;
        let twitch_client_id = resolve_required("TWITCH_CLIENT_ID", toml_config.twitch_client_id)?;
        let twitch_client_secret =
            resolve_required("TWITCH_CLIENT_SECRET", toml_config.twitch_client_secret)?;

        let live_role = resolve_optional("LIVE_ROLE_ID", toml_config.live_role);
        let mention_role_id = resolve_optional("MENTION_ROLE_ID", toml_config.mention_role_id);

        let poll_interval_secs = parse_env_number("GOLIVE_POLL_INTERVAL_SECS")
            .or(toml_config.poll_interval_secs)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        let poll_interval_secs = validate_poll_interval(poll_interval_secs)?;

        let status_port = parse_env_number("GOLIVE_STATUS_PORT")
            .or(toml_config.status_port)
            .unwrap_or(DEFAULT_STATUS_PORT);

        let database_path = resolve_optional("GOLIVE_DATABASE_PATH", toml_config.database_path)
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path);

        Ok(Self {
            discord_token,
            twitch_client_id,
            twitch_client_secret,
            live_role,
            mention_role_id,
            poll_interval_secs,
            status_port,
            database_path,
        })
    }
}

/// ENV first, then TOML; error if neither has a non-empty value
fn resolve_required(env_var: &str, toml_value: Option<String>) -> Result<String> {
    resolve_optional(env_var, toml_value)
        .ok_or_else(|| Error::Config(format!("missing required setting {}", env_var)))
}

/// Numeric ENV override; an unparsable value is reported and ignored
/// rather than silently falling through.
fn parse_env_number<T: std::str::FromStr>(env_var: &str) -> Option<T> {
    let raw = resolve_optional(env_var, None)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {} value '{}'", env_var, raw);
            None
        }
    }
}

/// A zero interval would panic the timer; reject it at load time.
fn validate_poll_interval(secs: u64) -> Result<u64> {
    if secs == 0 {
        return Err(Error::Config(
            "poll interval must be a positive number of seconds".to_string(),
        ));
    }
    Ok(secs)
}

/// ENV first, then TOML; empty strings count as unset
fn resolve_optional(env_var: &str, toml_value: Option<String>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            return Some(value);
        }
    }
    toml_value.filter(|v| !v.trim().is_empty())
}

/// Parse `<config dir>/golive/config.toml` if present; absence is normal
fn load_toml_config() -> TomlConfig {
    let Some(path) = config_file_path() else {
        return TomlConfig::default();
    };
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return TomlConfig::default();
    };
    match toml::from_str(&contents) {
        Ok(config) => {
            info!("Loaded configuration file: {}", path.display());
            config
        }
        Err(e) => {
            tracing::warn!("Ignoring malformed config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("golive").join("config.toml"))
}

/// OS-dependent default database location
fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("golive").join("golive.db"))
        .unwrap_or_else(|| PathBuf::from("./golive.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_value_wins_over_toml() {
        std::env::set_var("GOLIVE_TEST_RESOLVE", "from-env");
        let resolved = resolve_optional("GOLIVE_TEST_RESOLVE", Some("from-toml".to_string()));
        assert_eq!(resolved.as_deref(), Some("from-env"));
        std::env::remove_var("GOLIVE_TEST_RESOLVE");
    }

    #[test]
    fn empty_env_value_falls_through() {
        std::env::set_var("GOLIVE_TEST_EMPTY", "  ");
        let resolved = resolve_optional("GOLIVE_TEST_EMPTY", Some("from-toml".to_string()));
        assert_eq!(resolved.as_deref(), Some("from-toml"));
        std::env::remove_var("GOLIVE_TEST_EMPTY");
    }

    #[test]
    fn missing_required_is_config_error() {
        let result = resolve_required("GOLIVE_TEST_MISSING", None);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn unparsable_numeric_env_value_is_ignored() {
        std::env::set_var("GOLIVE_TEST_NUMBER", "two minutes");
        assert_eq!(parse_env_number::<u64>("GOLIVE_TEST_NUMBER"), None);

        std::env::set_var("GOLIVE_TEST_NUMBER", "120");
        assert_eq!(parse_env_number::<u64>("GOLIVE_TEST_NUMBER"), Some(120));
        std::env::remove_var("GOLIVE_TEST_NUMBER");
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        assert!(matches!(validate_poll_interval(0), Err(Error::Config(_))));
        assert_eq!(validate_poll_interval(120).unwrap(), 120);
    }
}
