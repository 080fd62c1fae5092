// src/config.rs
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::llm_client::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::services::usage::UsageLimits;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SESSION_TTL_SECS: u64 = 1800;
pub const DEFAULT_MAX_CALLS_PER_SESSION: u32 = 50;
pub const DEFAULT_RATE_LIMIT_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_REPORT_DIR: &str = "public/reports";

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub session_ttl: Duration,
    pub ai_enabled: bool,
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub model: String,
    pub usage_limits: UsageLimits,
    pub template_dir: Option<PathBuf>,
    pub admin_key: Option<String>,
    pub report_dir: PathBuf,
}

// Keeps secrets out of logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("session_ttl", &self.session_ttl)
            .field("ai_enabled", &self.ai_enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "<set>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("usage_limits", &self.usage_limits)
            .field("template_dir", &self.template_dir)
            .field("admin_key", &self.admin_key.as_ref().map(|_| "<set>"))
            .field("report_dir", &self.report_dir)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
            ai_enabled: false,
            api_key: None,
            api_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            usage_limits: UsageLimits {
                max_calls_per_session: DEFAULT_MAX_CALLS_PER_SESSION,
                cooldown: Duration::from_secs(DEFAULT_RATE_LIMIT_COOLDOWN_SECS),
            },
            template_dir: None,
            admin_key: None,
            report_dir: PathBuf::from(DEFAULT_REPORT_DIR),
        }
    }
}

impl Config {
    /// Read from the process environment (after `dotenvy` has loaded `.env`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        Ok(Self {
            bind_addr: text("COACH_BIND_ADDR").unwrap_or(defaults.bind_addr),
            session_ttl: Duration::from_secs(
                parse(&text, "COACH_SESSION_TTL_SECS")?.unwrap_or(DEFAULT_SESSION_TTL_SECS),
            ),
            ai_enabled: parse_bool(&text, "COACH_AI_ENABLED")?.unwrap_or(false),
            api_key: text("DEEPSEEK_API_KEY"),
            api_base_url: text("DEEPSEEK_BASE_URL").unwrap_or(defaults.api_base_url),
            model: text("DEEPSEEK_MODEL").unwrap_or(defaults.model),
            usage_limits: UsageLimits {
                max_calls_per_session: parse(&text, "COACH_MAX_CALLS_PER_SESSION")?
                    .unwrap_or(DEFAULT_MAX_CALLS_PER_SESSION),
                cooldown: Duration::from_secs(
                    parse(&text, "COACH_RATE_LIMIT_COOLDOWN_SECS")?
                        .unwrap_or(DEFAULT_RATE_LIMIT_COOLDOWN_SECS),
                ),
            },
            template_dir: text("COACH_TEMPLATE_DIR").map(PathBuf::from),
            admin_key: text("COACH_ADMIN_KEY"),
            report_dir: text("COACH_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
        })
    }

    /// The remote path needs both the switch and a key.
    pub fn remote_enabled(&self) -> bool {
        self.ai_enabled && self.api_key.is_some()
    }
}

fn parse<T: FromStr>(
    text: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match text(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

fn parse_bool(
    text: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<bool>, ConfigError> {
    match text(key) {
        None => Ok(None),
        Some(value) => match value.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue { key, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_offline() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert!(!config.remote_enabled());
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(config.usage_limits.max_calls_per_session, DEFAULT_MAX_CALLS_PER_SESSION);
    }

    #[test]
    fn blank_key_counts_as_absent() {
        let config = Config::from_lookup(lookup(&[
            ("COACH_AI_ENABLED", "true"),
            ("DEEPSEEK_API_KEY", "  "),
        ]))
        .unwrap();
        assert!(config.ai_enabled);
        assert!(!config.remote_enabled());
    }

    #[test]
    fn remote_needs_switch_and_key() {
        let config = Config::from_lookup(lookup(&[
            ("COACH_AI_ENABLED", "yes"),
            ("DEEPSEEK_API_KEY", "sk-test"),
            ("COACH_MAX_CALLS_PER_SESSION", "5"),
        ]))
        .unwrap();
        assert!(config.remote_enabled());
        assert_eq!(config.usage_limits.max_calls_per_session, 5);
        assert!(!format!("{config:?}").contains("sk-test"));
    }

    #[test]
    fn bad_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("COACH_SESSION_TTL_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("COACH_SESSION_TTL_SECS"));
        assert!(Config::from_lookup(lookup(&[("COACH_AI_ENABLED", "maybe")])).is_err());
    }
}
