use std::{fmt, str::FromStr, time::Duration};

use crate::{error::ConfigError, request::DEFAULT_ROUTE_PREFIX};

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_AVATAR_SIZE: u16 = 1024;
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the authenticated Discord session lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionLifecycle {
    /// Log in once per process and share the session across invocations.
    #[default]
    Persistent,
    /// Log in for every invocation and close the session before returning.
    PerInvocation,
}

impl FromStr for SessionLifecycle {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "persistent" => Ok(Self::Persistent),
            "per-invocation" | "per_invocation" => Ok(Self::PerInvocation),
            other => Err(ConfigError::UnknownLifecycle(other.to_string())),
        }
    }
}

/// Bot token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct BotToken(String);

impl BotToken {
    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        let well_formed = !raw.contains(char::is_whitespace)
            && raw.split('.').count() == 3
            && raw.split('.').all(|part| !part.is_empty());
        if !well_formed {
            return Err(ConfigError::MalformedToken);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BotToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BotToken(***)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: BotToken,
    pub lifecycle: SessionLifecycle,
    pub ready_timeout: Duration,
    pub avatar_size: u16,
    pub route_prefix: String,
    pub include_raw_profile: bool,
    pub api_base: String,
}

impl Config {
    pub fn new(bot_token: BotToken) -> Self {
        Self {
            bot_token,
            lifecycle: SessionLifecycle::default(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            avatar_size: DEFAULT_AVATAR_SIZE,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            include_raw_profile: false,
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }

    /// Reads the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_BOT_TOKEN").ok_or(ConfigError::MissingToken)?;
        let mut config = Self::new(BotToken::new(token)?);

        if let Some(raw) = lookup("AVATAR_SESSION_LIFECYCLE") {
            config.lifecycle = raw.parse()?;
        }

        if let Some(raw) = lookup("AVATAR_READY_TIMEOUT_MS") {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "AVATAR_READY_TIMEOUT_MS",
                    value: raw.clone(),
                    reason: "expected a positive number of milliseconds",
                })?;
            config.ready_timeout = Duration::from_millis(millis);
        }

        if let Some(raw) = lookup("AVATAR_SIZE") {
            config.avatar_size = raw
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|size| size.is_power_of_two() && (16..=4096).contains(size))
                .ok_or(ConfigError::InvalidValue {
                    name: "AVATAR_SIZE",
                    value: raw.clone(),
                    reason: "expected a power of two between 16 and 4096",
                })?;
        }

        if let Some(raw) = lookup("AVATAR_ROUTE_PREFIX") {
            if !raw.starts_with('/') || !raw.ends_with('/') {
                return Err(ConfigError::InvalidValue {
                    name: "AVATAR_ROUTE_PREFIX",
                    value: raw,
                    reason: "must start and end with `/`",
                });
            }
            config.route_prefix = raw;
        }

        if let Some(raw) = lookup("AVATAR_INCLUDE_RAW_PROFILE") {
            config.include_raw_profile = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "AVATAR_INCLUDE_RAW_PROFILE",
                        value: raw,
                        reason: "expected true or false",
                    })
                }
            };
        }

        if let Some(raw) = lookup("DISCORD_API_BASE") {
            if !raw.starts_with("http://") && !raw.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    name: "DISCORD_API_BASE",
                    value: raw,
                    reason: "expected an http(s) URL",
                });
            }
            config.api_base = raw.trim_end_matches('/').to_string();
        }

        Ok(config)
    }
}
