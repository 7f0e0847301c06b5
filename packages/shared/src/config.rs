use crate::models::game::{GameSettings, DEFAULT_BOMB_TIME_SECONDS, DEFAULT_ROUND_TIME_MINUTES};

pub const DEFAULT_ROOM_ID: &str = "default";
pub const DEFAULT_MAX_COMMIT_ATTEMPTS: usize = 5;

#[derive(Debug)]
pub enum ConfigError {
    Missing(String),
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} environment variable must be set", key),
            ConfigError::Invalid { key, message } => {
                write!(f, "Invalid value for {}: {}", key, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Behavior knobs for the game service.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    /// Room every join is routed to.
    pub room_id: String,
    /// Display name that takes host on join and is preferred on host
    /// migration. `None` disables the override.
    pub reserved_host_name: Option<String>,
    /// Times a conflicting commit is re-run before giving up.
    pub max_commit_attempts: usize,
    /// Settings a freshly created lobby starts with.
    pub default_settings: GameSettings,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            room_id: DEFAULT_ROOM_ID.to_string(),
            reserved_host_name: None,
            max_commit_attempts: DEFAULT_MAX_COMMIT_ATTEMPTS,
            default_settings: GameSettings::default(),
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, falling back to defaults for
    /// anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let room_id = lookup("ROOM_ID")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ROOM_ID.to_string());

        let reserved_host_name = lookup("RESERVED_HOST_NAME").filter(|v| !v.trim().is_empty());

        let max_commit_attempts =
            parse_or("MAX_COMMIT_ATTEMPTS", &lookup, DEFAULT_MAX_COMMIT_ATTEMPTS)?;
        if max_commit_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "MAX_COMMIT_ATTEMPTS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let default_settings = GameSettings {
            round_time_minutes: parse_or(
                "DEFAULT_ROUND_TIME_MINUTES",
                &lookup,
                DEFAULT_ROUND_TIME_MINUTES,
            )?,
            bomb_time_seconds: parse_or(
                "DEFAULT_BOMB_TIME_SECONDS",
                &lookup,
                DEFAULT_BOMB_TIME_SECONDS,
            )?,
        };
        default_settings
            .validate()
            .map_err(|message| ConfigError::Invalid {
                key: "DEFAULT_SETTINGS".to_string(),
                message,
            })?;

        Ok(GameConfig {
            room_id,
            reserved_host_name,
            max_commit_attempts,
            default_settings,
        })
    }

    pub fn is_reserved_host_name(&self, name: &str) -> bool {
        self.reserved_host_name.as_deref() == Some(name)
    }
}

/// Reads a required variable, as table names are.
pub fn required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
