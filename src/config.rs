use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
    pub session: SessionConfig,
    pub realtime: RealtimeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://chatterbox.db?mode=rwc".to_string(),
            max_connections: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    pub ttl_minutes: i64,
    /// Zero disables the purge task.
    pub purge_interval_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: 20,
            purge_interval_secs: 300,
        }
    }
}

impl TokenConfig {
    pub fn ttl(&self) -> time::Duration {
        time::Duration::minutes(self.ttl_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub inactivity_minutes: i64,
    pub secure: bool,
    /// At least 64 bytes. Generated per process when absent.
    pub secret: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_minutes: 60,
            secure: false,
            secret: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyMode {
    #[default]
    Silent,
    CloseFrame,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub deny_mode: DenyMode,
    /// Frames buffered per connection before the hub evicts it as too slow.
    pub outbox_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            deny_mode: DenyMode::Silent,
            outbox_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::parse(&std::fs::read_to_string(path)?)?
        } else {
            Self::default()
        };

        dotenv::dotenv().ok();
        config.apply_overrides(|key| dotenv::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    fn apply_overrides(
        &mut self,
        var: impl Fn(&'static str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = var("DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(port) = var("APP_PORT") {
            self.server.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "APP_PORT",
                reason: format!("{port:?} is not a port number"),
            })?;
        }

        if let Some(secret) = var("SESSION_SECRET") {
            self.session.secret = Some(secret);
        }

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                key: "tokens.ttl_minutes",
                reason: "must be positive".to_string(),
            });
        }

        if self.realtime.outbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "realtime.outbox_capacity",
                reason: "must be positive".to_string(),
            });
        }

        if let Some(secret) = &self.session.secret {
            if secret.len() < 64 {
                return Err(ConfigError::Invalid {
                    key: "session.secret",
                    reason: "must be at least 64 bytes".to_string(),
                });
            }
        }

        Ok(())
    }
}
