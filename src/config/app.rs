//! Main application configuration
//!
//! This module defines the configuration structures for the party-lobby
//! service, including TOML file loading, environment variable loading and
//! validation.

use crate::session::LobbySettings;
use crate::types::BroadcastScope;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service: ServiceSettings,
    pub server: ServerSettings,
    pub lobby: LobbySettings,
}

/// Service-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    /// Service name for logging and metrics
    pub name: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Port for health check and metrics endpoints
    pub health_port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,
}

/// Client-facing WebSocket server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind the lobby server to
    pub host: String,
    /// Port for the banner and `/ws` endpoint
    pub port: u16,
    /// Seconds between keep-alive pings
    pub ping_interval_seconds: u64,
    /// Seconds without a pong before a connection is closed
    pub pong_timeout_seconds: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            name: "party-lobby".to_string(),
            log_level: "info".to_string(),
            health_port: 8080,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ping_interval_seconds: 20,
            pong_timeout_seconds: 60,
        }
    }
}

fn env_override<T: FromStr>(name: &str, target: &mut T) -> Result<()> {
    if let Ok(value) = env::var(name) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid {} value: {}", name, value))?;
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Service settings
        if let Ok(name) = env::var("SERVICE_NAME") {
            config.service.name = name;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.service.log_level = log_level;
        }
        env_override("HEALTH_PORT", &mut config.service.health_port)?;
        env_override(
            "SHUTDOWN_TIMEOUT_SECONDS",
            &mut config.service.shutdown_timeout_seconds,
        )?;

        // Server settings; PORT is honoured for hosting platforms
        if let Ok(host) = env::var("LOBBY_HOST") {
            config.server.host = host;
        }
        env_override("PORT", &mut config.server.port)?;
        env_override("LOBBY_PORT", &mut config.server.port)?;
        env_override(
            "PING_INTERVAL_SECONDS",
            &mut config.server.ping_interval_seconds,
        )?;
        env_override(
            "PONG_TIMEOUT_SECONDS",
            &mut config.server.pong_timeout_seconds,
        )?;

        // Lobby behaviour
        env_override::<BroadcastScope>("BROADCAST_SCOPE", &mut config.lobby.broadcast_scope)?;
        env_override("NOTIFY_OWNER_ON_JOIN", &mut config.lobby.notify_owner_on_join)?;
        env_override("MAX_CODE_ATTEMPTS", &mut config.lobby.max_code_attempts)?;

        validate_config(&config)?;
        Ok(config)
    }

    /// Load configuration from a TOML file; missing keys take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Invalid TOML configuration")?;
        validate_config(&config)?;
        Ok(config)
    }

    /// Get shutdown timeout as Duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.service.shutdown_timeout_seconds)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.server.ping_interval_seconds)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_secs(self.server.pong_timeout_seconds)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    // Validate log level
    match config.service.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.service.log_level)),
    }

    // Validate ports
    if config.service.health_port == 0 {
        return Err(anyhow!("Health port cannot be 0"));
    }
    if config.server.port == 0 {
        return Err(anyhow!("Lobby port cannot be 0"));
    }
    if config.server.port == config.service.health_port {
        return Err(anyhow!(
            "Lobby port and health port must differ (both {})",
            config.server.port
        ));
    }

    // Validate timeouts
    if config.service.shutdown_timeout_seconds == 0 {
        return Err(anyhow!("Shutdown timeout must be greater than 0"));
    }
    if config.server.ping_interval_seconds == 0 {
        return Err(anyhow!("Ping interval must be greater than 0"));
    }
    if config.server.pong_timeout_seconds <= config.server.ping_interval_seconds {
        return Err(anyhow!("Pong timeout must be longer than the ping interval"));
    }

    // Validate lobby settings
    if config.lobby.max_code_attempts == 0 {
        return Err(anyhow!("Max code attempts must be greater than 0"));
    }

    Ok(())
}
