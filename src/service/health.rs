//! Health check endpoints and monitoring
//!
//! This module provides health check functionality for the party-lobby
//! service, including readiness and liveness probes.

use crate::service::app::AppState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Health check status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "✅ healthy"),
            HealthStatus::Degraded => write!(f, "⚠️  degraded"),
            HealthStatus::Unhealthy => write!(f, "❌ unhealthy"),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Overall service status
    pub status: HealthStatus,
    /// Service name
    pub service: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Detailed component checks
    pub checks: Vec<ComponentCheck>,
    /// Service statistics
    pub stats: ServiceStats,
}

/// Individual component health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentCheck {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional error message if unhealthy
    pub message: Option<String>,
    /// Check duration in milliseconds
    pub duration_ms: u64,
}

/// Service statistics for health reporting
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceStats {
    /// Number of live sessions
    pub active_sessions: usize,
    /// Players seated across all sessions
    pub active_players: usize,
    /// Open client connections
    pub active_connections: usize,
    /// Total sessions created since service start
    pub sessions_created: u64,
    /// Total games started since service start
    pub games_started: u64,
    /// Service uptime information
    pub uptime_info: String,
}

impl HealthStatus {
    /// The more severe of two statuses
    pub fn worst(self, other: HealthStatus) -> HealthStatus {
        match (self, other) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

impl HealthCheck {
    /// Run every component check and fold them into one status
    pub async fn check(app_state: Arc<AppState>) -> Result<Self> {
        let checks = vec![
            Self::check_service_running(&app_state).await,
            Self::check_dispatcher(&app_state),
        ];
        let status = checks
            .iter()
            .fold(HealthStatus::Healthy, |acc, check| acc.worst(check.status.clone()));

        Ok(HealthCheck {
            status,
            service: app_state.config().service.name.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now(),
            checks,
            stats: Self::gather_service_stats(&app_state),
        })
    }

    /// Simple liveness check - just verify service is running
    pub async fn liveness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        if app_state.is_running().await {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Unhealthy)
        }
    }

    /// Readiness check - verify service can handle requests
    pub async fn readiness_check(app_state: Arc<AppState>) -> Result<HealthStatus> {
        // Service must be running
        if !app_state.is_running().await {
            return Ok(HealthStatus::Unhealthy);
        }

        Ok(Self::check_dispatcher(&app_state).status)
    }

    /// Check if service is running
    async fn check_service_running(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let (status, message) = if app_state.is_running().await {
            (HealthStatus::Healthy, None)
        } else {
            (
                HealthStatus::Unhealthy,
                Some("Service is not running".to_string()),
            )
        };

        ComponentCheck {
            name: "service_running".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// A held lock only means a message is being processed right now
    fn check_dispatcher(app_state: &AppState) -> ComponentCheck {
        let start = std::time::Instant::now();

        let dispatcher = app_state.dispatcher();
        let (status, message) = match dispatcher.try_lock() {
            Ok(_) => (HealthStatus::Healthy, None),
            Err(_) => (
                HealthStatus::Degraded,
                Some("Dispatcher busy".to_string()),
            ),
        };

        ComponentCheck {
            name: "dispatcher".to_string(),
            status,
            message,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Gather current service statistics without waiting on the dispatcher
    fn gather_service_stats(app_state: &AppState) -> ServiceStats {
        let uptime_info = format!("Up {}s", app_state.uptime().as_secs());

        let dispatcher = app_state.dispatcher();
        let stats = match dispatcher.try_lock() {
            Ok(guard) => guard.membership().stats(),
            Err(_) => {
                return ServiceStats {
                    uptime_info,
                    ..ServiceStats::default()
                }
            }
        };

        ServiceStats {
            active_sessions: stats.active_sessions,
            active_players: stats.active_players,
            active_connections: stats.active_connections,
            sessions_created: stats.sessions_created,
            games_started: stats.games_started,
            uptime_info,
        }
    }
}

/// Convert health check to JSON string
impl HealthCheck {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("Failed to serialize health check: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[tokio::test]
    async fn test_stopped_service_is_unhealthy() {
        let app_state = Arc::new(AppState::new(AppConfig::default()).await.unwrap());

        let health = HealthCheck::check(app_state.clone()).await.unwrap();
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.service, "party-lobby");
        assert_eq!(health.stats.active_sessions, 0);

        assert_eq!(
            HealthCheck::liveness_check(app_state.clone()).await.unwrap(),
            HealthStatus::Unhealthy
        );
        assert_eq!(
            HealthCheck::readiness_check(app_state).await.unwrap(),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn test_worst_status() {
        use HealthStatus::*;
        assert_eq!(Healthy.worst(Healthy), Healthy);
        assert_eq!(Healthy.worst(Degraded), Degraded);
        assert_eq!(Degraded.worst(Unhealthy), Unhealthy);
        assert_eq!(Unhealthy.worst(Healthy), Unhealthy);
    }

    #[tokio::test]
    async fn test_busy_dispatcher_degrades_readiness() {
        let app_state = Arc::new(AppState::new(AppConfig::default()).await.unwrap());
        let dispatcher = app_state.dispatcher();
        let _guard = dispatcher.lock().await;

        let check = HealthCheck::check_dispatcher(&app_state);
        assert_eq!(check.status, HealthStatus::Degraded);
        assert_eq!(check.message.as_deref(), Some("Dispatcher busy"));

        // stats fall back to zeros instead of waiting
        let stats = HealthCheck::gather_service_stats(&app_state);
        assert_eq!(stats.active_sessions, 0);
        assert!(stats.uptime_info.starts_with("Up "));
    }

    #[tokio::test]
    async fn test_health_check_serializes() {
        let app_state = Arc::new(AppState::new(AppConfig::default()).await.unwrap());
        let health = HealthCheck::check(app_state).await.unwrap();

        let json = health.to_json().unwrap();
        assert!(json.contains("\"dispatcher\""));
        assert!(json.contains("\"unhealthy\""));
    }
}
