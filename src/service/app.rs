//! Main application state and service coordination
//!
//! This module contains the production AppState that wires the dispatcher,
//! the WebSocket server, the metrics/health server and background tasks.

use crate::config::{validate_config, AppConfig};
use crate::connection::registry::OutboundSender;
use crate::dispatch::{MessageDispatcher, MessageHandler};
use crate::metrics::health::HealthServerConfig;
use crate::metrics::{HealthServer, MetricsCollector, MetricsService};
use crate::session::MembershipStats;
use crate::transport::{WsServer, WsServerConfig};
use crate::types::ConnectionId;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, error, info, warn};

/// Interval of the gauge refresh task
const METRICS_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

/// Service-level errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Service initialization error: {message}")]
    Initialization { message: String },
}

/// Production message handler that serializes all lobby work
///
/// Every callback takes the dispatcher lock for its whole duration, so each
/// inbound message and its broadcasts complete before the next one starts.
pub struct LobbyMessageHandler {
    dispatcher: Arc<Mutex<MessageDispatcher>>,
}

impl LobbyMessageHandler {
    pub fn new(dispatcher: Arc<Mutex<MessageDispatcher>>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl MessageHandler for LobbyMessageHandler {
    async fn on_connect(
        &self,
        sender: OutboundSender,
        remote_addr: Option<SocketAddr>,
    ) -> ConnectionId {
        self.dispatcher.lock().await.on_connect(sender, remote_addr)
    }

    async fn on_text(&self, connection: ConnectionId, text: String) {
        let outcome = self.dispatcher.lock().await.on_text(connection, &text);
        debug!(connection_id = %connection, ?outcome, "Message processed");
    }

    async fn on_disconnect(&self, connection: ConnectionId) {
        self.dispatcher.lock().await.on_disconnect(connection);
    }
}

/// Main application state containing all service components
pub struct AppState {
    /// Application configuration
    config: AppConfig,

    /// Lobby core behind the run-to-completion lock
    dispatcher: Arc<Mutex<MessageDispatcher>>,

    /// Shared Prometheus collector
    metrics: Arc<MetricsCollector>,

    /// Client-facing WebSocket server
    ws_server: Arc<WsServer>,

    /// Health and metrics endpoints, present while running
    metrics_service: RwLock<Option<Arc<MetricsService>>>,

    /// Background task handles
    background_tasks: Mutex<Vec<JoinHandle<()>>>,

    /// Service status
    is_running: Arc<RwLock<bool>>,

    started_at: Instant,
}

impl AppState {
    /// Initialize the application with all dependencies
    pub async fn new(config: AppConfig) -> Result<Self, ServiceError> {
        info!("Initializing party-lobby service");
        info!(
            "Configuration: service={}, lobby={}:{}, broadcast_scope={}",
            config.service.name,
            config.server.host,
            config.server.port,
            config.lobby.broadcast_scope
        );

        validate_config(&config).map_err(|e| ServiceError::Configuration {
            message: format!("{:#}", e),
        })?;

        let metrics = Arc::new(MetricsCollector::new().map_err(|e| {
            ServiceError::Initialization {
                message: format!("Failed to create metrics collector: {}", e),
            }
        })?);

        let dispatcher = Arc::new(Mutex::new(MessageDispatcher::new(
            config.lobby.clone(),
            metrics.clone(),
        )));

        let ws_config = WsServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
            ping_interval: config.ping_interval(),
            pong_timeout: config.pong_timeout(),
        };
        let handler = Arc::new(LobbyMessageHandler::new(dispatcher.clone()));
        let ws_server = Arc::new(WsServer::new(ws_config, handler));

        Ok(Self {
            config,
            dispatcher,
            metrics,
            ws_server,
            metrics_service: RwLock::new(None),
            background_tasks: Mutex::new(Vec::new()),
            is_running: Arc::new(RwLock::new(false)),
            started_at: Instant::now(),
        })
    }

    /// Start the servers and background tasks
    pub async fn start(self: &Arc<Self>) -> Result<(), ServiceError> {
        info!("Starting party-lobby service");

        // Bind first so a taken port fails startup instead of a background task
        let lobby_addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener =
            TcpListener::bind(&lobby_addr)
                .await
                .map_err(|e| ServiceError::Transport {
                    message: format!("Failed to bind lobby server to {}: {}", lobby_addr, e),
                })?;

        // Mark as running
        *self.is_running.write().await = true;

        self.start_metrics_service().await?;
        self.start_lobby_server(listener).await;
        self.start_background_tasks().await;

        info!("✅ Party-lobby service started successfully");
        Ok(())
    }

    /// Perform graceful shutdown
    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        info!("Starting graceful shutdown of party-lobby service");

        // Mark as not running
        *self.is_running.write().await = false;

        if let Err(e) = self.ws_server.stop().await {
            warn!("Failed to stop lobby server: {}", e);
        } else {
            info!("✅ Lobby server stopped");
        }

        // Dropping the service here also releases its reference to this state
        if let Some(metrics_service) = self.metrics_service.write().await.take() {
            info!("Stopping metrics service...");
            if let Err(e) = metrics_service.stop().await {
                warn!("Failed to stop metrics service: {}", e);
            } else {
                info!("✅ Metrics service stopped");
            }
        }

        self.stop_background_tasks().await;

        let final_stats = self.stats().await;
        info!("Final service statistics: {:?}", final_stats);
        info!("✅ Party-lobby service shutdown completed");

        Ok(())
    }

    /// Get service configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Check if service is running
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Get the dispatcher for direct operations
    pub fn dispatcher(&self) -> Arc<Mutex<MessageDispatcher>> {
        self.dispatcher.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    pub fn ws_server(&self) -> Arc<WsServer> {
        self.ws_server.clone()
    }

    pub fn uptime(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Current membership statistics
    pub async fn stats(&self) -> MembershipStats {
        self.dispatcher.lock().await.membership().stats()
    }

    /// Start the health and metrics endpoints
    async fn start_metrics_service(self: &Arc<Self>) -> Result<(), ServiceError> {
        let port = self.config.service.health_port;
        info!("Starting metrics and health endpoints on port {}", port);

        let health_config = HealthServerConfig {
            port,
            host: self.config.server.host.clone(),
        };
        let health_server = Arc::new(
            HealthServer::new(health_config, self.metrics.clone()).with_app_state(self.clone()),
        );
        let metrics_service = Arc::new(MetricsService::new(self.metrics.clone(), health_server));

        let task_service = metrics_service.clone();
        let metrics_handle = tokio::spawn(async move {
            if let Err(e) = task_service.start().await {
                error!("Metrics service failed: {}", e);
            } else {
                info!("Metrics service task completed");
            }
        });

        *self.metrics_service.write().await = Some(metrics_service);
        self.background_tasks.lock().await.push(metrics_handle);

        // Give the server a moment to start up
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        info!("✅ Metrics service started on port {}", port);
        Ok(())
    }

    /// Serve WebSocket clients on the bound listener
    async fn start_lobby_server(&self, listener: TcpListener) {
        let ws_server = self.ws_server.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = ws_server.serve(listener).await {
                error!("Lobby server failed: {}", e);
            }
        });

        self.background_tasks.lock().await.push(handle);
    }

    /// Start background maintenance tasks
    async fn start_background_tasks(&self) {
        info!(
            "Starting metrics refresh task ({}s interval)...",
            METRICS_REFRESH_INTERVAL.as_secs()
        );

        let dispatcher = self.dispatcher.clone();
        let metrics = self.metrics.clone();
        let is_running = self.is_running.clone();
        let started_at = self.started_at;

        let refresh_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(METRICS_REFRESH_INTERVAL);
            info!("Metrics refresh task started");

            while *is_running.read().await {
                interval.tick().await;

                let stats = dispatcher.lock().await.membership().stats();
                debug!(
                    "Updating metrics - sessions: {}, players: {}, connections: {}",
                    stats.active_sessions, stats.active_players, stats.active_connections
                );
                metrics.update_from_stats(&stats);
                metrics.update_uptime(started_at.elapsed());

                metrics.update_health_status(2); // 2 = healthy
                metrics.update_component_health("dispatcher", true);
                metrics.update_component_health("lobby_server", true);
                metrics.update_component_health("metrics", true);
            }

            info!("Metrics refresh task stopped");
        });

        self.background_tasks.lock().await.push(refresh_task);
    }

    /// Stop all background tasks
    async fn stop_background_tasks(&self) {
        let mut tasks = self.background_tasks.lock().await;
        let task_count = tasks.len();
        if task_count == 0 {
            info!("No background tasks to stop");
            return;
        }

        info!("Stopping {} background tasks...", task_count);

        for (i, task) in tasks.drain(..).enumerate() {
            debug!("Aborting background task {}/{}", i + 1, task_count);
            task.abort();
        }

        info!("✅ All {} background tasks stopped", task_count);
    }
}
