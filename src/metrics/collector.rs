//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the party-lobby coordinator
//! using Prometheus metrics.

use crate::session::MembershipStats;
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec,
    Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the lobby service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Session-related metrics
    session_metrics: SessionMetrics,

    /// Connection-related metrics
    connection_metrics: ConnectionMetrics,

    /// Event delivery metrics
    broadcast_metrics: BroadcastMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Inbound client messages by type and outcome
    pub messages_total: IntCounterVec,

    /// Inbound frames that were not valid JSON messages
    pub decode_failures_total: IntCounter,

    /// Well-formed messages with an unrecognized type
    pub ignored_messages_total: IntCounter,

    /// Health check status (0=unhealthy, 1=degraded, 2=healthy)
    pub health_status: IntGauge,

    /// Component health status
    pub component_health: IntGaugeVec,
}

/// Session-related metrics
#[derive(Clone)]
pub struct SessionMetrics {
    /// Number of live sessions
    pub active_sessions: IntGauge,

    /// Number of players seated across all sessions
    pub active_players: IntGauge,

    /// Total sessions created
    pub sessions_created_total: IntCounter,

    /// Total sessions deleted, by reason
    pub sessions_deleted_total: IntCounterVec,

    /// Total joins
    pub players_joined_total: IntCounter,

    /// Total departures, by reason
    pub players_left_total: IntCounterVec,

    /// Total games started
    pub games_started_total: IntCounter,

    /// Total games ended
    pub games_ended_total: IntCounter,

    /// Players per started game
    pub game_size: Histogram,

    /// Generated codes rejected because they were already live
    pub code_collisions_total: IntCounter,
}

/// Connection-related metrics
#[derive(Clone)]
pub struct ConnectionMetrics {
    /// Open client connections
    pub active_connections: IntGauge,

    /// Total connections accepted
    pub connections_total: IntCounter,

    /// Total connections closed
    pub disconnections_total: IntCounter,
}

/// Event delivery metrics
#[derive(Clone)]
pub struct BroadcastMetrics {
    /// Events queued to open connections
    pub messages_delivered_total: IntCounterVec,

    /// Events dropped because the recipient channel was closed
    pub deliveries_skipped_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Time spent handling one inbound message
    pub message_processing_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let session_metrics = SessionMetrics::new(&registry)?;
        let connection_metrics = ConnectionMetrics::new(&registry)?;
        let broadcast_metrics = BroadcastMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            session_metrics,
            connection_metrics,
            broadcast_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn session(&self) -> &SessionMetrics {
        &self.session_metrics
    }

    pub fn connection(&self) -> &ConnectionMetrics {
        &self.connection_metrics
    }

    pub fn broadcast(&self) -> &BroadcastMetrics {
        &self.broadcast_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Refresh the gauges from a membership snapshot
    pub fn update_from_stats(&self, stats: &MembershipStats) {
        self.session_metrics
            .active_sessions
            .set(stats.active_sessions as i64);
        self.session_metrics
            .active_players
            .set(stats.active_players as i64);
        self.connection_metrics
            .active_connections
            .set(stats.active_connections as i64);
    }

    pub fn update_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Record an inbound message that reached a handler
    pub fn record_message(&self, message_type: &str, success: bool, duration: Duration) {
        let status = if success { "success" } else { "error" };

        self.service_metrics
            .messages_total
            .with_label_values(&[message_type, status])
            .inc();

        self.performance_metrics
            .message_processing_duration
            .with_label_values(&[message_type])
            .observe(duration.as_secs_f64());
    }

    pub fn record_decode_failure(&self) {
        self.service_metrics.decode_failures_total.inc();
    }

    pub fn record_ignored_message(&self) {
        self.service_metrics.ignored_messages_total.inc();
    }

    pub fn record_connection_opened(&self) {
        self.connection_metrics.connections_total.inc();
        self.connection_metrics.active_connections.inc();
    }

    pub fn record_connection_closed(&self) {
        self.connection_metrics.disconnections_total.inc();
        self.connection_metrics.active_connections.dec();
    }

    pub fn record_session_created(&self) {
        self.session_metrics.sessions_created_total.inc();
        self.session_metrics.active_sessions.inc();
        self.session_metrics.active_players.inc();
    }

    /// Record a session being deleted (`empty` or `ended`)
    pub fn record_session_deleted(&self, reason: &str) {
        self.session_metrics
            .sessions_deleted_total
            .with_label_values(&[reason])
            .inc();
        self.session_metrics.active_sessions.dec();
    }

    pub fn record_player_joined(&self) {
        self.session_metrics.players_joined_total.inc();
        self.session_metrics.active_players.inc();
    }

    /// Record a player departure (`leave` or `disconnect`)
    pub fn record_player_left(&self, reason: &str) {
        self.session_metrics
            .players_left_total
            .with_label_values(&[reason])
            .inc();
        self.session_metrics.active_players.dec();
    }

    pub fn record_game_started(&self, player_count: usize) {
        self.session_metrics.games_started_total.inc();
        self.session_metrics.game_size.observe(player_count as f64);
    }

    pub fn record_game_ended(&self) {
        self.session_metrics.games_ended_total.inc();
    }

    pub fn record_code_collisions(&self, collisions: u64) {
        self.session_metrics.code_collisions_total.inc_by(collisions);
    }

    /// Record the outcome of one fan-out
    pub fn record_delivery(&self, event: &str, delivered: usize, skipped: usize) {
        if delivered > 0 {
            self.broadcast_metrics
                .messages_delivered_total
                .with_label_values(&[event])
                .inc_by(delivered as u64);
        }
        if skipped > 0 {
            self.broadcast_metrics
                .deliveries_skipped_total
                .with_label_values(&[event])
                .inc_by(skipped as u64);
        }
    }

    /// Update health status
    pub fn update_health_status(&self, status: u8) {
        self.service_metrics.health_status.set(status as i64);
    }

    /// Update component health
    pub fn update_component_health(&self, component: &str, healthy: bool) {
        let status = if healthy { 1 } else { 0 };
        self.service_metrics
            .component_health
            .with_label_values(&[component])
            .set(status);
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds =
            IntGauge::new("party_lobby_uptime_seconds", "Service uptime in seconds")?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let messages_total = IntCounterVec::new(
            Opts::new(
                "party_lobby_messages_total",
                "Total client messages processed",
            ),
            &["type", "status"],
        )?;
        registry.register(Box::new(messages_total.clone()))?;

        let decode_failures_total = IntCounter::new(
            "party_lobby_decode_failures_total",
            "Inbound frames that failed to decode",
        )?;
        registry.register(Box::new(decode_failures_total.clone()))?;

        let ignored_messages_total = IntCounter::new(
            "party_lobby_ignored_messages_total",
            "Inbound messages with an unknown type",
        )?;
        registry.register(Box::new(ignored_messages_total.clone()))?;

        let health_status = IntGauge::new(
            "party_lobby_health_status",
            "Health status (0=unhealthy, 1=degraded, 2=healthy)",
        )?;
        registry.register(Box::new(health_status.clone()))?;

        let component_health = IntGaugeVec::new(
            Opts::new("party_lobby_component_health", "Component health status"),
            &["component"],
        )?;
        registry.register(Box::new(component_health.clone()))?;

        Ok(Self {
            uptime_seconds,
            messages_total,
            decode_failures_total,
            ignored_messages_total,
            health_status,
            component_health,
        })
    }
}

impl SessionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_sessions =
            IntGauge::new("party_lobby_active_sessions", "Number of live sessions")?;
        registry.register(Box::new(active_sessions.clone()))?;

        let active_players = IntGauge::new(
            "party_lobby_active_players",
            "Players seated across all sessions",
        )?;
        registry.register(Box::new(active_players.clone()))?;

        let sessions_created_total = IntCounter::new(
            "party_lobby_sessions_created_total",
            "Total sessions created",
        )?;
        registry.register(Box::new(sessions_created_total.clone()))?;

        let sessions_deleted_total = IntCounterVec::new(
            Opts::new(
                "party_lobby_sessions_deleted_total",
                "Total sessions deleted",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(sessions_deleted_total.clone()))?;

        let players_joined_total =
            IntCounter::new("party_lobby_players_joined_total", "Total session joins")?;
        registry.register(Box::new(players_joined_total.clone()))?;

        let players_left_total = IntCounterVec::new(
            Opts::new("party_lobby_players_left_total", "Total session departures"),
            &["reason"],
        )?;
        registry.register(Box::new(players_left_total.clone()))?;

        let games_started_total =
            IntCounter::new("party_lobby_games_started_total", "Total games started")?;
        registry.register(Box::new(games_started_total.clone()))?;

        let games_ended_total =
            IntCounter::new("party_lobby_games_ended_total", "Total games ended")?;
        registry.register(Box::new(games_ended_total.clone()))?;

        let game_size = Histogram::with_opts(
            HistogramOpts::new("party_lobby_game_size", "Players per started game")
                .buckets(vec![1.0, 2.0, 3.0, 4.0, 6.0, 8.0, 12.0, 16.0]),
        )?;
        registry.register(Box::new(game_size.clone()))?;

        let code_collisions_total = IntCounter::new(
            "party_lobby_code_collisions_total",
            "Generated session codes that were already in use",
        )?;
        registry.register(Box::new(code_collisions_total.clone()))?;

        Ok(Self {
            active_sessions,
            active_players,
            sessions_created_total,
            sessions_deleted_total,
            players_joined_total,
            players_left_total,
            games_started_total,
            games_ended_total,
            game_size,
            code_collisions_total,
        })
    }
}

impl ConnectionMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let active_connections =
            IntGauge::new("party_lobby_active_connections", "Open client connections")?;
        registry.register(Box::new(active_connections.clone()))?;

        let connections_total = IntCounter::new(
            "party_lobby_connections_total",
            "Total connections accepted",
        )?;
        registry.register(Box::new(connections_total.clone()))?;

        let disconnections_total = IntCounter::new(
            "party_lobby_disconnections_total",
            "Total connections closed",
        )?;
        registry.register(Box::new(disconnections_total.clone()))?;

        Ok(Self {
            active_connections,
            connections_total,
            disconnections_total,
        })
    }
}

impl BroadcastMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let messages_delivered_total = IntCounterVec::new(
            Opts::new(
                "party_lobby_messages_delivered_total",
                "Server events queued to open connections",
            ),
            &["event"],
        )?;
        registry.register(Box::new(messages_delivered_total.clone()))?;

        let deliveries_skipped_total = IntCounterVec::new(
            Opts::new(
                "party_lobby_deliveries_skipped_total",
                "Server events dropped for closed connections",
            ),
            &["event"],
        )?;
        registry.register(Box::new(deliveries_skipped_total.clone()))?;

        Ok(Self {
            messages_delivered_total,
            deliveries_skipped_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let message_processing_duration = HistogramVec::new(
            HistogramOpts::new(
                "party_lobby_message_processing_duration_seconds",
                "Inbound message processing time",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["type"],
        )?;
        registry.register(Box::new(message_processing_duration.clone()))?;

        Ok(Self {
            message_processing_duration,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
