//! WebSocket transport for lobby clients
//!
//! Every accepted socket gets a reader loop that hands text frames to the
//! [`MessageHandler`] in arrival order, and a writer task that drains the
//! connection's unbounded outbound channel and sends keep-alive pings. A
//! connection whose pongs stop arriving for longer than the pong timeout is
//! closed and goes through the normal disconnect path.

use crate::dispatch::MessageHandler;
use anyhow::Result;
use axum::{
    extract::{
        connect_info::ConnectInfo,
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::Extensions,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, trace, warn};

/// Plain-text banner served on `GET /`
pub const WELCOME_BANNER: &str = "Welcome to Multiplayer Game Server";

/// WebSocket server configuration
#[derive(Debug, Clone)]
pub struct WsServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Interval between keep-alive pings
    pub ping_interval: Duration,
    /// Close the connection when no pong arrived for this long
    pub pong_timeout: Duration,
}

impl Default for WsServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            ping_interval: Duration::from_secs(20),
            pong_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Clone)]
struct WsState {
    handler: Arc<dyn MessageHandler>,
    ping_interval: Duration,
    pong_timeout: Duration,
}

/// Lobby server exposing the banner and the `/ws` upgrade endpoint
pub struct WsServer {
    config: WsServerConfig,
    handler: Arc<dyn MessageHandler>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WsServer {
    pub fn new(config: WsServerConfig, handler: Arc<dyn MessageHandler>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            handler,
            shutdown_tx,
        }
    }

    pub fn config(&self) -> &WsServerConfig {
        &self.config
    }

    /// Serve on an already bound listener until stopped
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        let app = self.create_router();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        info!("Lobby server listening on http://{} (ws path /ws)", local_addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Lobby server shutdown signal received");
        })
        .await?;

        info!("Lobby server stopped");
        Ok(())
    }

    /// Create the Axum router for the lobby endpoints
    pub fn create_router(&self) -> Router {
        let state = WsState {
            handler: self.handler.clone(),
            ping_interval: self.config.ping_interval,
            pong_timeout: self.config.pong_timeout,
        };

        Router::new()
            .route("/", get(root_handler))
            .route("/ws", get(ws_handler))
            .with_state(state)
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stopping lobby server...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to send shutdown signal to lobby server: {}", e);
        }
        Ok(())
    }
}

async fn root_handler() -> &'static str {
    WELCOME_BANNER
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
    extensions: Extensions,
) -> impl IntoResponse {
    let remote_addr = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    ws.on_upgrade(move |socket| handle_socket(socket, state, remote_addr))
}

async fn handle_socket(socket: WebSocket, state: WsState, remote_addr: Option<SocketAddr>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection = state.handler.on_connect(tx, remote_addr).await;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (pong_tx, pong_rx) = watch::channel(Instant::now());

    let ping_interval = state.ping_interval;
    let pong_timeout = state.pong_timeout;
    let mut writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(ping_interval);
        ping.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                frame = rx.recv() => {
                    match frame {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ping.tick() => {
                    let silent_for = pong_rx.borrow().elapsed();
                    if silent_for > pong_timeout {
                        warn!(
                            connection_id = %connection,
                            silent_ms = silent_for.as_millis() as u64,
                            "Pong timeout, closing connection"
                        );
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                    trace!(connection_id = %connection, "Sent ping");
                }
            }
        }

        let _ = ws_tx.close().await;
    });

    let handler = state.handler.clone();
    let reader = async move {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    handler.on_text(connection, text.as_str().to_owned()).await
                }
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => handler.on_text(connection, text).await,
                    Err(_) => {
                        debug!(connection_id = %connection, "Ignoring non-UTF-8 binary frame")
                    }
                },
                Ok(Message::Pong(_)) => {
                    let _ = pong_tx.send(Instant::now());
                }
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) => {} // answered by axum
                Err(e) => {
                    debug!(connection_id = %connection, "WebSocket read error: {}", e);
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = &mut writer => {},
        _ = reader => {},
    }

    state.handler.on_disconnect(connection).await;
    writer.abort();
    info!(connection_id = %connection, "WebSocket client disconnected");
}
