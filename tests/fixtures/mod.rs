//! Test fixtures and helpers for integration testing

#![allow(dead_code)]

use party_lobby::metrics::MetricsCollector;
use party_lobby::session::LobbySettings;
use party_lobby::types::{ConnectionId, ServerMessage};
use party_lobby::MessageDispatcher;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A connected client backed by an in-memory outbound channel
pub struct TestClient {
    pub id: ConnectionId,
    rx: mpsc::UnboundedReceiver<String>,
}

impl TestClient {
    /// Register a new connection with the dispatcher
    pub fn connect(dispatcher: &mut MessageDispatcher) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = dispatcher.on_connect(tx, None);
        Self { id, rx }
    }

    /// Send a raw JSON frame as this client
    pub fn send(&self, dispatcher: &mut MessageDispatcher, frame: serde_json::Value) {
        dispatcher.on_text(self.id, &frame.to_string());
    }

    pub fn create_session(&self, dispatcher: &mut MessageDispatcher, name: &str) {
        self.send(
            dispatcher,
            json!({ "type": "createSession", "playerName": name }),
        );
    }

    pub fn join_session(&self, dispatcher: &mut MessageDispatcher, code: &str, name: &str) {
        self.send(
            dispatcher,
            json!({ "type": "joinSession", "sessionCode": code, "playerName": name }),
        );
    }

    pub fn join_team(&self, dispatcher: &mut MessageDispatcher, code: &str, name: &str, team: &str) {
        self.send(
            dispatcher,
            json!({ "type": "joinTeam", "sessionCode": code, "playerName": name, "team": team }),
        );
    }

    pub fn start_game(&self, dispatcher: &mut MessageDispatcher, code: &str) {
        self.send(
            dispatcher,
            json!({ "type": "startGame", "sessionCode": code }),
        );
    }

    pub fn end_game(&self, dispatcher: &mut MessageDispatcher, code: &str) {
        self.send(dispatcher, json!({ "type": "endGame", "sessionCode": code }));
    }

    pub fn leave_session(&self, dispatcher: &mut MessageDispatcher, code: &str) {
        self.send(
            dispatcher,
            json!({ "type": "leaveSession", "sessionCode": code }),
        );
    }

    /// All events delivered since the last drain, in order
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut events = Vec::new();
        while let Ok(frame) = self.rx.try_recv() {
            events.push(serde_json::from_str(&frame).expect("server frame should decode"));
        }
        events
    }

    /// Code from the most recent `sessionCreated` event
    pub fn created_code(&mut self) -> String {
        self.drain()
            .into_iter()
            .rev()
            .find_map(|event| match event {
                ServerMessage::SessionCreated { session_code } => Some(session_code),
                _ => None,
            })
            .expect("client should have received sessionCreated")
    }
}

/// Dispatcher with default settings and a private metrics registry
pub fn create_test_dispatcher() -> MessageDispatcher {
    create_test_dispatcher_with(LobbySettings::default())
}

pub fn create_test_dispatcher_with(settings: LobbySettings) -> MessageDispatcher {
    MessageDispatcher::new(settings, Arc::new(MetricsCollector::default()))
}

/// Last roster snapshot among the given events
pub fn last_roster(events: &[ServerMessage]) -> Option<Vec<party_lobby::RosterEntry>> {
    events.iter().rev().find_map(|event| match event {
        ServerMessage::UpdateLobby { players } => Some(players.clone()),
        _ => None,
    })
}

/// Messages of all `error` events among the given events
pub fn error_messages(events: &[ServerMessage]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerMessage::Error { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}
