//! Streaming module - WebSocket push channel for subscribers

mod websocket;

pub use websocket::*;

use std::sync::Arc;
use tokio::sync::broadcast;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::EventBus;

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Enable WebSocket server
    pub websocket_enabled: bool,
    pub websocket_port: u16,
    pub websocket_max_clients: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            websocket_enabled: true,
            websocket_port: 8765,
            websocket_max_clients: 32,
        }
    }
}

/// Streaming manager
pub struct StreamingManager {
    websocket_server: Option<WebSocketServer>,
}

impl StreamingManager {
    pub fn new(config: &StreamingConfig) -> Self {
        let websocket_server = if config.websocket_enabled {
            Some(WebSocketServer::new(
                config.websocket_port,
                config.websocket_max_clients,
            ))
        } else {
            None
        };

        Self { websocket_server }
    }

    /// Start the push channel and forward bus events to connected clients.
    pub async fn start(
        &self,
        bus: Arc<EventBus>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<()> {
        let Some(ws) = &self.websocket_server else {
            debug!("WebSocket streaming disabled");
            return Ok(());
        };

        ws.start(shutdown).await?;

        let sender = ws.sender();
        let mut incident_rx = bus.subscribe_incidents();
        let mut snapshot_rx = bus.subscribe_snapshots();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    incident = incident_rx.recv() => {
                        match incident {
                            Ok(incident) => {
                                if let Ok(json) = serde_json::to_string(&incident) {
                                    let _ = sender.send(WebSocketMessage::Incident(json));
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                    snapshot = snapshot_rx.recv() => {
                        match snapshot {
                            Ok(snapshot) => {
                                if let Ok(json) = serde_json::to_string(&snapshot) {
                                    let _ = sender.send(WebSocketMessage::Snapshot(json));
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        }
                    }
                }
            }
        });

        Ok(())
    }
}
