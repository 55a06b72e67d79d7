//! Long-lived push connection with automatic reconnection.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message as WsMessage,
};
use tracing::{debug, error, info, instrument, warn};

use vitalwatch_domain::{PushEvent, PushEventKind, ReconnectConfig};
use vitalwatch_ports::{PushHandler, PushPort, SubscriptionId, SubscriptionRegistry};

use crate::protocol::{self, Frame, ProtocolError};

/// How long to wait for the server's open packet after the socket connects.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    /// Waiting before reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
    /// Reconnect attempts exhausted.
    Failed,
    Closed,
}

#[derive(Error, Debug)]
pub enum PushError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("server refused namespace connect: {0}")]
    Rejected(serde_json::Value),
    #[error("no traffic for {0:?}")]
    Timeout(Duration),
    #[error("connection closed by server")]
    Closed,
}

enum SessionEnd {
    Shutdown,
    Lost { established: bool, reason: PushError },
}

struct Shared {
    url: String,
    reconnect: ReconnectConfig,
    registry: Arc<SubscriptionRegistry>,
    status: watch::Sender<ConnectionStatus>,
}

impl Shared {
    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }

    fn dispatch(&self, name: &str, payload: serde_json::Value) {
        match PushEvent::decode(name, payload) {
            Some(event) => {
                let delivered = self.registry.emit(&event);
                debug!(event = name, patient_id = event.patient_id(), delivered, "Push event");
            }
            None => debug!(event = name, "Ignoring unknown push event"),
        }
    }
}

/// Socket.IO client delivering `vital_update` and `anomaly_alert` events to
/// subscribers.
///
/// Subscriptions live in the channel, not the connection, so they survive
/// reconnects.
pub struct PushChannel {
    shared: Arc<Shared>,
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PushChannel {
    /// `base_url` is the server root (`http://host:port`); the Socket.IO path
    /// is appended. Nothing connects until [`PushChannel::connect`].
    pub fn new(base_url: &str, reconnect: ReconnectConfig) -> Result<Self, ProtocolError> {
        let url = protocol::websocket_url(base_url)?;
        let (status, _) = watch::channel(ConnectionStatus::Idle);
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            shared: Arc::new(Shared {
                url,
                reconnect,
                registry: Arc::new(SubscriptionRegistry::new()),
                status,
            }),
            shutdown,
            task: Mutex::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Start the connection task. Does nothing while a task is already running
    /// or after `disconnect`. Must be called from within a tokio runtime.
    pub fn connect(&self) {
        if *self.shutdown.borrow() {
            return;
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let shutdown = self.shutdown.subscribe();
        *task = Some(tokio::spawn(run(shared, shutdown)));
    }

    /// Close the connection and stop reconnecting. Subscriptions are kept.
    pub fn disconnect(&self) {
        self.shutdown.send_replace(true);
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if task.is_none() {
            self.shared.set_status(ConnectionStatus::Closed);
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.shared.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared.status.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    pub fn subscriber_count(&self, kind: PushEventKind) -> usize {
        self.shared.registry.subscriber_count(kind)
    }
}

impl PushPort for PushChannel {
    fn on(&self, kind: PushEventKind, handler: PushHandler) -> SubscriptionId {
        self.shared.registry.on(kind, handler)
    }

    fn off(&self, kind: PushEventKind, id: Option<SubscriptionId>) {
        self.shared.registry.off(kind, id);
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

#[instrument(skip_all, fields(url = %shared.url))]
async fn run(shared: Arc<Shared>, mut shutdown: watch::Receiver<bool>) {
    let max_attempts = shared.reconnect.attempts;
    let mut attempts = 0;

    loop {
        shared.set_status(ConnectionStatus::Connecting);
        let connected = tokio::select! {
            _ = shutdown.changed() => None,
            connected = connect_async(shared.url.as_str()) => Some(connected),
        };
        let end = match connected {
            None => SessionEnd::Shutdown,
            Some(Ok((stream, _))) => session(&shared, stream, &mut shutdown).await,
            Some(Err(err)) => SessionEnd::Lost {
                established: false,
                reason: err.into(),
            },
        };

        match end {
            SessionEnd::Shutdown => break,
            SessionEnd::Lost {
                established,
                reason,
            } => {
                if established {
                    info!(reason = %reason, "Push connection lost");
                    attempts = 0;
                } else {
                    error!(error = %reason, "Push connection error");
                }
            }
        }

        if attempts >= max_attempts {
            error!(attempts, "Giving up on push connection");
            shared.set_status(ConnectionStatus::Failed);
            return;
        }
        attempts += 1;
        shared.set_status(ConnectionStatus::Reconnecting { attempt: attempts });
        debug!(attempt = attempts, max_attempts, "Reconnecting after delay");

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = tokio::time::sleep(shared.reconnect.delay()) => {}
        }
        if *shutdown.borrow() {
            break;
        }
    }

    shared.set_status(ConnectionStatus::Closed);
    info!("Push connection closed");
}

async fn session(
    shared: &Shared,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();
    let mut established = false;

    let lost = |established: bool, reason: PushError| SessionEnd::Lost {
        established,
        reason,
    };

    let open = match tokio::time::timeout(HANDSHAKE_TIMEOUT, read.next()).await {
        Err(_) => return lost(false, PushError::Timeout(HANDSHAKE_TIMEOUT)),
        Ok(Some(Ok(WsMessage::Text(text)))) => match protocol::parse(&text) {
            Ok(Frame::Open(info)) => info,
            Ok(other) => {
                let reason = ProtocolError::Malformed {
                    frame: format!("{other:?}"),
                    reason: "expected open packet".to_string(),
                };
                return lost(false, reason.into());
            }
            Err(err) => return lost(false, err.into()),
        },
        Ok(Some(Ok(_))) | Ok(None) => return lost(false, PushError::Closed),
        Ok(Some(Err(err))) => return lost(false, err.into()),
    };
    debug!(sid = %open.sid, ping_interval_ms = open.ping_interval, "Engine.IO handshake");

    if let Err(err) = write.send(WsMessage::Text(protocol::CONNECT.into())).await {
        return lost(false, err.into());
    }

    let liveness = open.liveness();
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                if let Err(err) = write.send(WsMessage::Text(protocol::DISCONNECT.into())).await {
                    debug!(error = %err, "Failed to send disconnect");
                }
                let _ = write.close().await;
                return SessionEnd::Shutdown;
            }
            next = tokio::time::timeout(liveness, read.next()) => {
                let message = match next {
                    Err(_) => return lost(established, PushError::Timeout(liveness)),
                    Ok(None) => return lost(established, PushError::Closed),
                    Ok(Some(Err(err))) => return lost(established, err.into()),
                    Ok(Some(Ok(message))) => message,
                };
                let text = match message {
                    WsMessage::Text(text) => text,
                    WsMessage::Close(frame) => {
                        debug!(frame = ?frame, "Server closed websocket");
                        return lost(established, PushError::Closed);
                    }
                    _ => continue,
                };
                match protocol::parse(&text) {
                    Ok(Frame::Ping) => {
                        if let Err(err) = write.send(WsMessage::Text(protocol::PONG.into())).await {
                            return lost(established, err.into());
                        }
                    }
                    Ok(Frame::Connect) => {
                        established = true;
                        shared.set_status(ConnectionStatus::Connected);
                        info!("Push connection established");
                    }
                    Ok(Frame::Event { name, payload }) => shared.dispatch(&name, payload),
                    Ok(Frame::ConnectError(detail)) => {
                        return lost(established, PushError::Rejected(detail));
                    }
                    Ok(Frame::Disconnect) | Ok(Frame::Close) => {
                        return lost(established, PushError::Closed);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(error = %err, "Dropping unreadable frame"),
                }
            }
        }
    }
}
