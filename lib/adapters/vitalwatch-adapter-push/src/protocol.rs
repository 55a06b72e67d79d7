//! Engine.IO v4 / Socket.IO v4 text framing over a raw WebSocket.
//!
//! Only what a receive-mostly client needs: the handshake, ping/pong, connect
//! and disconnect on the default namespace, and named events.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub const HANDSHAKE_PATH: &str = "/socket.io/";
pub const HANDSHAKE_QUERY: &str = "EIO=4&transport=websocket";

pub const PONG: &str = "3";
pub const CONNECT: &str = "40";
pub const DISCONNECT: &str = "41";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unsupported push URL `{0}`")]
    InvalidUrl(String),
    #[error("empty frame")]
    Empty,
    #[error("unknown packet type `{0}`")]
    UnknownPacket(char),
    #[error("malformed frame `{frame}`: {reason}")]
    Malformed { frame: String, reason: String },
}

/// Handshake parameters sent by the server in the Engine.IO open packet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default)]
    pub max_payload: Option<u64>,
}

impl OpenInfo {
    /// How long the connection may stay silent before it is considered dead.
    pub fn liveness(&self) -> Duration {
        Duration::from_millis(self.ping_interval + self.ping_timeout)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(OpenInfo),
    Close,
    Ping,
    Pong,
    Noop,
    /// Namespace connect acknowledged.
    Connect,
    /// The server dropped us from the namespace.
    Disconnect,
    ConnectError(Value),
    Event { name: String, payload: Value },
    /// A valid packet this client does not act on (acks, binary, other
    /// namespaces).
    Ignored,
}

/// Turn an `http(s)`/`ws(s)` base URL into the Socket.IO WebSocket endpoint.
pub fn websocket_url(base: &str) -> Result<String, ProtocolError> {
    let base = base.trim().trim_end_matches('/');
    let rest = if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if base.starts_with("ws://") || base.starts_with("wss://") {
        base.to_string()
    } else {
        return Err(ProtocolError::InvalidUrl(base.to_string()));
    };
    Ok(format!("{rest}{HANDSHAKE_PATH}?{HANDSHAKE_QUERY}"))
}

pub fn parse(frame: &str) -> Result<Frame, ProtocolError> {
    let mut chars = frame.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let body = chars.as_str();
    match kind {
        '0' => serde_json::from_str(body)
            .map(Frame::Open)
            .map_err(|err| malformed(frame, err)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => parse_message(frame, body),
        '5' | '6' => Ok(Frame::Noop),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn parse_message(frame: &str, body: &str) -> Result<Frame, ProtocolError> {
    let mut chars = body.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    let rest = chars.as_str();

    let (namespace, rest) = split_namespace(rest);
    if namespace != "/" {
        return Ok(Frame::Ignored);
    }
    // Optional ack id before the payload.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());

    match kind {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => parse_event(frame, rest),
        '4' => {
            let detail = if rest.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(rest).map_err(|err| malformed(frame, err))?
            };
            Ok(Frame::ConnectError(detail))
        }
        '3' | '5' | '6' => Ok(Frame::Ignored),
        other => Err(ProtocolError::UnknownPacket(other)),
    }
}

fn split_namespace(rest: &str) -> (&str, &str) {
    if !rest.starts_with('/') {
        return ("/", rest);
    }
    match rest.find(',') {
        Some(comma) => (&rest[..comma], &rest[comma + 1..]),
        None => (rest, ""),
    }
}

fn parse_event(frame: &str, rest: &str) -> Result<Frame, ProtocolError> {
    let args: Vec<Value> = serde_json::from_str(rest).map_err(|err| malformed(frame, err))?;
    let mut args = args.into_iter();
    let name = match args.next() {
        Some(Value::String(name)) => name,
        _ => {
            return Err(ProtocolError::Malformed {
                frame: frame.to_string(),
                reason: "event name missing".to_string(),
            });
        }
    };
    Ok(Frame::Event {
        name,
        payload: args.next().unwrap_or(Value::Null),
    })
}

fn malformed(frame: &str, err: serde_json::Error) -> ProtocolError {
    ProtocolError::Malformed {
        frame: frame.to_string(),
        reason: err.to_string(),
    }
}
