//! Socket.IO push channel.
//!
//! One channel is shared by the whole process: [`acquire`] creates and
//! connects it on first use and hands out the same instance afterwards.

mod channel;
pub mod protocol;

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use vitalwatch_domain::WatchConfig;

pub use channel::{ConnectionStatus, PushChannel, PushError};
pub use protocol::ProtocolError;

static CHANNEL: Mutex<Option<Arc<PushChannel>>> = Mutex::new(None);

/// The process-wide channel, created and connected on first call. Must be
/// called from within a tokio runtime.
pub fn acquire(config: &WatchConfig) -> Result<Arc<PushChannel>, ProtocolError> {
    let mut slot = CHANNEL.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(channel) = slot.as_ref() {
        return Ok(Arc::clone(channel));
    }
    let channel = Arc::new(PushChannel::new(config.push_url(), config.reconnect)?);
    info!(url = %channel.url(), "Opening push channel");
    channel.connect();
    *slot = Some(Arc::clone(&channel));
    Ok(channel)
}

/// The process-wide channel if one is open.
pub fn current() -> Option<Arc<PushChannel>> {
    CHANNEL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Close and forget the process-wide channel. The next [`acquire`] opens a new
/// one. Does nothing when no channel is open.
pub fn disconnect() {
    let channel = CHANNEL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(channel) = channel {
        channel.disconnect();
    }
}
