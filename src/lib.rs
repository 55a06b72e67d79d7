//! Live patient vital-sign dashboard client.
//!
//! The workspace crates are re-exported here; [`ports_from_config`] wires the
//! default adapters together.

pub use vitalwatch_application as application;
pub use vitalwatch_domain as domain;
pub use vitalwatch_ports as ports;

#[cfg(feature = "adapters")]
pub use vitalwatch_adapter_http as http;
#[cfg(feature = "adapters")]
pub use vitalwatch_adapter_notification as notification;
#[cfg(feature = "adapters")]
pub use vitalwatch_adapter_push as push;

pub use vitalwatch_application::{
    AckOutcome, AcknowledgmentWorkflow, EntityDetailSync, SyncController, SyncSettings,
};
pub use vitalwatch_domain::WatchConfig;

/// REST gateway, optional push channel and notification service built from
/// `config`. With `push` set this opens the process-wide push channel, so it
/// must run inside a tokio runtime.
#[cfg(feature = "adapters")]
pub fn ports_from_config(config: &WatchConfig, push: bool) -> anyhow::Result<ports::PortSet> {
    use std::sync::Arc;

    let gateway = Arc::new(http::HttpGateway::from_config(config)?);
    let notifier = Arc::new(notification::NotificationService::from_config(config));
    let mut ports = ports::PortSet::new(gateway).with_notifications(notifier);
    if push {
        ports = ports.with_push(self::push::acquire(config)?);
    }
    Ok(ports)
}
