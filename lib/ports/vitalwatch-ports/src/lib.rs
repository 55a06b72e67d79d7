//! Ports between the sync engine and the outside world.

mod error;
mod registry;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use vitalwatch_domain::{
    AlertLog, Anomaly, HealthCheck, Notification, PatientProfile, PushEvent, PushEventKind,
    Reading, Summary,
};

pub use error::{GatewayError, GatewayResult};
pub use registry::SubscriptionRegistry;

/// Request/response access to the monitoring backend's REST surface.
///
/// Implementations perform exactly one request per call: no retries and no
/// caching.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn fetch_summary(&self) -> GatewayResult<Summary>;

    async fn fetch_patients(&self) -> GatewayResult<Vec<PatientProfile>>;

    async fn fetch_patient(&self, patient_id: &str) -> GatewayResult<PatientProfile>;

    async fn fetch_latest_reading(&self, patient_id: &str) -> GatewayResult<Reading>;

    /// Readings for the last `window_hours`, oldest first.
    async fn fetch_history(
        &self,
        patient_id: &str,
        window_hours: u32,
    ) -> GatewayResult<Vec<Reading>>;

    async fn fetch_active_anomalies(&self) -> GatewayResult<Vec<Anomaly>>;

    async fn fetch_patient_anomalies(&self, patient_id: &str) -> GatewayResult<Vec<Anomaly>>;

    async fn submit_acknowledgment(
        &self,
        anomaly_id: &str,
        acknowledged_by: &str,
    ) -> GatewayResult<()>;

    async fn fetch_alert_history(&self, days: u32) -> GatewayResult<Vec<AlertLog>>;

    async fn check_health(&self) -> GatewayResult<HealthCheck>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

pub type PushHandler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// Named-event subscription surface of a push connection.
pub trait PushPort: Send + Sync {
    fn on(&self, kind: PushEventKind, handler: PushHandler) -> SubscriptionId;

    /// Remove one subscription, or every subscription for `kind` when `id` is
    /// `None`.
    fn off(&self, kind: PushEventKind, id: Option<SubscriptionId>);
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send_notification(&self, notification: Notification) -> Result<()>;
}

#[derive(Clone)]
pub struct PortSet {
    pub gateway: Arc<dyn RemoteGateway>,
    pub push: Arc<dyn PushPort>,
    pub notifications: Arc<dyn NotificationPort>,
}

impl PortSet {
    /// Gateway only: no push source (polling alone) and notifications dropped.
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self {
            gateway,
            push: Arc::new(NullPushPort::default()),
            notifications: Arc::new(NullNotificationPort),
        }
    }

    pub fn with_push(mut self, push: Arc<dyn PushPort>) -> Self {
        self.push = push;
        self
    }

    pub fn with_notifications(mut self, notifications: Arc<dyn NotificationPort>) -> Self {
        self.notifications = notifications;
        self
    }
}

/// Accepts subscriptions and never fires them.
#[derive(Default)]
pub struct NullPushPort {
    registry: SubscriptionRegistry,
}

impl PushPort for NullPushPort {
    fn on(&self, kind: PushEventKind, handler: PushHandler) -> SubscriptionId {
        self.registry.on(kind, handler)
    }

    fn off(&self, kind: PushEventKind, id: Option<SubscriptionId>) {
        self.registry.off(kind, id);
    }
}

#[derive(Clone, Copy, Default)]
pub struct NullNotificationPort;

#[async_trait]
impl NotificationPort for NullNotificationPort {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        debug!(title = %notification.title, "Notification dropped (no channel configured)");
        Ok(())
    }
}
