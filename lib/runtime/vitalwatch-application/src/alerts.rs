//! Forwards `anomaly_alert` push events to the notification port.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tracing::{debug, error};

use vitalwatch_domain::{Notification, PushEvent, PushEventKind};
use vitalwatch_ports::{NotificationPort, PortSet, PushPort, SubscriptionId};

/// Live subscription turning anomaly alerts into notifications. Dropping the
/// relay unsubscribes it.
pub struct AlertRelay {
    push: Arc<dyn PushPort>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl AlertRelay {
    /// Subscribe to `ports.push` and deliver through `ports.notifications`.
    /// Must be called from within a tokio runtime.
    pub fn start(ports: &PortSet) -> Self {
        let runtime = Handle::current();
        let notifications = Arc::clone(&ports.notifications);
        let id = ports.push.on(
            PushEventKind::AnomalyAlert,
            Arc::new(move |event: &PushEvent| {
                let PushEvent::AnomalyAlert(alert) = event else {
                    return;
                };
                let notification = Notification::from_alert(alert);
                runtime.spawn(deliver(Arc::clone(&notifications), notification));
            }),
        );
        debug!(subscription = %id, "Alert relay subscribed");
        Self {
            push: Arc::clone(&ports.push),
            subscription: Mutex::new(Some(id)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn stop(&self) {
        let id = self
            .subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = id {
            self.push.off(PushEventKind::AnomalyAlert, Some(id));
        }
    }
}

impl Drop for AlertRelay {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn deliver(notifications: Arc<dyn NotificationPort>, notification: Notification) {
    if let Err(err) = notifications.send_notification(notification).await {
        error!("Failed to send anomaly notification: {err:#}");
    }
}
