use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{info, warn};

use vitalwatch_domain::{Notification, Severity, WatchConfig};
use vitalwatch_ports::NotificationPort;

const APP_NAME: &str = "vitalwatch";
const DESKTOP_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_HISTORY: usize = 100;

/// Logs every notification and, when enabled, shows it on the desktop.
#[derive(Debug, Clone, Default)]
pub struct NotificationService {
    desktop: bool,
    sent: Arc<RwLock<VecDeque<Notification>>>,
}

impl NotificationService {
    pub fn new(desktop: bool) -> Self {
        Self {
            desktop,
            sent: Arc::default(),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.desktop_notifications)
    }

    /// Most recent notifications, oldest first.
    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn remember(&self, notification: Notification) {
        let mut sent = self.sent.write().unwrap_or_else(PoisonError::into_inner);
        if sent.len() == MAX_HISTORY {
            sent.pop_front();
        }
        sent.push_back(notification);
    }
}

#[async_trait]
impl NotificationPort for NotificationService {
    async fn send_notification(&self, notification: Notification) -> Result<()> {
        match notification.severity {
            Severity::Critical => warn!(
                title = %notification.title,
                patient_id = ?notification.patient_id,
                "{}", notification.message
            ),
            _ => info!(
                title = %notification.title,
                patient_id = ?notification.patient_id,
                "{}", notification.message
            ),
        }

        let (title, body) = (notification.title.clone(), notification.message.clone());
        self.remember(notification);

        if self.desktop {
            tokio::task::spawn_blocking(move || show_desktop(&title, &body))
                .await
                .context("desktop notification task failed")??;
        }
        Ok(())
    }
}

fn show_desktop(title: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(title)
        .body(body)
        .appname(APP_NAME)
        .timeout(notify_rust::Timeout::Milliseconds(
            DESKTOP_TIMEOUT.as_millis() as u32,
        ))
        .show()
        .context("failed to show desktop notification")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vitalwatch_domain::PushEvent;

    fn event(name: &str, payload: serde_json::Value) -> PushEvent {
        PushEvent::decode(name, payload).unwrap()
    }

    #[tokio::test]
    async fn records_without_desktop() {
        let service = NotificationService::new(false);
        let PushEvent::AnomalyAlert(alert) = event(
            "anomaly_alert",
            json!({ "patientId": "P001", "severity": "warning" }),
        ) else {
            unreachable!()
        };

        service
            .send_notification(Notification::from_alert(&alert))
            .await
            .unwrap();

        let sent = service.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title, "Health Alert");
        assert_eq!(sent[0].message, "P001 - WARNING");
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let service = NotificationService::new(false);
        let PushEvent::AnomalyAlert(alert) = event(
            "anomaly_alert",
            json!({ "patientId": "P003", "severity": "warning" }),
        ) else {
            unreachable!()
        };
        for i in 0..(MAX_HISTORY + 5) {
            let mut notification = Notification::from_alert(&alert);
            notification.message = format!("n{i}");
            service.send_notification(notification).await.unwrap();
        }

        let sent = service.sent();
        assert_eq!(sent.len(), MAX_HISTORY);
        assert_eq!(sent[0].message, "n5");
        assert_eq!(sent[MAX_HISTORY - 1].message, format!("n{}", MAX_HISTORY + 4));
    }
}
