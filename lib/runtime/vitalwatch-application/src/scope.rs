//! What a sync engine fetches and which push events concern it.

use std::fmt::Debug;

use async_trait::async_trait;
use futures_util::future::try_join_all;
use tracing::debug;

use vitalwatch_domain::{AnomalyIndex, DashboardSnapshot, PatientId, PatientSnapshot, PushEvent};
use vitalwatch_ports::{GatewayError, GatewayResult, RemoteGateway};

pub const DASHBOARD_FAILURE: &str = "Failed to load dashboard data";
pub const PATIENT_FAILURE: &str = "Failed to load patient data";

#[async_trait]
pub trait SyncScope: Send + Sync + 'static {
    type Data: Clone + Debug + Send + Sync + 'static;

    /// Short label for logs.
    fn label(&self) -> String;

    /// User-facing message stored with a failed refresh.
    fn failure_message(&self) -> &'static str;

    /// Whether a push event should trigger a refresh.
    fn accepts(&self, event: &PushEvent) -> bool;

    /// Fetch everything the scope needs as one unit. Any failed request fails
    /// the whole fetch.
    async fn fetch(&self, gateway: &dyn RemoteGateway) -> GatewayResult<Self::Data>;
}

/// Dashboard-wide summary plus the anomaly index of every patient in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardScope;

#[async_trait]
impl SyncScope for DashboardScope {
    type Data = DashboardSnapshot;

    fn label(&self) -> String {
        "dashboard".to_string()
    }

    fn failure_message(&self) -> &'static str {
        DASHBOARD_FAILURE
    }

    fn accepts(&self, _event: &PushEvent) -> bool {
        true
    }

    async fn fetch(&self, gateway: &dyn RemoteGateway) -> GatewayResult<DashboardSnapshot> {
        let summary = gateway.fetch_summary().await?;
        if !summary.has_readings() {
            debug!("Summary has no readings, skipping anomaly fan-out");
            return Ok(DashboardSnapshot::new(summary, AnomalyIndex::new()));
        }
        let index = build_index(gateway, &summary.patient_ids()).await?;
        Ok(DashboardSnapshot::new(summary, index))
    }
}

/// Fetch every patient's anomaly list concurrently and assemble a fresh index.
pub async fn build_index(
    gateway: &dyn RemoteGateway,
    patient_ids: &[PatientId],
) -> GatewayResult<AnomalyIndex> {
    let fetches = patient_ids.iter().map(|patient_id| async move {
        let anomalies = gateway.fetch_patient_anomalies(patient_id).await?;
        Ok::<_, GatewayError>((patient_id.clone(), anomalies))
    });
    let entries = try_join_all(fetches).await?;
    debug!(patients = entries.len(), "Anomaly index rebuilt");
    Ok(AnomalyIndex::from_entries(entries))
}

/// One patient's profile, bounded history and anomalies.
#[derive(Debug, Clone)]
pub struct PatientScope {
    patient_id: PatientId,
    history_hours: u32,
}

impl PatientScope {
    pub fn new(patient_id: impl Into<PatientId>, history_hours: u32) -> Self {
        Self {
            patient_id: patient_id.into(),
            history_hours,
        }
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn history_hours(&self) -> u32 {
        self.history_hours
    }
}

#[async_trait]
impl SyncScope for PatientScope {
    type Data = PatientSnapshot;

    fn label(&self) -> String {
        format!("patient {}", self.patient_id)
    }

    fn failure_message(&self) -> &'static str {
        PATIENT_FAILURE
    }

    /// Events that do not name a patient cannot be about this one.
    fn accepts(&self, event: &PushEvent) -> bool {
        event.patient_id() == Some(self.patient_id.as_str())
    }

    async fn fetch(&self, gateway: &dyn RemoteGateway) -> GatewayResult<PatientSnapshot> {
        let (profile, history, anomalies) = futures_util::try_join!(
            gateway.fetch_patient(&self.patient_id),
            gateway.fetch_history(&self.patient_id, self.history_hours),
            gateway.fetch_patient_anomalies(&self.patient_id),
        )?;
        Ok(PatientSnapshot {
            profile,
            history,
            anomalies,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(patient: &str) -> PushEvent {
        PushEvent::decode("vital_update", json!({ "patientId": patient })).unwrap()
    }

    fn anonymous(name: &str) -> PushEvent {
        PushEvent::decode(name, json!({ "heartRate": 90, "severity": "high" })).unwrap()
    }

    #[test]
    fn patient_scope_filters_by_id() {
        let scope = PatientScope::new("P001", 24);
        assert!(scope.accepts(&event("P001")));
        assert!(!scope.accepts(&event("P002")));
        assert!(!scope.accepts(&anonymous("vital_update")));
    }

    #[test]
    fn dashboard_scope_accepts_everything() {
        assert!(DashboardScope.accepts(&event("P777")));
        assert!(DashboardScope.accepts(&anonymous("vital_update")));
        assert!(DashboardScope.accepts(&anonymous("anomaly_alert")));
    }
}
