#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use tokio::sync::watch;

use vitalwatch_application::SyncState;
use vitalwatch_domain::{
    AlertLog, Anomaly, HealthCheck, PatientProfile, PushEvent, Reading, Severity, Summary,
};
use vitalwatch_ports::{GatewayError, GatewayResult, RemoteGateway};

type Scripted<T> = (Duration, GatewayResult<T>);

#[derive(Default)]
struct Backend {
    summary: Option<GatewayResult<Summary>>,
    summary_script: VecDeque<Scripted<Summary>>,
    anomalies: HashMap<String, Vec<Anomaly>>,
    anomaly_errors: HashMap<String, GatewayError>,
    profiles: HashMap<String, PatientProfile>,
    history: HashMap<String, Vec<Reading>>,
    ack_error: Option<GatewayError>,
    acks: Vec<(String, String)>,
    history_windows: Vec<u32>,
    calls: HashMap<&'static str, usize>,
}

/// In-memory backend with per-endpoint counters and scripted summary replies.
#[derive(Default)]
pub struct FakeGateway {
    backend: Mutex<Backend>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with<R>(&self, f: impl FnOnce(&mut Backend) -> R) -> R {
        f(&mut self.backend.lock().unwrap())
    }

    fn record(&self, endpoint: &'static str) {
        self.with(|b| *b.calls.entry(endpoint).or_default() += 1);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.with(|b| b.calls.get(endpoint).copied().unwrap_or(0))
    }

    pub fn set_summary(&self, summary: Summary) {
        self.with(|b| b.summary = Some(Ok(summary)));
    }

    pub fn fail_summary(&self, err: GatewayError) {
        self.with(|b| b.summary = Some(Err(err)));
    }

    /// Queue a one-off summary reply that resolves after `delay`. Queued replies
    /// are used before the standing one.
    pub fn script_summary(&self, delay: Duration, result: GatewayResult<Summary>) {
        self.with(|b| b.summary_script.push_back((delay, result)));
    }

    pub fn set_anomalies(&self, patient_id: &str, anomalies: Vec<Anomaly>) {
        self.with(|b| {
            b.anomaly_errors.remove(patient_id);
            b.anomalies.insert(patient_id.to_string(), anomalies);
        });
    }

    pub fn fail_anomalies(&self, patient_id: &str, err: GatewayError) {
        self.with(|b| b.anomaly_errors.insert(patient_id.to_string(), err));
    }

    pub fn set_patient(&self, profile: PatientProfile, history: Vec<Reading>) {
        self.with(|b| {
            b.history.insert(profile.patient_id.clone(), history);
            b.profiles.insert(profile.patient_id.clone(), profile);
        });
    }

    pub fn fail_acknowledgments(&self, err: GatewayError) {
        self.with(|b| b.ack_error = Some(err));
    }

    pub fn acknowledgments(&self) -> Vec<(String, String)> {
        self.with(|b| b.acks.clone())
    }

    pub fn history_windows(&self) -> Vec<u32> {
        self.with(|b| b.history_windows.clone())
    }
}

#[async_trait]
impl RemoteGateway for FakeGateway {
    async fn fetch_summary(&self) -> GatewayResult<Summary> {
        self.record("summary");
        let (delay, result) = self.with(|b| match b.summary_script.pop_front() {
            Some(scripted) => scripted,
            None => (
                Duration::ZERO,
                b.summary
                    .clone()
                    .unwrap_or_else(|| Err(GatewayError::Transport("no summary".into()))),
            ),
        });
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn fetch_patients(&self) -> GatewayResult<Vec<PatientProfile>> {
        self.record("patients");
        Ok(self.with(|b| b.profiles.values().cloned().collect()))
    }

    async fn fetch_patient(&self, patient_id: &str) -> GatewayResult<PatientProfile> {
        self.record("patient");
        self.with(|b| b.profiles.get(patient_id).cloned())
            .ok_or_else(|| GatewayError::NotFound {
                resource: "patient",
                id: patient_id.to_string(),
            })
    }

    async fn fetch_latest_reading(&self, patient_id: &str) -> GatewayResult<Reading> {
        self.record("latest");
        self.with(|b| b.history.get(patient_id).and_then(|h| h.last().cloned()))
            .ok_or_else(|| GatewayError::NotFound {
                resource: "reading",
                id: patient_id.to_string(),
            })
    }

    async fn fetch_history(&self, patient_id: &str, window_hours: u32) -> GatewayResult<Vec<Reading>> {
        self.record("history");
        Ok(self.with(|b| {
            b.history_windows.push(window_hours);
            b.history.get(patient_id).cloned().unwrap_or_default()
        }))
    }

    async fn fetch_active_anomalies(&self) -> GatewayResult<Vec<Anomaly>> {
        self.record("active_anomalies");
        Ok(self.with(|b| {
            b.anomalies
                .values()
                .flatten()
                .filter(|a| a.is_active())
                .cloned()
                .collect()
        }))
    }

    async fn fetch_patient_anomalies(&self, patient_id: &str) -> GatewayResult<Vec<Anomaly>> {
        self.record("patient_anomalies");
        self.with(|b| match b.anomaly_errors.get(patient_id) {
            Some(err) => Err(err.clone()),
            None => Ok(b.anomalies.get(patient_id).cloned().unwrap_or_default()),
        })
    }

    async fn submit_acknowledgment(&self, anomaly_id: &str, acknowledged_by: &str) -> GatewayResult<()> {
        self.record("acknowledge");
        self.with(|b| {
            if let Some(err) = &b.ack_error {
                return Err(err.clone());
            }
            let anomaly = b
                .anomalies
                .values_mut()
                .flatten()
                .find(|a| a.id == anomaly_id)
                .ok_or_else(|| GatewayError::NotFound {
                    resource: "anomaly",
                    id: anomaly_id.to_string(),
                })?;
            anomaly.acknowledged = true;
            anomaly.acknowledged_by = Some(acknowledged_by.to_string());
            b.acks.push((anomaly_id.to_string(), acknowledged_by.to_string()));
            Ok(())
        })
    }

    async fn fetch_alert_history(&self, _days: u32) -> GatewayResult<Vec<AlertLog>> {
        self.record("alert_history");
        Ok(Vec::new())
    }

    async fn check_health(&self) -> GatewayResult<HealthCheck> {
        self.record("health");
        Ok(HealthCheck {
            status: "ok".to_string(),
            timestamp: Utc::now(),
        })
    }
}

pub fn reading(patient_id: &str, minute: u32) -> Reading {
    serde_json::from_value(json!({
        "_id": format!("r-{patient_id}-{minute}"),
        "patientId": patient_id,
        "heartRate": 70 + minute,
        "bloodPressure": "120/80",
        "spo2": 98,
        "bodyTemperature": 36.8,
        "recordedAt": Utc.with_ymd_and_hms(2024, 3, 1, 8, minute, 0).unwrap(),
    }))
    .unwrap()
}

pub fn summary_for(patient_ids: &[&str]) -> Summary {
    serde_json::from_value(json!({
        "summary": {
            "totalPatients": patient_ids.len(),
            "activeAnomalies": 0,
            "criticalCount": 0,
            "warningCount": 0,
        },
        "recentAnomalies": [],
        "latestVitals": patient_ids
            .iter()
            .enumerate()
            .map(|(i, id)| reading(id, i as u32))
            .collect::<Vec<_>>(),
        "timestamp": "2024-03-01T08:30:00Z",
    }))
    .unwrap()
}

pub fn anomaly(id: &str, patient_id: &str, severity: Severity, acknowledged: bool) -> Anomaly {
    serde_json::from_value(json!({
        "_id": id,
        "patientId": patient_id,
        "severity": severity,
        "alerts": [{ "type": "heart_rate", "message": "Heart rate out of range" }],
        "acknowledged": acknowledged,
        "detectedAt": "2024-03-01T08:15:00Z",
    }))
    .unwrap()
}

pub fn profile(patient_id: &str, name: &str) -> PatientProfile {
    serde_json::from_value(json!({
        "patientId": patient_id,
        "name": name,
        "age": 67,
        "conditions": ["hypertension"],
    }))
    .unwrap()
}

pub fn vital_update(patient_id: &str) -> PushEvent {
    PushEvent::decode("vital_update", json!({ "patientId": patient_id, "heartRate": 88 }))
        .unwrap()
}

pub fn anomaly_alert(patient_id: &str) -> PushEvent {
    PushEvent::decode(
        "anomaly_alert",
        json!({ "patientId": patient_id, "patientName": "Ada", "severity": "critical", "alerts": [] }),
    )
    .unwrap()
}

/// Wait until the state satisfies `done` and return a copy of it.
pub async fn wait_until<D: Clone>(
    rx: &mut watch::Receiver<SyncState<D>>,
    done: impl FnMut(&SyncState<D>) -> bool,
) -> SyncState<D> {
    rx.wait_for(done).await.unwrap().clone()
}

/// Let spawned tasks run without advancing time.
pub async fn drain() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
