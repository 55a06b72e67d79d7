use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::Severity;
use crate::events::AnomalyAlert;
use crate::patient::PatientId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub patient_id: Option<PatientId>,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    /// Alerts with an unrecognised severity are raised as warnings.
    pub fn from_alert(alert: &AnomalyAlert) -> Self {
        Self {
            title: "Health Alert".to_string(),
            message: alert.headline(),
            severity: alert.severity().unwrap_or(Severity::Warning),
            patient_id: alert.patient_id.clone(),
            timestamp: Utc::now(),
        }
    }
}
