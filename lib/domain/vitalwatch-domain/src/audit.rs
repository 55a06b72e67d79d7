use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::patient::PatientId;

/// Entry of the alert audit log (`/alerts/history`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertLog {
    #[serde(rename = "_id")]
    pub id: String,
    pub patient_id: PatientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_taken: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Liveness probe response (`/health`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthCheck {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok") || self.status.eq_ignore_ascii_case("healthy")
    }
}
