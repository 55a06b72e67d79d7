//! Push event catalog.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::anomaly::{Alert, Severity};
use crate::patient::PatientId;

/// Event names the engine subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PushEventKind {
    VitalUpdate,
    AnomalyAlert,
}

impl PushEventKind {
    pub const ALL: [PushEventKind; 2] = [PushEventKind::VitalUpdate, PushEventKind::AnomalyAlert];

    pub fn as_str(self) -> &'static str {
        match self {
            PushEventKind::VitalUpdate => "vital_update",
            PushEventKind::AnomalyAlert => "anomaly_alert",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "vital_update" => Some(PushEventKind::VitalUpdate),
            "anomaly_alert" => Some(PushEventKind::AnomalyAlert),
            _ => None,
        }
    }
}

impl fmt::Display for PushEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `vital_update`. Every field is optional: the event itself is the
/// signal, the payload only narrows who it concerns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<PatientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Payload of `anomaly_alert`. `severity` keeps whatever label the server sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyAlert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<PatientId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "label_or_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub severity: Option<String>,
    #[serde(default, deserialize_with = "alerts_or_empty")]
    pub alerts: Vec<Alert>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AnomalyAlert {
    /// Severity when the label is one the dashboard knows.
    pub fn severity(&self) -> Option<Severity> {
        self.severity.as_deref().and_then(Severity::from_name)
    }

    /// Human label used for desktop notifications, e.g. `Jane Doe - CRITICAL`.
    pub fn headline(&self) -> String {
        let who = self
            .patient_name
            .as_deref()
            .or(self.patient_id.as_deref())
            .unwrap_or("Unknown patient");
        let level = self
            .severity
            .as_deref()
            .map_or_else(|| "ALERT".to_string(), str::to_uppercase);
        format!("{who} - {level}")
    }
}

fn label_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

fn alerts_or_empty<'de, D>(deserializer: D) -> Result<Vec<Alert>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A push notification from the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    VitalUpdate(VitalUpdate),
    AnomalyAlert(AnomalyAlert),
}

impl PushEvent {
    /// Decode a named event. Names outside the catalog return `None`; catalog
    /// events are always produced, with an empty payload when the body is not an
    /// object.
    pub fn decode(name: &str, payload: serde_json::Value) -> Option<Self> {
        let kind = PushEventKind::from_name(name)?;
        Some(match kind {
            PushEventKind::VitalUpdate => {
                PushEvent::VitalUpdate(serde_json::from_value(payload).unwrap_or_default())
            }
            PushEventKind::AnomalyAlert => {
                PushEvent::AnomalyAlert(serde_json::from_value(payload).unwrap_or_default())
            }
        })
    }

    pub fn kind(&self) -> PushEventKind {
        match self {
            PushEvent::VitalUpdate(_) => PushEventKind::VitalUpdate,
            PushEvent::AnomalyAlert(_) => PushEventKind::AnomalyAlert,
        }
    }

    pub fn patient_id(&self) -> Option<&str> {
        match self {
            PushEvent::VitalUpdate(update) => update.patient_id.as_deref(),
            PushEvent::AnomalyAlert(alert) => alert.patient_id.as_deref(),
        }
    }
}
