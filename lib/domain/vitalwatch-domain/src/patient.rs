use serde::{Deserialize, Serialize};

pub type PatientId = String;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VitalRange {
    pub min: f64,
    pub max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normal: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaselineVitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr: Option<VitalRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic: Option<VitalRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<VitalRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<VitalRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<VitalRange>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertThresholds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_critical: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_critical: Option<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2_critical: Option<f64>,
}

/// Patient profile as served by `/patients/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub patient_id: PatientId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub risk_factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baseline_vitals: Option<BaselineVitals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_thresholds: Option<AlertThresholds>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}
