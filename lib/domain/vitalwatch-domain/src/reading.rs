use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::patient::PatientId;

/// Systolic/diastolic pair. Travels as `"120/80"` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BloodPressure {
    pub systolic: u16,
    pub diastolic: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid blood pressure `{0}`, expected `systolic/diastolic`")]
pub struct ParsePressureError(String);

impl FromStr for BloodPressure {
    type Err = ParsePressureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ParsePressureError(raw.to_string());
        let (systolic, diastolic) = raw.split_once('/').ok_or_else(invalid)?;
        Ok(Self {
            systolic: systolic.trim().parse().map_err(|_| invalid())?,
            diastolic: diastolic.trim().parse().map_err(|_| invalid())?,
        })
    }
}

impl fmt::Display for BloodPressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.systolic, self.diastolic)
    }
}

impl Serialize for BloodPressure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BloodPressure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Sensors occasionally send garbage in `bloodPressure`; drop it instead of
/// failing the whole summary.
fn lenient_pressure<'de, D>(deserializer: D) -> Result<Option<BloodPressure>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|text| text.parse().ok()))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<f64>,
}

/// Legacy nested vitals block kept for older records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedVitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<PressureParts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One vital-sign sample ("HealthRecord") for a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(rename = "_id")]
    pub id: String,
    pub patient_id: PatientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_pressure",
        skip_serializing_if = "Option::is_none"
    )]
    pub blood_pressure: Option<BloodPressure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motion_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fall_risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals: Option<NestedVitals>,
}

impl Reading {
    pub fn heart_rate(&self) -> Option<f64> {
        self.heart_rate
            .or_else(|| self.vitals.as_ref().and_then(|v| v.heart_rate))
    }

    pub fn spo2(&self) -> Option<f64> {
        self.spo2.or_else(|| self.vitals.as_ref().and_then(|v| v.spo2))
    }

    pub fn temperature(&self) -> Option<f64> {
        self.body_temperature.or_else(|| {
            self.vitals
                .as_ref()
                .and_then(|v| v.body_temperature.or(v.temperature))
        })
    }

    pub fn blood_pressure(&self) -> Option<BloodPressure> {
        if self.blood_pressure.is_some() {
            return self.blood_pressure;
        }
        let parts = self.vitals.as_ref()?.blood_pressure.as_ref()?;
        Some(BloodPressure {
            systolic: parts.systolic?.round() as u16,
            diastolic: parts.diastolic?.round() as u16,
        })
    }
}
