use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anomaly::Anomaly;
use crate::patient::PatientId;
use crate::reading::Reading;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounters {
    pub total_patients: u64,
    pub active_anomalies: u64,
    pub critical_count: u64,
    pub warning_count: u64,
}

/// Dashboard-wide snapshot served by `/dashboard/summary`. Replaced wholesale on
/// every successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub summary: SummaryCounters,
    #[serde(default)]
    pub recent_anomalies: Vec<Anomaly>,
    /// One reading per patient, most recent first.
    #[serde(default)]
    pub latest_vitals: Vec<Reading>,
    pub timestamp: DateTime<Utc>,
}

impl Summary {
    /// Patient ids referenced by the latest readings, in reading order, without
    /// duplicates.
    pub fn patient_ids(&self) -> Vec<PatientId> {
        let mut ids: Vec<PatientId> = Vec::with_capacity(self.latest_vitals.len());
        for reading in &self.latest_vitals {
            if !ids.contains(&reading.patient_id) {
                ids.push(reading.patient_id.clone());
            }
        }
        ids
    }

    pub fn has_readings(&self) -> bool {
        !self.latest_vitals.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary(patients: &[&str]) -> Summary {
        let vitals: Vec<_> = patients
            .iter()
            .enumerate()
            .map(|(i, id)| {
                json!({ "_id": format!("r{i}"), "patientId": id, "recordedAt": "2024-03-01T08:00:00Z" })
            })
            .collect();
        serde_json::from_value(json!({
            "summary": { "totalPatients": 2, "activeAnomalies": 0, "criticalCount": 0, "warningCount": 0 },
            "latestVitals": vitals,
            "timestamp": "2024-03-01T08:00:00Z",
        }))
        .unwrap()
    }

    #[test]
    fn patient_ids_are_distinct_in_reading_order() {
        let summary = summary(&["P002", "P001", "P002", "P003", "P001"]);
        assert_eq!(summary.patient_ids(), vec!["P002", "P001", "P003"]);
    }

    #[test]
    fn no_readings_means_no_patients() {
        let summary = summary(&[]);
        assert!(!summary.has_readings());
        assert!(summary.patient_ids().is_empty());
    }
}
