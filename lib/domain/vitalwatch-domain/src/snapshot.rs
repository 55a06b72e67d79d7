use serde::{Deserialize, Serialize};

use crate::anomaly::Anomaly;
use crate::index::{AnomalyCounts, AnomalyIndex};
use crate::patient::PatientProfile;
use crate::reading::Reading;
use crate::summary::Summary;

/// Summary and anomaly index committed together by one dashboard refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub summary: Summary,
    pub index: AnomalyIndex,
}

impl DashboardSnapshot {
    pub fn new(summary: Summary, index: AnomalyIndex) -> Self {
        Self { summary, index }
    }

    /// Counters recomputed from the index, as opposed to the server-reported ones
    /// in `summary.summary`.
    pub fn derived_counts(&self) -> AnomalyCounts {
        self.index.counts()
    }

    pub fn active_for(&self, patient_id: &str) -> Vec<&Anomaly> {
        self.index.active_for(patient_id)
    }

    pub fn all_for(&self, patient_id: &str) -> &[Anomaly] {
        self.index.all_for(patient_id)
    }
}

/// Profile, reading history and anomalies for a single patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientSnapshot {
    pub profile: PatientProfile,
    /// Oldest first, exactly as the server returned it.
    pub history: Vec<Reading>,
    pub anomalies: Vec<Anomaly>,
}

impl PatientSnapshot {
    pub fn active_anomalies(&self) -> Vec<&Anomaly> {
        self.anomalies.iter().filter(|a| a.is_active()).collect()
    }

    /// The newest `count` readings, still oldest first.
    pub fn latest(&self, count: usize) -> &[Reading] {
        let start = self.history.len().saturating_sub(count);
        &self.history[start..]
    }

    pub fn latest_reading(&self) -> Option<&Reading> {
        self.history.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn reading(n: i64) -> Reading {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        serde_json::from_value(serde_json::json!({
            "_id": format!("r{n}"),
            "patientId": "P001",
            "heartRate": 70 + n,
            "recordedAt": (base + Duration::minutes(n)).to_rfc3339(),
        }))
        .unwrap()
    }

    fn snapshot(history: Vec<Reading>) -> PatientSnapshot {
        PatientSnapshot {
            profile: serde_json::from_value(serde_json::json!({
                "patientId": "P001",
                "name": "Jane Doe"
            }))
            .unwrap(),
            history,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn latest_is_a_suffix_slice() {
        let snap = snapshot((0..5).map(reading).collect());
        let ids: Vec<&str> = snap.latest(2).iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["r3", "r4"]);
        assert_eq!(snap.latest(10).len(), 5);
        assert_eq!(snap.latest_reading().map(|r| r.id.as_str()), Some("r4"));
    }

    #[test]
    fn latest_on_empty_history() {
        let snap = snapshot(Vec::new());
        assert!(snap.latest(3).is_empty());
        assert!(snap.latest_reading().is_none());
    }
}
