//! Patient id to anomaly list mapping rebuilt on every dashboard refresh.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::anomaly::{Anomaly, Severity};
use crate::patient::PatientId;

/// Counters derived from the active subset of an [`AnomalyIndex`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyCounts {
    pub active: usize,
    pub critical: usize,
    pub warning: usize,
}

/// Anomaly lists keyed by patient id.
///
/// Only the full lists are stored. The active subset is filtered on every read so
/// it can never drift from the `acknowledged` flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnomalyIndex {
    entries: BTreeMap<PatientId, Vec<Anomaly>>,
}

impl AnomalyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from fetched `(patient, anomalies)` pairs. A later pair for
    /// the same patient replaces an earlier one.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (PatientId, Vec<Anomaly>)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Every anomaly known for `patient_id`, in server order. Unknown ids yield an
    /// empty slice.
    pub fn all_for(&self, patient_id: &str) -> &[Anomaly] {
        self.entries
            .get(patient_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Unacknowledged anomalies for `patient_id`, in server order.
    pub fn active_for(&self, patient_id: &str) -> Vec<&Anomaly> {
        self.all_for(patient_id)
            .iter()
            .filter(|anomaly| anomaly.is_active())
            .collect()
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.entries.contains_key(patient_id)
    }

    pub fn patient_ids(&self) -> impl Iterator<Item = &PatientId> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find(&self, anomaly_id: &str) -> Option<&Anomaly> {
        self.entries
            .values()
            .flat_map(|list| list.iter())
            .find(|anomaly| anomaly.id == anomaly_id)
    }

    pub fn counts(&self) -> AnomalyCounts {
        let mut counts = AnomalyCounts::default();
        for anomaly in self.entries.values().flatten().filter(|a| a.is_active()) {
            counts.active += 1;
            match anomaly.severity {
                Severity::Critical => counts.critical += 1,
                Severity::Warning => counts.warning += 1,
                Severity::Normal => {}
            }
        }
        counts
    }
}
