//! Domain models and invariants.

pub mod anomaly;
pub mod audit;
pub mod config;
pub mod events;
pub mod index;
pub mod notification;
pub mod patient;
pub mod reading;
pub mod snapshot;
pub mod summary;

pub use anomaly::{Alert, Anomaly, AnomalyId, Severity};
pub use audit::{AlertLog, HealthCheck};
pub use config::{ConfigError, DEFAULT_ACKNOWLEDGED_BY, ReconnectConfig, WatchConfig};
pub use events::{AnomalyAlert, PushEvent, PushEventKind, VitalUpdate};
pub use index::{AnomalyCounts, AnomalyIndex};
pub use notification::Notification;
pub use patient::{AlertThresholds, BaselineVitals, PatientId, PatientProfile, VitalRange};
pub use reading::{BloodPressure, NestedVitals, Reading};
pub use snapshot::{DashboardSnapshot, PatientSnapshot};
pub use summary::{Summary, SummaryCounters};
