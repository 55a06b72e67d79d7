//! Keeps dashboard and patient views in sync with the monitoring backend.

mod acknowledge;
mod alerts;
mod engine;
mod failure;
mod scope;
mod state;

pub use acknowledge::{AckOutcome, AcknowledgmentWorkflow, RefreshTarget};
pub use alerts::AlertRelay;
pub use engine::{
    DEFAULT_POLL_INTERVAL, RefreshHandle, RefreshOutcome, SyncEngine, SyncSettings,
};
pub use failure::SyncFailure;
pub use scope::{
    DASHBOARD_FAILURE, DashboardScope, PATIENT_FAILURE, PatientScope, SyncScope, build_index,
};
pub use state::{SyncPhase, SyncState};

/// Dashboard-wide summary and anomaly index.
pub type SyncController = SyncEngine<DashboardScope>;

/// A single patient's profile, history and anomalies.
pub type EntityDetailSync = SyncEngine<PatientScope>;
