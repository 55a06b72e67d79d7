//! Acknowledging an anomaly and resynchronising the view that showed it.

use std::sync::Arc;

use tracing::{error, info};

use vitalwatch_domain::DEFAULT_ACKNOWLEDGED_BY;
use vitalwatch_ports::{GatewayError, RemoteGateway};

use crate::engine::{RefreshHandle, SyncEngine};
use crate::scope::SyncScope;

/// The view an acknowledgment refreshes afterwards.
pub trait RefreshTarget: Send + Sync {
    fn spawn_refresh(&self) -> RefreshHandle;

    fn clear_selection(&self);
}

impl<S: SyncScope> RefreshTarget for SyncEngine<S> {
    fn spawn_refresh(&self) -> RefreshHandle {
        SyncEngine::spawn_refresh(self)
    }

    fn clear_selection(&self) {
        SyncEngine::clear_selection(self);
    }
}

#[derive(Debug)]
pub enum AckOutcome {
    /// The backend accepted the acknowledgment. The refresh it triggered runs
    /// in the background; its handle is returned but need not be awaited.
    Submitted(RefreshHandle),
    /// The backend rejected the request. Local state was not touched.
    Rejected(GatewayError),
}

impl AckOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, AckOutcome::Submitted(_))
    }
}

/// Submits acknowledgments on behalf of one operator.
///
/// Nothing is changed locally before the backend confirms: the acknowledged
/// flag only appears once the follow-up refresh brings it back.
pub struct AcknowledgmentWorkflow<T> {
    gateway: Arc<dyn RemoteGateway>,
    target: T,
    acknowledged_by: String,
}

impl<T: RefreshTarget> AcknowledgmentWorkflow<T> {
    pub fn new(gateway: Arc<dyn RemoteGateway>, target: T) -> Self {
        Self {
            gateway,
            target,
            acknowledged_by: DEFAULT_ACKNOWLEDGED_BY.to_string(),
        }
    }

    pub fn acknowledged_by(mut self, actor: impl Into<String>) -> Self {
        self.acknowledged_by = actor.into();
        self
    }

    pub fn actor(&self) -> &str {
        &self.acknowledged_by
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub async fn acknowledge(&self, anomaly_id: &str) -> AckOutcome {
        match self
            .gateway
            .submit_acknowledgment(anomaly_id, &self.acknowledged_by)
            .await
        {
            Ok(()) => {
                info!(anomaly_id, by = %self.acknowledged_by, "Anomaly acknowledged");
                let refresh = self.target.spawn_refresh();
                self.target.clear_selection();
                AckOutcome::Submitted(refresh)
            }
            Err(err) => {
                error!(anomaly_id, error = %err, "Failed to acknowledge anomaly");
                AckOutcome::Rejected(err)
            }
        }
    }
}
