use chrono::{DateTime, Utc};

use vitalwatch_domain::PatientId;

use crate::failure::SyncFailure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Nothing has resolved yet.
    Loading,
    /// Data is available. `error` may still be set by a later failed refresh.
    Ready,
    /// Every refresh so far has failed.
    Error,
}

/// Observable state of a sync engine.
///
/// `loading` is true only until the first refresh resolves. After that, a failed
/// refresh records `error` but keeps the last good `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState<D> {
    pub loading: bool,
    pub data: Option<D>,
    pub error: Option<SyncFailure>,
    pub selected: Option<PatientId>,
    pub last_update: Option<DateTime<Utc>>,
    /// Number of successful commits.
    pub revision: u64,
}

impl<D> SyncState<D> {
    pub fn loading() -> Self {
        Self {
            loading: true,
            data: None,
            error: None,
            selected: None,
            last_update: None,
            revision: 0,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        if self.loading {
            SyncPhase::Loading
        } else if self.data.is_some() {
            SyncPhase::Ready
        } else {
            SyncPhase::Error
        }
    }

    pub(crate) fn apply_success(&mut self, data: D) {
        self.loading = false;
        self.data = Some(data);
        self.error = None;
        self.last_update = Some(Utc::now());
        self.revision += 1;
    }

    pub(crate) fn apply_failure(&mut self, failure: SyncFailure) {
        self.loading = false;
        self.error = Some(failure);
    }
}

impl<D> Default for SyncState<D> {
    fn default() -> Self {
        Self::loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalwatch_ports::GatewayError;

    fn failure() -> SyncFailure {
        SyncFailure::new("Failed to load", GatewayError::Transport("refused".into()))
    }

    #[test]
    fn first_failure_is_error_phase() {
        let mut state = SyncState::<u32>::loading();
        assert_eq!(state.phase(), SyncPhase::Loading);

        state.apply_failure(failure());
        assert_eq!(state.phase(), SyncPhase::Error);
        assert!(!state.loading);
        assert!(state.data.is_none());
    }

    #[test]
    fn later_failure_keeps_data() {
        let mut state = SyncState::loading();
        state.apply_success(7_u32);
        state.apply_failure(failure());

        assert_eq!(state.phase(), SyncPhase::Ready);
        assert_eq!(state.data, Some(7));
        assert!(state.error.is_some());
        assert_eq!(state.revision, 1);

        state.apply_success(8);
        assert!(state.error.is_none());
        assert_eq!(state.revision, 2);
    }
}
