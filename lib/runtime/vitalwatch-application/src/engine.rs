//! Refresh engine shared by the dashboard controller and the patient detail
//! view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use vitalwatch_domain::{Anomaly, PatientId, PushEvent, PushEventKind};
use vitalwatch_ports::{
    GatewayResult, PortSet, PushHandler, PushPort, RemoteGateway, SubscriptionId,
};

use crate::failure::SyncFailure;
use crate::scope::{DashboardScope, PatientScope, SyncScope};
use crate::state::SyncState;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub poll_interval: Duration,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Result of one refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Committed,
    Failed(SyncFailure),
    /// The engine was stopped before the fetch resolved; nothing was written.
    Discarded,
}

impl RefreshOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, RefreshOutcome::Committed)
    }
}

/// A refresh running on its own task.
#[derive(Debug)]
pub struct RefreshHandle(JoinHandle<RefreshOutcome>);

impl RefreshHandle {
    pub async fn settled(self) -> RefreshOutcome {
        match self.0.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(error = %err, "Refresh task did not complete");
                RefreshOutcome::Discarded
            }
        }
    }
}

#[derive(Default)]
struct Lifecycle {
    started: bool,
    stopped: bool,
    poller: Option<JoinHandle<()>>,
    subscriptions: Vec<(PushEventKind, SubscriptionId)>,
}

struct Inner<S: SyncScope> {
    scope: S,
    gateway: Arc<dyn RemoteGateway>,
    push: Arc<dyn PushPort>,
    settings: SyncSettings,
    state: watch::Sender<SyncState<S::Data>>,
    lifecycle: Mutex<Lifecycle>,
    refreshes: AtomicU64,
}

impl<S: SyncScope> Inner<S> {
    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write a fetch result into the state unless the engine was stopped. The
    /// lifecycle lock is held across the write so `stop` cannot interleave.
    fn commit(&self, result: GatewayResult<S::Data>) -> RefreshOutcome {
        let lifecycle = self.lifecycle();
        if lifecycle.stopped {
            debug!(scope = %self.scope.label(), "Dropping refresh result after stop");
            return RefreshOutcome::Discarded;
        }
        match result {
            Ok(data) => {
                self.state.send_modify(|state| state.apply_success(data));
                RefreshOutcome::Committed
            }
            Err(cause) => {
                let failure = SyncFailure::new(self.scope.failure_message(), cause);
                warn!(scope = %self.scope.label(), error = %failure.cause, "Refresh failed");
                self.state
                    .send_modify(|state| state.apply_failure(failure.clone()));
                RefreshOutcome::Failed(failure)
            }
        }
    }

    fn teardown(&self) {
        let (started, poller, subscriptions) = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.stopped {
                return;
            }
            lifecycle.stopped = true;
            (
                lifecycle.started,
                lifecycle.poller.take(),
                std::mem::take(&mut lifecycle.subscriptions),
            )
        };
        if let Some(poller) = poller {
            poller.abort();
        }
        for (kind, id) in subscriptions {
            self.push.off(kind, Some(id));
        }
        if started {
            info!(scope = %self.scope.label(), "Sync stopped");
        }
    }
}

impl<S: SyncScope> Drop for Inner<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Keeps a [`SyncScope`]'s data current from polling and push events.
///
/// Cloning yields another handle to the same engine. Overlapping refreshes are
/// not de-duplicated: whichever fetch resolves last is what readers see, even if
/// it started first.
pub struct SyncEngine<S: SyncScope> {
    inner: Arc<Inner<S>>,
}

impl<S: SyncScope> Clone for SyncEngine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SyncScope> SyncEngine<S> {
    pub fn new(scope: S, ports: &PortSet, settings: SyncSettings) -> Self {
        let (state, _) = watch::channel(SyncState::loading());
        Self {
            inner: Arc::new(Inner {
                scope,
                gateway: Arc::clone(&ports.gateway),
                push: Arc::clone(&ports.push),
                settings,
                state,
                lifecycle: Mutex::new(Lifecycle::default()),
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    pub fn scope(&self) -> &S {
        &self.inner.scope
    }

    /// Subscribe to push events, start the polling timer and kick off the
    /// initial refresh. Must be called from within a tokio runtime. Calling it
    /// again, or after `stop`, does nothing.
    pub fn start(&self) {
        let runtime = Handle::current();
        {
            let mut lifecycle = self.inner.lifecycle();
            if lifecycle.started || lifecycle.stopped {
                debug!(scope = %self.inner.scope.label(), "Sync already started");
                return;
            }
            lifecycle.started = true;

            for kind in PushEventKind::ALL {
                let id = self.inner.push.on(kind, self.push_handler(runtime.clone()));
                lifecycle.subscriptions.push((kind, id));
            }

            let period = self.inner.settings.poll_interval;
            lifecycle.poller = Some(runtime.spawn(poll_loop(Arc::downgrade(&self.inner), period)));
        }
        info!(
            scope = %self.inner.scope.label(),
            poll_secs = self.inner.settings.poll_interval.as_secs(),
            "Sync started"
        );
        self.spawn_refresh();
    }

    /// Unsubscribe from push events and stop polling. Fetches already in flight
    /// finish, but their results are discarded.
    pub fn stop(&self) {
        self.inner.teardown();
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.lifecycle().stopped
    }

    /// Fetch the scope's data and commit it. The first call resolves the
    /// loading state; later failures keep the last good data.
    pub async fn refresh(&self) -> RefreshOutcome {
        let seq = self.inner.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();
        let result = self.inner.scope.fetch(self.inner.gateway.as_ref()).await;
        let outcome = self.inner.commit(result);
        debug!(
            scope = %self.inner.scope.label(),
            seq,
            elapsed_ms = started.elapsed().as_millis() as u64,
            committed = outcome.is_committed(),
            "Refresh settled"
        );
        outcome
    }

    /// Run `refresh` on a new task. Must be called from within a tokio runtime.
    pub fn spawn_refresh(&self) -> RefreshHandle {
        self.spawn_refresh_on(&Handle::current())
    }

    fn spawn_refresh_on(&self, runtime: &Handle) -> RefreshHandle {
        let engine = self.clone();
        RefreshHandle(runtime.spawn(async move { engine.refresh().await }))
    }

    fn push_handler(&self, runtime: Handle) -> PushHandler {
        let inner = Arc::downgrade(&self.inner);
        Arc::new(move |event: &PushEvent| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if !inner.scope.accepts(event) {
                return;
            }
            debug!(
                scope = %inner.scope.label(),
                event = %event.kind(),
                patient_id = event.patient_id(),
                "Push event, refreshing"
            );
            SyncEngine { inner }.spawn_refresh_on(&runtime);
        })
    }

    pub fn state(&self) -> SyncState<S::Data> {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncState<S::Data>> {
        self.inner.state.subscribe()
    }

    /// Number of refreshes started so far, from any trigger.
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::Relaxed)
    }

    pub fn select(&self, patient_id: impl Into<PatientId>) {
        let patient_id = patient_id.into();
        let lifecycle = self.inner.lifecycle();
        if lifecycle.stopped {
            return;
        }
        self.inner
            .state
            .send_modify(|state| state.selected = Some(patient_id));
    }

    pub fn clear_selection(&self) {
        let lifecycle = self.inner.lifecycle();
        if lifecycle.stopped {
            return;
        }
        self.inner
            .state
            .send_if_modified(|state| state.selected.take().is_some());
    }
}

async fn poll_loop<S: SyncScope>(inner: Weak<Inner<S>>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        debug!(scope = %inner.scope.label(), "Polling refresh");
        SyncEngine { inner }.spawn_refresh();
    }
}

impl SyncEngine<DashboardScope> {
    pub fn dashboard(ports: &PortSet, settings: SyncSettings) -> Self {
        Self::new(DashboardScope, ports, settings)
    }

    /// Unacknowledged anomalies for one patient from the current index.
    pub fn active_for(&self, patient_id: &str) -> Vec<Anomaly> {
        self.inner
            .state
            .borrow()
            .data
            .as_ref()
            .map(|snapshot| snapshot.active_for(patient_id).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn all_for(&self, patient_id: &str) -> Vec<Anomaly> {
        self.inner
            .state
            .borrow()
            .data
            .as_ref()
            .map(|snapshot| snapshot.all_for(patient_id).to_vec())
            .unwrap_or_default()
    }
}

impl SyncEngine<PatientScope> {
    pub fn patient(
        patient_id: impl Into<PatientId>,
        history_hours: u32,
        ports: &PortSet,
        settings: SyncSettings,
    ) -> Self {
        Self::new(PatientScope::new(patient_id, history_hours), ports, settings)
    }

    pub fn patient_id(&self) -> &str {
        self.inner.scope.patient_id()
    }

    pub fn active_anomalies(&self) -> Vec<Anomaly> {
        self.inner
            .state
            .borrow()
            .data
            .as_ref()
            .map(|snapshot| snapshot.active_anomalies().into_iter().cloned().collect())
            .unwrap_or_default()
    }
}
