//! Per-event handler table shared by push sources.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use tracing::debug;
use vitalwatch_domain::{PushEvent, PushEventKind};

use crate::{PushHandler, PushPort, SubscriptionId};

/// Handlers keyed by event name. Each `on` call gets its own id, so two
/// subscribers to the same event can be removed independently.
#[derive(Default)]
pub struct SubscriptionRegistry {
    handlers: RwLock<HashMap<PushEventKind, Vec<(SubscriptionId, PushHandler)>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoke every handler registered for the event's kind and return how many
    /// ran. Handlers are called outside the lock so they may subscribe or
    /// unsubscribe themselves.
    pub fn emit(&self, event: &PushEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<PushHandler> = {
            let table = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
            table
                .get(&kind)
                .map(|list| list.iter().map(|(_, handler)| handler.clone()).collect())
                .unwrap_or_default()
        };
        debug!(event = %kind, subscribers = handlers.len(), "Dispatching push event");
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn subscriber_count(&self, kind: PushEventKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    pub fn clear(&self) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl PushPort for SubscriptionRegistry {
    fn on(&self, kind: PushEventKind, handler: PushHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push((id, handler));
        id
    }

    fn off(&self, kind: PushEventKind, id: Option<SubscriptionId>) {
        let mut table = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        match id {
            Some(id) => {
                if let Some(list) = table.get_mut(&kind) {
                    list.retain(|(existing, _)| *existing != id);
                    if list.is_empty() {
                        table.remove(&kind);
                    }
                }
            }
            None => {
                table.remove(&kind);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    fn vital(patient: &str) -> PushEvent {
        PushEvent::decode("vital_update", json!({ "patientId": patient })).unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, PushHandler) {
        let hits = Arc::new(AtomicUsize::new(0));
        let clone = hits.clone();
        let handler: PushHandler = Arc::new(move |_event: &PushEvent| {
            clone.fetch_add(1, Ordering::SeqCst);
        });
        (hits, handler)
    }

    #[test]
    fn removing_one_subscription_keeps_the_other() {
        let registry = SubscriptionRegistry::new();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();

        let first_id = registry.on(PushEventKind::VitalUpdate, first);
        registry.on(PushEventKind::VitalUpdate, second);
        assert_eq!(registry.subscriber_count(PushEventKind::VitalUpdate), 2);

        registry.off(PushEventKind::VitalUpdate, Some(first_id));
        assert_eq!(registry.emit(&vital("P001")), 1);

        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn off_without_id_drops_every_handler_for_that_event() {
        let registry = SubscriptionRegistry::new();
        let (_, a) = counter();
        let (_, b) = counter();
        let (_, c) = counter();
        registry.on(PushEventKind::VitalUpdate, a);
        registry.on(PushEventKind::VitalUpdate, b);
        registry.on(PushEventKind::AnomalyAlert, c);

        registry.off(PushEventKind::VitalUpdate, None);

        assert_eq!(registry.subscriber_count(PushEventKind::VitalUpdate), 0);
        assert_eq!(registry.subscriber_count(PushEventKind::AnomalyAlert), 1);
    }

    #[test]
    fn events_only_reach_their_own_kind() {
        let registry = SubscriptionRegistry::new();
        let (hits, handler) = counter();
        registry.on(PushEventKind::AnomalyAlert, handler);

        assert_eq!(registry.emit(&vital("P001")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let slot: Arc<std::sync::Mutex<Option<SubscriptionId>>> = Arc::default();
        let handler: PushHandler = {
            let registry = registry.clone();
            let slot = slot.clone();
            Arc::new(move |_event: &PushEvent| {
                if let Some(id) = *slot.lock().unwrap() {
                    registry.off(PushEventKind::VitalUpdate, Some(id));
                }
            })
        };
        let id = registry.on(PushEventKind::VitalUpdate, handler);
        *slot.lock().unwrap() = Some(id);

        assert_eq!(registry.emit(&vital("P001")), 1);
        assert_eq!(registry.subscriber_count(PushEventKind::VitalUpdate), 0);
    }

    #[test]
    fn ids_are_unique() {
        let registry = SubscriptionRegistry::new();
        let (_, a) = counter();
        let (_, b) = counter();
        let first = registry.on(PushEventKind::VitalUpdate, a);
        let second = registry.on(PushEventKind::AnomalyAlert, b);
        assert_ne!(first, second);
    }
}
