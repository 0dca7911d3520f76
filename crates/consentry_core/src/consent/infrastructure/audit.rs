//! Append-only audit sink.
//!
//! Every successful lifecycle mutation publishes a typed event here
//! after its store transaction has committed. The sink keeps the events
//! in arrival order and fans them out on a broadcast channel for live
//! observers.

use std::{
    fmt::Display,
    sync::{Arc, Mutex},
};

use tokio::sync::broadcast;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::infrastructure::model::{Consent, ConsentHub};

const AUDIT_FEED_CAPACITY: usize = 256;

/// Typed audit events emitted by the consent engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    ConsentCreated(Consent),
    ConsentDeleted(Consent),
    ChangedConsentStatus(Consent),
    ConsentHubCreated(ConsentHub),
    ConsentHubDeleted(ConsentHub),
}

impl Display for AuditEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditEvent::ConsentCreated(consent) => write!(f, "ConsentCreated: {consent}"),
            AuditEvent::ConsentDeleted(consent) => write!(f, "ConsentDeleted: {consent}"),
            AuditEvent::ChangedConsentStatus(consent) => {
                write!(f, "ChangedConsentStatus: {consent}")
            }
            AuditEvent::ConsentHubCreated(hub) => write!(f, "ConsentHubCreated: {hub}"),
            AuditEvent::ConsentHubDeleted(hub) => write!(f, "ConsentHubDeleted: {hub}"),
        }
    }
}

/// Shared handle to the audit log.
#[derive(Debug, Clone)]
pub struct Auditer {
    entries: Arc<Mutex<Vec<AuditEvent>>>,
    feed: broadcast::Sender<AuditEvent>,
}

impl Default for Auditer {
    fn default() -> Self {
        let (feed, _) = broadcast::channel(AUDIT_FEED_CAPACITY);
        Self { entries: Arc::new(Mutex::new(Vec::new())), feed }
    }
}

impl Auditer {
    /// Append an event to the log and notify subscribers.
    pub fn log(&self, event: AuditEvent) {
        #[cfg(feature = "consentry_tracing")]
        info!("[audit] {event}");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(event.clone());
        }
        // Ignore send errors, there may be no live subscriber
        let _ = self.feed.send(event);
    }

    /// Snapshot of all events in arrival order.
    pub fn entries(&self) -> Vec<AuditEvent> {
        self.entries.lock().map(|entries| entries.clone()).unwrap_or_default()
    }

    /// Subscribe to the live event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<AuditEvent> {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::infrastructure::model::{AuditStamp, ConsentStatus};
    use std::collections::HashSet;

    fn consent(id: i32) -> Consent {
        Consent {
            id,
            user_id: 1,
            consent_hub_id: 1,
            status: ConsentStatus::Unsigned,
            attributes: HashSet::new(),
            audit: AuditStamp::new(0, "test"),
        }
    }

    #[test]
    fn unit_audit_preserves_order() {
        let auditer = Auditer::default();
        auditer.log(AuditEvent::ConsentCreated(consent(1)));
        auditer.log(AuditEvent::ConsentDeleted(consent(1)));
        auditer.log(AuditEvent::ConsentCreated(consent(2)));

        let entries = auditer.entries();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], AuditEvent::ConsentCreated(ref c) if c.id == 1));
        assert!(matches!(entries[1], AuditEvent::ConsentDeleted(ref c) if c.id == 1));
        assert!(matches!(entries[2], AuditEvent::ConsentCreated(ref c) if c.id == 2));
    }

    #[tokio::test]
    async fn unit_audit_feed_delivers_events() {
        let auditer = Auditer::default();
        let mut feed = auditer.subscribe();
        auditer.log(AuditEvent::ConsentCreated(consent(1)));

        let event = feed.recv().await.unwrap();
        assert_eq!(event, AuditEvent::ConsentCreated(consent(1)));
    }
}
