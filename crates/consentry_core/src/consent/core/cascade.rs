//! Cascade coordination for consent hub removal.
//!
//! Explicit hub deletion and the implicit last-facility-removed path
//! both end here: the store executes the cascade in one transaction and
//! the coordinator publishes the resulting audit events after commit.

use crate::consent::{
    error::ConsentError,
    infrastructure::audit::{AuditEvent, Auditer},
    infrastructure::model::ConsentHub,
    infrastructure::store::{CascadeOutcome, ConsentStore},
};

#[derive(Debug, Clone)]
pub struct CascadeCoordinator {
    store: ConsentStore,
    auditer: Auditer,
}

impl CascadeCoordinator {
    pub fn new(store: ConsentStore, auditer: Auditer) -> Self {
        Self { store, auditer }
    }

    /// Delete a hub with all its consents and facility associations.
    ///
    /// Fails with `ConsentHubAlreadyRemoved` (and no writes) when the
    /// hub row no longer exists.
    pub fn delete_hub(&self, consent_hub_id: i32) -> Result<ConsentHub, ConsentError> {
        let outcome = self.store.delete_hub_cascade(consent_hub_id)?;
        self.publish(&outcome);
        Ok(outcome.hub)
    }

    /// Publish the audit trail of a committed cascade: one deletion
    /// event per consent, then the hub deletion itself.
    pub(crate) fn publish(&self, outcome: &CascadeOutcome) {
        for consent in &outcome.consents {
            self.auditer.log(AuditEvent::ConsentDeleted(consent.clone()));
        }
        self.auditer.log(AuditEvent::ConsentHubDeleted(outcome.hub.clone()));
    }
}
