//! Consent lifecycle manager.
//!
//! Creates, reads and deletes consents and drives the status state
//! machine. The dedup-then-insert of creation and the
//! update-then-supersede of status changes run as single store
//! transactions; audit events are emitted only after commit.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::{
    api::types::{LifecycleRequest, LifecycleResponse},
    core::filter::AttributeFilter,
    error::ConsentError,
    infrastructure::audit::{AuditEvent, Auditer},
    infrastructure::model::{Consent, ConsentStatus},
    infrastructure::registry::UserDirectory,
    infrastructure::store::ConsentStore,
};

/// Consent lifecycle manager service.
#[derive(Debug, Clone)]
pub struct LifecycleService {
    store: ConsentStore,
    filter: AttributeFilter,
    users: UserDirectory,
    auditer: Auditer,
    /// Actor identity stamped into audit metadata
    principal: String,
}

impl LifecycleService {
    pub fn new(
        store: ConsentStore,
        filter: AttributeFilter,
        users: UserDirectory,
        auditer: Auditer,
        principal: &str,
    ) -> Self {
        Self { store, filter, users, auditer, principal: principal.to_string() }
    }

    fn create_consent(
        &self,
        id: Option<i32>,
        user_id: i32,
        consent_hub_id: i32,
    ) -> Result<Consent, ConsentError> {
        self.users.require(user_id)?;
        let hub = self.store.hub_by_id(consent_hub_id)?;

        // Snapshot of the eligible attributes at creation time
        let attributes = self.filter.eligible_attributes(user_id, &hub);

        let (created, replaced) =
            self.store.create_consent(id, user_id, consent_hub_id, attributes, &self.principal)?;
        if let Some(old) = replaced {
            self.auditer.log(AuditEvent::ConsentDeleted(old));
        }
        self.auditer.log(AuditEvent::ConsentCreated(created.clone()));
        Ok(created)
    }

    fn delete_consent(&self, consent_id: i32) -> Result<(), ConsentError> {
        let deleted = self.store.delete_consent(consent_id)?;
        self.auditer.log(AuditEvent::ConsentDeleted(deleted));
        Ok(())
    }

    fn change_status(
        &self,
        consent_id: i32,
        status: ConsentStatus,
    ) -> Result<Consent, ConsentError> {
        let (updated, superseded) = self.store.change_status(consent_id, status, &self.principal)?;
        for consent in superseded {
            self.auditer.log(AuditEvent::ConsentDeleted(consent));
        }
        self.auditer.log(AuditEvent::ChangedConsentStatus(updated.clone()));
        Ok(updated)
    }
}

impl Service<LifecycleRequest> for LifecycleService {
    type Response = LifecycleResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: LifecycleRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                LifecycleRequest::CreateConsent { id, user_id, consent_hub_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle-{}] CreateConsent: user: {}, hub: {}",
                        this.principal, user_id, consent_hub_id
                    );
                    this.create_consent(id, user_id, consent_hub_id)
                        .map(LifecycleResponse::Consent)
                }
                LifecycleRequest::DeleteConsent { consent_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle-{}] DeleteConsent: id: {}", this.principal, consent_id);
                    this.delete_consent(consent_id).map(|_| LifecycleResponse::Ack)
                }
                LifecycleRequest::ChangeConsentStatus { consent_id, status } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle-{}] ChangeConsentStatus: id: {}, status: {}",
                        this.principal, consent_id, status
                    );
                    this.change_status(consent_id, status).map(LifecycleResponse::Consent)
                }
                LifecycleRequest::GetConsent { consent_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle-{}] GetConsent: id: {}", this.principal, consent_id);
                    this.store.consent_by_id(consent_id).map(LifecycleResponse::Consent)
                }
                LifecycleRequest::GetAllConsents => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[lifecycle-{}] GetAllConsents", this.principal);
                    this.store.all_consents().map(LifecycleResponse::Consents)
                }
                LifecycleRequest::GetConsentsForUser { user_id, status } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle-{}] GetConsentsForUser: user: {}, status: {:?}",
                        this.principal, user_id, status
                    );
                    this.store.consents_for_user(user_id, status).map(LifecycleResponse::Consents)
                }
                LifecycleRequest::GetConsentsForConsentHub { consent_hub_id, status } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle-{}] GetConsentsForConsentHub: hub: {}, status: {:?}",
                        this.principal, consent_hub_id, status
                    );
                    this.store
                        .consents_for_hub(consent_hub_id, status)
                        .map(LifecycleResponse::Consents)
                }
                LifecycleRequest::GetConsentForUserAndConsentHub {
                    user_id,
                    consent_hub_id,
                    status,
                } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[lifecycle-{}] GetConsentForUserAndConsentHub: user: {}, hub: {}, status: {}",
                        this.principal, user_id, consent_hub_id, status
                    );
                    this.store
                        .consent_for_user_and_hub(user_id, consent_hub_id, status)
                        .map(LifecycleResponse::Consent)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::infrastructure::model::User;
    use std::collections::BTreeSet;

    fn service() -> (LifecycleService, ConsentStore, Auditer) {
        let store = ConsentStore::default();
        let users = UserDirectory::default();
        let auditer = Auditer::default();
        users.register(User::new(1, "alice"));
        store.create_hub(Some(1), "hub".to_string(), true, &BTreeSet::from([1]), "test").unwrap();
        let service = LifecycleService::new(
            store.clone(),
            AttributeFilter::default(),
            users,
            auditer.clone(),
            "test",
        );
        (service, store, auditer)
    }

    #[tokio::test]
    async fn unit_lifecycle_create_requires_known_user() {
        let (mut service, _, _) = service();
        let result = service
            .call(LifecycleRequest::CreateConsent { id: None, user_id: 9, consent_hub_id: 1 })
            .await;
        assert_eq!(result.unwrap_err(), ConsentError::UserNotFound(9));
    }

    #[tokio::test]
    async fn unit_lifecycle_create_requires_known_hub() {
        let (mut service, _, _) = service();
        let result = service
            .call(LifecycleRequest::CreateConsent { id: None, user_id: 1, consent_hub_id: 9 })
            .await;
        assert!(matches!(result.unwrap_err(), ConsentError::ConsentHubNotFound(_)));
    }

    #[tokio::test]
    async fn unit_lifecycle_replacement_audit_order() {
        let (mut service, _, auditer) = service();
        service
            .call(LifecycleRequest::CreateConsent { id: None, user_id: 1, consent_hub_id: 1 })
            .await
            .unwrap();
        service
            .call(LifecycleRequest::CreateConsent { id: None, user_id: 1, consent_hub_id: 1 })
            .await
            .unwrap();

        let entries = auditer.entries();
        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], AuditEvent::ConsentCreated(_)));
        // The replaced consent is deleted before the new one is reported
        assert!(matches!(entries[1], AuditEvent::ConsentDeleted(_)));
        assert!(matches!(entries[2], AuditEvent::ConsentCreated(_)));
    }

    #[tokio::test]
    async fn unit_lifecycle_delete_unknown_consent() {
        let (mut service, _, _) = service();
        let result = service.call(LifecycleRequest::DeleteConsent { consent_id: 9 }).await;
        assert!(matches!(result.unwrap_err(), ConsentError::ConsentNotFound(_)));
    }

    #[tokio::test]
    async fn unit_lifecycle_status_change_emits_event() {
        let (mut service, _, auditer) = service();
        let LifecycleResponse::Consent(consent) = service
            .call(LifecycleRequest::CreateConsent { id: None, user_id: 1, consent_hub_id: 1 })
            .await
            .unwrap()
        else {
            panic!("expected consent");
        };

        let LifecycleResponse::Consent(updated) = service
            .call(LifecycleRequest::ChangeConsentStatus {
                consent_id: consent.id,
                status: ConsentStatus::Granted,
            })
            .await
            .unwrap()
        else {
            panic!("expected consent");
        };
        assert_eq!(updated.status, ConsentStatus::Granted);
        assert!(matches!(
            auditer.entries().last(),
            Some(AuditEvent::ChangedConsentStatus(c)) if c.id == consent.id
        ));
    }
}
