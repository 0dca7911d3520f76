//! Consent hub directory.
//!
//! Owns hub existence and facility membership: explicit hub creation,
//! the implicit hub lifecycle tied to facility registration, facility
//! association management and the last-facility-removed cascade trigger.

use std::{collections::BTreeSet, future::Future, pin::Pin, task::Poll};

use tower::Service;
#[cfg(feature = "consentry_tracing")]
use tracing::info;

use crate::consent::{
    api::types::{DirectoryRequest, DirectoryResponse},
    core::cascade::CascadeCoordinator,
    error::ConsentError,
    infrastructure::audit::{AuditEvent, Auditer},
    infrastructure::model::ConsentHub,
    infrastructure::registry::FacilityDirectory,
    infrastructure::store::ConsentStore,
};

/// Consent hub directory service.
#[derive(Debug, Clone)]
pub struct DirectoryService {
    store: ConsentStore,
    facilities: FacilityDirectory,
    cascade: CascadeCoordinator,
    auditer: Auditer,
    /// Actor identity stamped into audit metadata
    principal: String,
}

impl DirectoryService {
    pub fn new(
        store: ConsentStore,
        facilities: FacilityDirectory,
        cascade: CascadeCoordinator,
        auditer: Auditer,
        principal: &str,
    ) -> Self {
        Self { store, facilities, cascade, auditer, principal: principal.to_string() }
    }

    fn create_consent_hub(
        &self,
        id: Option<i32>,
        name: Option<String>,
        enforce_consents: bool,
        facilities: Vec<i32>,
    ) -> Result<ConsentHub, ConsentError> {
        let Some(first_facility) = facilities.first() else {
            return Err(ConsentError::ConsentHubWithoutFacilities);
        };
        for facility_id in &facilities {
            self.facilities.require(*facility_id)?;
        }
        let name = match name {
            Some(name) => name,
            // Unset name defaults to the first facility's name
            None => self.facilities.require(*first_facility)?.name,
        };

        let facility_set: BTreeSet<i32> = facilities.into_iter().collect();
        let hub =
            self.store.create_hub(id, name, enforce_consents, &facility_set, &self.principal)?;
        self.auditer.log(AuditEvent::ConsentHubCreated(hub.clone()));
        Ok(hub)
    }

    /// Ensure the facility belongs to a hub. Creates an enforcing hub
    /// named after the facility when none owns it yet; idempotent
    /// otherwise.
    fn register_facility(&self, facility_id: i32) -> Result<ConsentHub, ConsentError> {
        let facility = self.facilities.require(facility_id)?;
        match self.store.hub_by_facility(facility_id) {
            Ok(hub) => return Ok(hub),
            Err(ConsentError::ConsentHubNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let facility_set = BTreeSet::from([facility_id]);
        let hub =
            self.store.create_hub(None, facility.name, true, &facility_set, &self.principal)?;
        self.auditer.log(AuditEvent::ConsentHubCreated(hub.clone()));
        Ok(hub)
    }

    fn add_facility(
        &self,
        consent_hub_id: i32,
        facility_id: i32,
    ) -> Result<ConsentHub, ConsentError> {
        self.facilities.require(facility_id)?;
        self.store.add_facility(consent_hub_id, facility_id, &self.principal)
    }

    fn remove_facility(&self, consent_hub_id: i32, facility_id: i32) -> Result<(), ConsentError> {
        let outcome = self.store.remove_facility(consent_hub_id, facility_id, &self.principal)?;
        // Removing the last facility deleted the hub in the same
        // transaction; publish its audit trail
        if let Some(cascade) = outcome.cascade {
            self.cascade.publish(&cascade);
        }
        Ok(())
    }
}

impl Service<DirectoryRequest> for DirectoryService {
    type Response = DirectoryResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: DirectoryRequest) -> Self::Future {
        let this = self.clone();
        Box::pin(async move {
            match request {
                DirectoryRequest::CreateConsentHub { id, name, enforce_consents, facilities } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[directory-{}] CreateConsentHub: name: {:?}, facilities: {:?}",
                        this.principal, name, facilities
                    );
                    this.create_consent_hub(id, name, enforce_consents, facilities)
                        .map(DirectoryResponse::ConsentHub)
                }
                DirectoryRequest::RegisterFacility { facility_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[directory-{}] RegisterFacility: id: {}", this.principal, facility_id);
                    this.register_facility(facility_id).map(DirectoryResponse::ConsentHub)
                }
                DirectoryRequest::GetConsentHubById { consent_hub_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[directory-{}] GetConsentHubById: id: {}", this.principal, consent_hub_id);
                    this.store.hub_by_id(consent_hub_id).map(DirectoryResponse::ConsentHub)
                }
                DirectoryRequest::GetConsentHubByName { name } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[directory-{}] GetConsentHubByName: name: {}", this.principal, name);
                    this.store.hub_by_name(&name).map(DirectoryResponse::ConsentHub)
                }
                DirectoryRequest::GetConsentHubByFacility { facility_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[directory-{}] GetConsentHubByFacility: facility: {}",
                        this.principal, facility_id
                    );
                    this.store.hub_by_facility(facility_id).map(DirectoryResponse::ConsentHub)
                }
                DirectoryRequest::GetAllConsentHubs => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[directory-{}] GetAllConsentHubs", this.principal);
                    this.store.all_hubs().map(DirectoryResponse::ConsentHubs)
                }
                DirectoryRequest::AddFacility { consent_hub_id, facility_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[directory-{}] AddFacility: hub: {}, facility: {}",
                        this.principal, consent_hub_id, facility_id
                    );
                    this.add_facility(consent_hub_id, facility_id)
                        .map(DirectoryResponse::ConsentHub)
                }
                DirectoryRequest::RemoveFacility { consent_hub_id, facility_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!(
                        "[directory-{}] RemoveFacility: hub: {}, facility: {}",
                        this.principal, consent_hub_id, facility_id
                    );
                    this.remove_facility(consent_hub_id, facility_id)
                        .map(|_| DirectoryResponse::Ack)
                }
                DirectoryRequest::DeleteConsentHub { consent_hub_id } => {
                    #[cfg(feature = "consentry_tracing")]
                    info!("[directory-{}] DeleteConsentHub: id: {}", this.principal, consent_hub_id);
                    this.cascade.delete_hub(consent_hub_id).map(|_| DirectoryResponse::Ack)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consent::infrastructure::model::Facility;

    fn service() -> (DirectoryService, ConsentStore, Auditer) {
        let store = ConsentStore::default();
        let facilities = FacilityDirectory::default();
        let auditer = Auditer::default();
        facilities.register(Facility::new(1, "storage-cluster"));
        facilities.register(Facility::new(2, "web-portal"));
        let cascade = CascadeCoordinator::new(store.clone(), auditer.clone());
        let service =
            DirectoryService::new(store.clone(), facilities, cascade, auditer.clone(), "test");
        (service, store, auditer)
    }

    #[tokio::test]
    async fn unit_directory_hub_name_defaults_to_first_facility() {
        let (mut service, _, _) = service();
        let DirectoryResponse::ConsentHub(hub) = service
            .call(DirectoryRequest::CreateConsentHub {
                id: None,
                name: None,
                enforce_consents: true,
                facilities: vec![1, 2],
            })
            .await
            .unwrap()
        else {
            panic!("expected hub");
        };
        assert_eq!(hub.name, "storage-cluster");
        assert_eq!(hub.facilities, BTreeSet::from([1, 2]));
    }

    #[tokio::test]
    async fn unit_directory_rejects_unknown_facility() {
        let (mut service, _, _) = service();
        let result = service
            .call(DirectoryRequest::CreateConsentHub {
                id: None,
                name: None,
                enforce_consents: true,
                facilities: vec![9],
            })
            .await;
        assert_eq!(result.unwrap_err(), ConsentError::FacilityNotFound(9));
    }

    #[tokio::test]
    async fn unit_directory_register_facility_idempotent() {
        let (mut service, _, auditer) = service();
        let DirectoryResponse::ConsentHub(hub) =
            service.call(DirectoryRequest::RegisterFacility { facility_id: 1 }).await.unwrap()
        else {
            panic!("expected hub");
        };
        assert_eq!(hub.name, "storage-cluster");
        assert!(hub.enforce_consents);

        let DirectoryResponse::ConsentHub(again) =
            service.call(DirectoryRequest::RegisterFacility { facility_id: 1 }).await.unwrap()
        else {
            panic!("expected hub");
        };
        assert_eq!(again.id, hub.id);
        // Only one creation event was emitted
        assert_eq!(
            auditer
                .entries()
                .iter()
                .filter(|event| matches!(event, AuditEvent::ConsentHubCreated(_)))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn unit_directory_remove_last_facility_deletes_hub() {
        let (mut service, store, _) = service();
        let DirectoryResponse::ConsentHub(hub) =
            service.call(DirectoryRequest::RegisterFacility { facility_id: 1 }).await.unwrap()
        else {
            panic!("expected hub");
        };

        service
            .call(DirectoryRequest::RemoveFacility { consent_hub_id: hub.id, facility_id: 1 })
            .await
            .unwrap();
        assert!(matches!(
            store.hub_by_id(hub.id).unwrap_err(),
            ConsentError::ConsentHubNotFound(_)
        ));
    }
}
