//! Externally exposed admin surface.
//!
//! Translates requests addressed by integer entity ids (with status as
//! the wire literals `"UNSIGNED"`, `"GRANTED"`, `"REVOKED"`) into calls
//! on the lifecycle and directory services. This is the surface an RPC
//! or HTTP layer outside this core consumes.

use std::{future::Future, pin::Pin, task::Poll};

use tower::Service;

use crate::consent::{
    api::types::{
        AdminRequest, AdminResponse, DirectoryRequest, DirectoryResponse, LifecycleRequest,
        LifecycleResponse,
    },
    error::ConsentError,
    infrastructure::model::ConsentStatus,
};

/// Admin API service, generic over the lifecycle and directory services
/// it coordinates.
#[derive(Debug, Clone)]
pub struct AdminApiService<L, D> {
    lifecycle: L,
    directory: D,
}

impl<L, D> AdminApiService<L, D> {
    pub fn new(lifecycle: L, directory: D) -> Self {
        Self { lifecycle, directory }
    }
}

fn parse_status(status: Option<String>) -> Result<Option<ConsentStatus>, ConsentError> {
    status.map(ConsentStatus::try_from).transpose()
}

impl<L, D> Service<AdminRequest> for AdminApiService<L, D>
where
    L: Service<LifecycleRequest, Response = LifecycleResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    L::Future: Send,
    D: Service<DirectoryRequest, Response = DirectoryResponse, Error = ConsentError>
        + Clone
        + Send
        + 'static,
    D::Future: Send,
{
    type Response = AdminResponse;
    type Error = ConsentError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut std::task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: AdminRequest) -> Self::Future {
        let mut lifecycle = self.lifecycle.clone();
        let mut directory = self.directory.clone();
        Box::pin(async move {
            match request {
                AdminRequest::CreateConsent { user_id, consent_hub_id } => {
                    match lifecycle
                        .call(LifecycleRequest::CreateConsent { id: None, user_id, consent_hub_id })
                        .await?
                    {
                        LifecycleResponse::Consent(consent) => Ok(AdminResponse::Consent(consent)),
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::DeleteConsent { consent_id } => {
                    match lifecycle.call(LifecycleRequest::DeleteConsent { consent_id }).await? {
                        LifecycleResponse::Ack => Ok(AdminResponse::Ack),
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::ChangeConsentStatus { consent_id, status } => {
                    let status = ConsentStatus::try_from(status)?;
                    match lifecycle
                        .call(LifecycleRequest::ChangeConsentStatus { consent_id, status })
                        .await?
                    {
                        LifecycleResponse::Consent(consent) => Ok(AdminResponse::Consent(consent)),
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetConsent { consent_id } => {
                    match lifecycle.call(LifecycleRequest::GetConsent { consent_id }).await? {
                        LifecycleResponse::Consent(consent) => Ok(AdminResponse::Consent(consent)),
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetAllConsents => {
                    match lifecycle.call(LifecycleRequest::GetAllConsents).await? {
                        LifecycleResponse::Consents(consents) => {
                            Ok(AdminResponse::Consents(consents))
                        }
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetConsentsForUser { user_id, status } => {
                    let status = parse_status(status)?;
                    match lifecycle
                        .call(LifecycleRequest::GetConsentsForUser { user_id, status })
                        .await?
                    {
                        LifecycleResponse::Consents(consents) => {
                            Ok(AdminResponse::Consents(consents))
                        }
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetConsentsForConsentHub { consent_hub_id, status } => {
                    let status = parse_status(status)?;
                    match lifecycle
                        .call(LifecycleRequest::GetConsentsForConsentHub { consent_hub_id, status })
                        .await?
                    {
                        LifecycleResponse::Consents(consents) => {
                            Ok(AdminResponse::Consents(consents))
                        }
                        response => Err(unexpected("lifecycle", &format!("{response:?}"))),
                    }
                }
                AdminRequest::CreateConsentHub { name, enforce_consents, facilities } => {
                    match directory
                        .call(DirectoryRequest::CreateConsentHub {
                            id: None,
                            name,
                            enforce_consents,
                            facilities,
                        })
                        .await?
                    {
                        DirectoryResponse::ConsentHub(hub) => Ok(AdminResponse::ConsentHub(hub)),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::RegisterFacility { facility_id } => {
                    match directory.call(DirectoryRequest::RegisterFacility { facility_id }).await?
                    {
                        DirectoryResponse::ConsentHub(hub) => Ok(AdminResponse::ConsentHub(hub)),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetConsentHubById { consent_hub_id } => {
                    match directory
                        .call(DirectoryRequest::GetConsentHubById { consent_hub_id })
                        .await?
                    {
                        DirectoryResponse::ConsentHub(hub) => Ok(AdminResponse::ConsentHub(hub)),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetConsentHubByName { name } => {
                    match directory.call(DirectoryRequest::GetConsentHubByName { name }).await? {
                        DirectoryResponse::ConsentHub(hub) => Ok(AdminResponse::ConsentHub(hub)),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetConsentHubByFacility { facility_id } => {
                    match directory
                        .call(DirectoryRequest::GetConsentHubByFacility { facility_id })
                        .await?
                    {
                        DirectoryResponse::ConsentHub(hub) => Ok(AdminResponse::ConsentHub(hub)),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::GetAllConsentHubs => {
                    match directory.call(DirectoryRequest::GetAllConsentHubs).await? {
                        DirectoryResponse::ConsentHubs(hubs) => {
                            Ok(AdminResponse::ConsentHubs(hubs))
                        }
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::AddFacility { consent_hub_id, facility_id } => {
                    match directory
                        .call(DirectoryRequest::AddFacility { consent_hub_id, facility_id })
                        .await?
                    {
                        DirectoryResponse::ConsentHub(hub) => Ok(AdminResponse::ConsentHub(hub)),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::RemoveFacility { consent_hub_id, facility_id } => {
                    match directory
                        .call(DirectoryRequest::RemoveFacility { consent_hub_id, facility_id })
                        .await?
                    {
                        DirectoryResponse::Ack => Ok(AdminResponse::Ack),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
                AdminRequest::DeleteConsentHub { consent_hub_id } => {
                    match directory
                        .call(DirectoryRequest::DeleteConsentHub { consent_hub_id })
                        .await?
                    {
                        DirectoryResponse::Ack => Ok(AdminResponse::Ack),
                        response => Err(unexpected("directory", &format!("{response:?}"))),
                    }
                }
            }
        })
    }
}

fn unexpected(component: &str, response: &str) -> ConsentError {
    ConsentError::Internal(format!("unexpected {component} response: {response}"))
}
