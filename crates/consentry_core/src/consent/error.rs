use thiserror::Error;

/// Error returned by the consent engine.
///
/// Expected outcomes (not-found, conflicts, illegal transitions) are
/// returned to the caller; `Consistency` and the infrastructure variants
/// signal an internal fault that aborts the enclosing operation without
/// partial writes.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConsentError {
    #[error("consent error, user not found (id: {0})")]
    UserNotFound(i32),

    #[error("consent error, facility not found (id: {0})")]
    FacilityNotFound(i32),

    #[error("consent error, consent not found ({0})")]
    ConsentNotFound(String),

    #[error("consent error, consent hub not found ({0})")]
    ConsentHubNotFound(String),

    #[error("consent error, facility {facility_id} is not assigned to consent hub {consent_hub_id}")]
    RelationNotFound { consent_hub_id: i32, facility_id: i32 },

    #[error("consent error, consent already exists (id: {0})")]
    ConsentAlreadyExists(i32),

    #[error("consent error, consent hub already exists (id: {0})")]
    ConsentHubAlreadyExists(i32),

    #[error("consent error, facility {facility_id} is already assigned to consent hub {consent_hub_id}")]
    FacilityAlreadyAssigned { consent_hub_id: i32, facility_id: i32 },

    #[error("consent error, consent hub already removed (id: {0})")]
    ConsentHubAlreadyRemoved(i32),

    #[error("consent error, invalid consent status: {0}")]
    InvalidConsentStatus(String),

    #[error("consent error, consent hub must reference at least one facility")]
    ConsentHubWithoutFacilities,

    #[error("consent error, consistency fault: {0}")]
    Consistency(String),

    #[error("consent error, internal failure: {0}")]
    Internal(String),

    #[error("consent error, system clock before unix epoch")]
    SystemTime,
}

impl ConsentError {
    /// True for faults that must not be handled as a regular outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConsentError::Consistency(_) | ConsentError::Internal(_) | ConsentError::SystemTime
        )
    }
}
