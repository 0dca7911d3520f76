//! Request and response types of the consent engine services.
//!
//! Each component service speaks its own request/response enum pair:
//!
//! - **Lifecycle**: consent creation, deletion, status transitions and
//!   consent reads.
//! - **Directory**: consent hub existence, facility membership and hub
//!   reads.
//! - **Admin**: the externally exposed surface, addressing entities by
//!   integer id and transmitting status as the literal strings
//!   `"UNSIGNED"`, `"GRANTED"`, `"REVOKED"`.

use crate::consent::infrastructure::model::{Consent, ConsentHub, ConsentStatus};

/// Consent lifecycle manager request types.
#[derive(Debug, Clone)]
pub enum LifecycleRequest {
    /// Create a new UNSIGNED consent for a (user, hub) pair.
    ///
    /// Any pre-existing UNSIGNED consent for the pair is deleted first;
    /// its absence is not an error. The attribute snapshot is computed
    /// from the hub's current facility/resource/service graph.
    CreateConsent {
        /// Explicit consent id; minted from the sequence when `None`
        id: Option<i32>,
        user_id: i32,
        consent_hub_id: i32,
    },

    /// Delete a consent and its attribute associations.
    DeleteConsent { consent_id: i32 },

    /// Move a consent to GRANTED or REVOKED.
    ///
    /// Deletes every other decided consent of the same (user, hub) pair
    /// so at most one decided consent per hub remains.
    ChangeConsentStatus { consent_id: i32, status: ConsentStatus },

    /// Fetch a single consent by id.
    GetConsent { consent_id: i32 },

    /// List all consents known to the engine.
    GetAllConsents,

    /// List a user's consents, optionally restricted to one status.
    GetConsentsForUser { user_id: i32, status: Option<ConsentStatus> },

    /// List a hub's consents, optionally restricted to one status.
    GetConsentsForConsentHub { consent_hub_id: i32, status: Option<ConsentStatus> },

    /// Exactly-one lookup by (user, hub, status).
    GetConsentForUserAndConsentHub { user_id: i32, consent_hub_id: i32, status: ConsentStatus },
}

/// Consent lifecycle manager response types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleResponse {
    Consent(Consent),
    Consents(Vec<Consent>),
    /// Acknowledgment of a completed deletion
    Ack,
}

/// Consent hub directory request types.
#[derive(Debug, Clone)]
pub enum DirectoryRequest {
    /// Create a consent hub over the given facilities.
    ///
    /// The duplicate check is by id; `name` defaults to the name of the
    /// first facility when unset. At least one facility is required.
    CreateConsentHub {
        /// Explicit hub id; minted from the sequence when `None`
        id: Option<i32>,
        name: Option<String>,
        enforce_consents: bool,
        facilities: Vec<i32>,
    },

    /// Implicit hub lifecycle: ensure the facility belongs to a hub,
    /// creating one named after it when it does not.
    RegisterFacility { facility_id: i32 },

    GetConsentHubById { consent_hub_id: i32 },
    GetConsentHubByName { name: String },
    GetConsentHubByFacility { facility_id: i32 },
    GetAllConsentHubs,

    /// Associate a facility with an existing hub.
    AddFacility { consent_hub_id: i32, facility_id: i32 },

    /// Remove a facility association. Removing the last facility deletes
    /// the hub and its consents.
    RemoveFacility { consent_hub_id: i32, facility_id: i32 },

    /// Delete a hub with all its consents and facility associations.
    DeleteConsentHub { consent_hub_id: i32 },
}

/// Consent hub directory response types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryResponse {
    ConsentHub(ConsentHub),
    ConsentHubs(Vec<ConsentHub>),
    /// Acknowledgment of a completed removal or deletion
    Ack,
}

/// Externally exposed request types.
///
/// Status values are transmitted as wire literals and parsed before the
/// request reaches the component services.
#[derive(Debug, Clone)]
pub enum AdminRequest {
    CreateConsent { user_id: i32, consent_hub_id: i32 },
    DeleteConsent { consent_id: i32 },
    /// `status` must be `"GRANTED"` or `"REVOKED"`
    ChangeConsentStatus { consent_id: i32, status: String },
    GetConsent { consent_id: i32 },
    GetAllConsents,
    GetConsentsForUser { user_id: i32, status: Option<String> },
    GetConsentsForConsentHub { consent_hub_id: i32, status: Option<String> },

    CreateConsentHub { name: Option<String>, enforce_consents: bool, facilities: Vec<i32> },
    RegisterFacility { facility_id: i32 },
    GetConsentHubById { consent_hub_id: i32 },
    GetConsentHubByName { name: String },
    GetConsentHubByFacility { facility_id: i32 },
    GetAllConsentHubs,
    AddFacility { consent_hub_id: i32, facility_id: i32 },
    RemoveFacility { consent_hub_id: i32, facility_id: i32 },
    DeleteConsentHub { consent_hub_id: i32 },
}

/// Externally exposed response types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminResponse {
    Consent(Consent),
    Consents(Vec<Consent>),
    ConsentHub(ConsentHub),
    ConsentHubs(Vec<ConsentHub>),
    Ack,
}
