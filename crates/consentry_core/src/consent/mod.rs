//! Consent module.
//!
//! Governs user consent records that authorize release of identity
//! attributes to service-provider facilities in a federated identity
//! system, and the consent hubs that aggregate facilities behind one
//! enforcement point.
//!
//! ## Core Components
//!
//! - **Attribute Filter** (`core::filter`): computes the attribute set
//!   eligible for a consent from the hub's facility/resource/service
//!   graph, restricted to the consent-relevant namespaces.
//! - **Consent Lifecycle Manager** (`core::lifecycle`): creates, reads
//!   and deletes consents and drives the UNSIGNED/GRANTED/REVOKED state
//!   machine, keeping at most one UNSIGNED consent per (user, hub) and
//!   at most one decided consent per (user, hub).
//! - **ConsentHub Directory** (`core::directory`): hub existence,
//!   facility membership and the implicit hub lifecycle tied to
//!   facility registration.
//! - **Cascade Coordinator** (`core::cascade`): propagates hub deletion
//!   into consent cleanup, explicit and implicit paths alike.
//!
//! ## Infrastructure
//!
//! The engine persists through an explicitly injected `ConsentStore`
//! handle and consumes its collaborators (user/facility directories,
//! assignment and attribute registries, audit sink) through narrow
//! cloneable handles; see `infrastructure`.
//!
//! ## Exposed Surface
//!
//! `api::admin::AdminApiService` is the surface an RPC/HTTP layer
//! consumes: integer entity ids, status as the literal strings
//! `"UNSIGNED"`, `"GRANTED"`, `"REVOKED"`.

pub mod api;
pub mod core;
pub mod error;
pub mod infrastructure;

use crate::consent::{
    api::admin::AdminApiService,
    core::{
        cascade::CascadeCoordinator, directory::DirectoryService, filter::AttributeFilter,
        lifecycle::LifecycleService,
    },
    infrastructure::audit::Auditer,
    infrastructure::registry::{
        AssignmentRegistry, AttributeRegistry, FacilityDirectory, UserDirectory,
    },
    infrastructure::store::ConsentStore,
};

/// Standard admin surface over the default component services.
pub type AdminDefaultStack = AdminApiService<LifecycleService, DirectoryService>;

/// Handles of a fully wired consent engine.
///
/// The registries and the auditer are the collaborator surfaces of the
/// surrounding system; they are exposed so callers can seed directory
/// data and observe the audit trail.
#[derive(Debug, Clone)]
pub struct ConsentCore {
    pub lifecycle: LifecycleService,
    pub directory: DirectoryService,
    pub admin: AdminDefaultStack,
    pub users: UserDirectory,
    pub facilities: FacilityDirectory,
    pub assignments: AssignmentRegistry,
    pub attributes: AttributeRegistry,
    pub auditer: Auditer,
}

/// Initialize a complete consent engine around one shared store.
///
/// # Arguments
/// * `principal` - Actor identity stamped into audit metadata by the
///   component services
pub fn init_consent_core(principal: &str) -> ConsentCore {
    let store = ConsentStore::default();
    let users = UserDirectory::default();
    let facilities = FacilityDirectory::default();
    let assignments = AssignmentRegistry::default();
    let attributes = AttributeRegistry::default();
    let auditer = Auditer::default();

    let filter = AttributeFilter::new(assignments.clone(), attributes.clone());
    let cascade = CascadeCoordinator::new(store.clone(), auditer.clone());
    let lifecycle = LifecycleService::new(
        store.clone(),
        filter,
        users.clone(),
        auditer.clone(),
        principal,
    );
    let directory = DirectoryService::new(
        store,
        facilities.clone(),
        cascade,
        auditer.clone(),
        principal,
    );
    let admin = AdminApiService::new(lifecycle.clone(), directory.clone());

    ConsentCore { lifecycle, directory, admin, users, facilities, assignments, attributes, auditer }
}
