//! Consumed collaborator surfaces.
//!
//! The consent engine does not own users, facilities, resource/service
//! assignments or attribute requirements; it consumes them through the
//! narrow query handles defined here. Each handle is cheap to clone and
//! shares its backing map.

use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use dashmap::DashMap;

use crate::consent::{
    error::ConsentError,
    infrastructure::model::{AttributeDefinition, Facility, User},
};

/// Lookup surface of the user directory.
#[derive(Debug, Default, Clone)]
pub struct UserDirectory {
    users: Arc<DashMap<i32, User>>,
}

impl UserDirectory {
    pub fn register(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn get(&self, id: i32) -> Option<User> {
        self.users.get(&id).map(|user| user.clone())
    }

    pub fn require(&self, id: i32) -> Result<User, ConsentError> {
        self.get(id).ok_or(ConsentError::UserNotFound(id))
    }
}

/// Lookup surface of the facility directory.
#[derive(Debug, Default, Clone)]
pub struct FacilityDirectory {
    facilities: Arc<DashMap<i32, Facility>>,
}

impl FacilityDirectory {
    pub fn register(&self, facility: Facility) {
        self.facilities.insert(facility.id, facility);
    }

    pub fn get(&self, id: i32) -> Option<Facility> {
        self.facilities.get(&id).map(|facility| facility.clone())
    }

    pub fn require(&self, id: i32) -> Result<Facility, ConsentError> {
        self.get(id).ok_or(ConsentError::FacilityNotFound(id))
    }
}

/// Query surface over resource and service assignments.
///
/// Resources are assigned to a user within a facility; services are
/// assigned to resources. Absent keys yield empty results, never errors.
#[derive(Debug, Default, Clone)]
pub struct AssignmentRegistry {
    /// (facility id, user id) -> resource ids
    user_resources: Arc<DashMap<(i32, i32), BTreeSet<i32>>>,
    /// resource id -> service ids
    resource_services: Arc<DashMap<i32, BTreeSet<i32>>>,
}

impl AssignmentRegistry {
    pub fn assign_resource(&self, facility_id: i32, user_id: i32, resource_id: i32) {
        self.user_resources.entry((facility_id, user_id)).or_default().insert(resource_id);
    }

    pub fn assigned_resources(&self, facility_id: i32, user_id: i32) -> Vec<i32> {
        self.user_resources
            .get(&(facility_id, user_id))
            .map(|resources| resources.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn assign_service(&self, resource_id: i32, service_id: i32) {
        self.resource_services.entry(resource_id).or_default().insert(service_id);
    }

    pub fn assigned_services(&self, resource_id: i32) -> Vec<i32> {
        self.resource_services
            .get(&resource_id)
            .map(|services| services.iter().copied().collect())
            .unwrap_or_default()
    }
}

/// Namespace-keyed registry of the attribute definitions each service
/// requires.
#[derive(Debug, Default, Clone)]
pub struct AttributeRegistry {
    required: Arc<DashMap<i32, HashSet<AttributeDefinition>>>,
}

impl AttributeRegistry {
    pub fn require_attribute(&self, service_id: i32, attribute: AttributeDefinition) {
        self.required.entry(service_id).or_default().insert(attribute);
    }

    pub fn required_attributes(&self, service_id: i32) -> HashSet<AttributeDefinition> {
        self.required.get(&service_id).map(|attrs| attrs.clone()).unwrap_or_default()
    }
}
