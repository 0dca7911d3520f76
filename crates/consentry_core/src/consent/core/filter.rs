//! Attribute eligibility filter.
//!
//! Computes the set of attribute definitions a consent between a user
//! and a hub may cover: every attribute required by a service assigned
//! to a resource the user holds within one of the hub's facilities,
//! restricted to the consent-relevant namespaces.

use std::collections::HashSet;

use crate::consent::{
    infrastructure::model::{AttributeDefinition, ConsentHub},
    infrastructure::registry::{AssignmentRegistry, AttributeRegistry},
};

pub const NS_MEMBER_RESOURCE: &str = "urn:consentry:member_resource:attribute-def";
pub const NS_MEMBER_GROUP: &str = "urn:consentry:member_group:attribute-def";
pub const NS_MEMBER_CORE: &str = "urn:consentry:member:attribute-def:core";
pub const NS_USER_FACILITY: &str = "urn:consentry:user_facility:attribute-def";
pub const NS_USER: &str = "urn:consentry:user:attribute-def";
pub const NS_USER_EXT_SOURCE: &str = "urn:consentry:ues:attribute-def";

/// Namespaces whose attributes may appear in a consent.
const CONSENT_NAMESPACES: [&str; 6] = [
    NS_MEMBER_RESOURCE,
    NS_MEMBER_GROUP,
    NS_MEMBER_CORE,
    NS_USER_FACILITY,
    NS_USER,
    NS_USER_EXT_SOURCE,
];

/// True when the attribute's namespace is on the consent allow-list.
///
/// Matching is by prefix so sub-namespaces (e.g. `…:attribute-def:def`)
/// stay eligible.
pub fn is_consent_eligible(attribute: &AttributeDefinition) -> bool {
    CONSENT_NAMESPACES.iter().any(|namespace| attribute.namespace.starts_with(namespace))
}

/// Computes the attribute set eligible for a consent.
#[derive(Debug, Default, Clone)]
pub struct AttributeFilter {
    assignments: AssignmentRegistry,
    attributes: AttributeRegistry,
}

impl AttributeFilter {
    pub fn new(assignments: AssignmentRegistry, attributes: AttributeRegistry) -> Self {
        Self { assignments, attributes }
    }

    /// Walk the hub's facilities, the user's resources within them, and
    /// the services assigned to those resources, collecting every
    /// required attribute on the allow-list.
    ///
    /// Absent upstream data yields an empty set; this never fails.
    pub fn eligible_attributes(
        &self,
        user_id: i32,
        hub: &ConsentHub,
    ) -> HashSet<AttributeDefinition> {
        let mut eligible = HashSet::new();
        for facility_id in &hub.facilities {
            for resource_id in self.assignments.assigned_resources(*facility_id, user_id) {
                for service_id in self.assignments.assigned_services(resource_id) {
                    for attribute in self.attributes.required_attributes(service_id) {
                        if is_consent_eligible(&attribute) {
                            eligible.insert(attribute);
                        }
                    }
                }
            }
        }
        eligible
    }
}
