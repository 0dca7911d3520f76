//! Entity model for the consent engine.
//!
//! Defines the consent and consent hub records, the consent status
//! literals exchanged with the outer RPC layer, attribute definitions,
//! and the audit metadata stamped on every persisted row.

use std::{
    collections::{BTreeSet, HashSet},
    fmt::Display,
};

use crate::consent::error::ConsentError;

/// Signing state of a consent.
///
/// A consent is born `Unsigned`. It can only move to a decided state
/// (`Granted` or `Revoked`), and decided states stay toggleable between
/// each other. `Unsigned` is never a transition target; it is reachable
/// only by deleting and recreating the consent.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ConsentStatus {
    Unsigned,
    Granted,
    Revoked,
}

impl ConsentStatus {
    /// Wire literal for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentStatus::Unsigned => "UNSIGNED",
            ConsentStatus::Granted => "GRANTED",
            ConsentStatus::Revoked => "REVOKED",
        }
    }

    /// True for `Granted` and `Revoked`.
    pub fn is_decided(&self) -> bool {
        !matches!(self, ConsentStatus::Unsigned)
    }
}

impl Display for ConsentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for ConsentStatus {
    type Error = ConsentError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "UNSIGNED" => Ok(ConsentStatus::Unsigned),
            "GRANTED" => Ok(ConsentStatus::Granted),
            "REVOKED" => Ok(ConsentStatus::Revoked),
            other => Err(ConsentError::InvalidConsentStatus(format!(
                "unknown consent status literal: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for ConsentStatus {
    type Error = ConsentError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ConsentStatus::try_from(s.as_str())
    }
}

/// A namespaced descriptor of a unit of identity data.
///
/// Identity is the (namespace, friendly name) pair; attribute sets are
/// deduplicated on it and carry no order.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct AttributeDefinition {
    pub namespace: String,
    pub friendly_name: String,
}

impl AttributeDefinition {
    pub fn new(namespace: &str, friendly_name: &str) -> Self {
        Self { namespace: namespace.to_string(), friendly_name: friendly_name.to_string() }
    }
}

impl Display for AttributeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.friendly_name)
    }
}

/// Creation/modification metadata stamped on persisted rows.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AuditStamp {
    /// Creation time, seconds since unix epoch
    pub created_at: u64,
    pub created_by: String,
    /// Last modification time, seconds since unix epoch
    pub modified_at: u64,
    pub modified_by: String,
}

impl AuditStamp {
    pub fn new(now: u64, actor: &str) -> Self {
        Self {
            created_at: now,
            created_by: actor.to_string(),
            modified_at: now,
            modified_by: actor.to_string(),
        }
    }

    pub fn touch(&mut self, now: u64, actor: &str) {
        self.modified_at = now;
        self.modified_by = actor.to_string();
    }
}

/// A user's decision record about releasing identity attributes to the
/// facilities of one consent hub.
///
/// The attribute set is a snapshot taken at creation time; it is not
/// recomputed when the hub's facility/resource/service graph changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consent {
    pub id: i32,
    pub user_id: i32,
    pub consent_hub_id: i32,
    pub status: ConsentStatus,
    pub attributes: HashSet<AttributeDefinition>,
    pub audit: AuditStamp,
}

impl Display for Consent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "consent {} (user: {}, hub: {}, status: {}, attributes: {})",
            self.id,
            self.user_id,
            self.consent_hub_id,
            self.status,
            self.attributes.len()
        )
    }
}

/// An aggregation of facilities sharing one consent-enforcement point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsentHub {
    pub id: i32,
    pub name: String,
    pub enforce_consents: bool,
    pub facilities: BTreeSet<i32>,
    pub audit: AuditStamp,
}

impl Display for ConsentHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "consent hub {} ({}, enforce: {}, facilities: {:?})",
            self.id, self.name, self.enforce_consents, self.facilities
        )
    }
}

/// Directory record of a user known to the surrounding system.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct User {
    pub id: i32,
    pub name: String,
}

impl User {
    pub fn new(id: i32, name: &str) -> Self {
        Self { id, name: name.to_string() }
    }
}

/// Directory record of a service-provider endpoint.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Facility {
    pub id: i32,
    pub name: String,
}

impl Facility {
    pub fn new(id: i32, name: &str) -> Self {
        Self { id, name: name.to_string() }
    }
}
