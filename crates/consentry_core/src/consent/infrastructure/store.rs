//! Injected store handle over the consent tables.
//!
//! `ConsentStore` owns the logical persisted layout of the engine:
//!
//! - `consents(id, user_id, consent_hub_id, status, audit)`
//! - `consent_hubs(id, name, enforce_consents, audit)`
//! - `consent_hubs_facilities(consent_hub_id, facility_id)`
//! - `consent_attr_defs(consent_id -> attribute definitions)`
//!
//! Every public mutating method is one transaction: it takes the single
//! write guard, validates against the current table state, and only then
//! applies its writes. Once the first write happens no remaining step of
//! the method can fail, so a returned error always means the tables are
//! untouched. The same guard serializes concurrent callers around the
//! dedup and supersede decision points.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::consent::{
    error::ConsentError,
    infrastructure::model::{AttributeDefinition, AuditStamp, Consent, ConsentHub, ConsentStatus},
};

fn epoch_seconds() -> Result<u64, ConsentError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| ConsentError::SystemTime)
}

#[derive(Debug, Clone)]
struct ConsentRow {
    id: i32,
    user_id: i32,
    consent_hub_id: i32,
    status: ConsentStatus,
    audit: AuditStamp,
}

#[derive(Debug, Clone)]
struct ConsentHubRow {
    id: i32,
    name: String,
    enforce_consents: bool,
    audit: AuditStamp,
}

#[derive(Debug, Default)]
struct Tables {
    consents: HashMap<i32, ConsentRow>,
    consent_attr_defs: HashMap<i32, HashSet<AttributeDefinition>>,
    consent_hubs: HashMap<i32, ConsentHubRow>,
    /// (consent hub id, facility id) association pairs
    consent_hubs_facilities: BTreeSet<(i32, i32)>,
    consent_seq: i32,
    hub_seq: i32,
}

impl Tables {
    fn next_consent_id(&mut self) -> i32 {
        loop {
            self.consent_seq += 1;
            if !self.consents.contains_key(&self.consent_seq) {
                return self.consent_seq;
            }
        }
    }

    fn next_hub_id(&mut self) -> i32 {
        loop {
            self.hub_seq += 1;
            if !self.consent_hubs.contains_key(&self.hub_seq) {
                return self.hub_seq;
            }
        }
    }

    fn facilities_of_hub(&self, hub_id: i32) -> BTreeSet<i32> {
        self.consent_hubs_facilities
            .range((hub_id, i32::MIN)..=(hub_id, i32::MAX))
            .map(|(_, facility_id)| *facility_id)
            .collect()
    }

    fn hubs_of_facility(&self, facility_id: i32) -> Vec<i32> {
        self.consent_hubs_facilities
            .iter()
            .filter(|(_, facility)| *facility == facility_id)
            .map(|(hub_id, _)| *hub_id)
            .collect()
    }

    fn assemble_consent(&self, row: &ConsentRow) -> Consent {
        Consent {
            id: row.id,
            user_id: row.user_id,
            consent_hub_id: row.consent_hub_id,
            status: row.status,
            attributes: self.consent_attr_defs.get(&row.id).cloned().unwrap_or_default(),
            audit: row.audit.clone(),
        }
    }

    fn assemble_hub(&self, row: &ConsentHubRow) -> ConsentHub {
        ConsentHub {
            id: row.id,
            name: row.name.clone(),
            enforce_consents: row.enforce_consents,
            facilities: self.facilities_of_hub(row.id),
            audit: row.audit.clone(),
        }
    }

    /// Remove a consent row and its attribute associations, returning the
    /// removed record.
    fn remove_consent(&mut self, consent_id: i32) -> Option<Consent> {
        let row = self.consents.remove(&consent_id)?;
        let attributes = self.consent_attr_defs.remove(&consent_id).unwrap_or_default();
        Some(Consent {
            id: row.id,
            user_id: row.user_id,
            consent_hub_id: row.consent_hub_id,
            status: row.status,
            attributes,
            audit: row.audit,
        })
    }

    /// Delete the hub's consents, its facility associations, and the hub
    /// row itself. Returns `None` when the hub row does not exist, in
    /// which case nothing was touched.
    fn cascade_delete_hub(&mut self, hub_id: i32) -> Option<CascadeOutcome> {
        let row = self.consent_hubs.get(&hub_id)?;
        let hub = self.assemble_hub(row);

        let mut consent_ids: Vec<i32> = self
            .consents
            .values()
            .filter(|consent| consent.consent_hub_id == hub_id)
            .map(|consent| consent.id)
            .collect();
        consent_ids.sort_unstable();

        // Already-removed consents are not an error here
        let consents: Vec<Consent> =
            consent_ids.into_iter().filter_map(|id| self.remove_consent(id)).collect();

        self.consent_hubs_facilities.retain(|(hub, _)| *hub != hub_id);
        self.consent_hubs.remove(&hub_id);

        Some(CascadeOutcome { hub, consents })
    }

    fn sorted_consents<'a>(&self, rows: impl Iterator<Item = &'a ConsentRow>) -> Vec<Consent> {
        let mut consents: Vec<Consent> = rows.map(|row| self.assemble_consent(row)).collect();
        consents.sort_by_key(|consent| consent.id);
        consents
    }
}

/// Result of a hub deletion cascade.
#[derive(Debug, Clone)]
pub struct CascadeOutcome {
    pub hub: ConsentHub,
    /// Consents removed by the cascade, in id order
    pub consents: Vec<Consent>,
}

/// Result of a facility removal.
#[derive(Debug, Clone)]
pub struct RemoveFacilityOutcome {
    /// Hub state right after the association was removed
    pub hub: ConsentHub,
    /// Present when the removed facility was the hub's last one
    pub cascade: Option<CascadeOutcome>,
}

/// Shared, explicitly injected handle to the consent tables.
#[derive(Debug, Default, Clone)]
pub struct ConsentStore {
    tables: Arc<RwLock<Tables>>,
}

impl ConsentStore {
    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, ConsentError> {
        self.tables.read().map_err(|_| ConsentError::Internal("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, ConsentError> {
        self.tables.write().map_err(|_| ConsentError::Internal("store lock poisoned".to_string()))
    }

    /// Insert a new UNSIGNED consent for (user, hub), replacing any
    /// existing UNSIGNED consent for the same pair.
    ///
    /// Returns the created consent and the replaced one, if any. With an
    /// explicit `id` the insert fails on collision instead of minting a
    /// fresh id from the sequence.
    pub fn create_consent(
        &self,
        id: Option<i32>,
        user_id: i32,
        consent_hub_id: i32,
        attributes: HashSet<AttributeDefinition>,
        actor: &str,
    ) -> Result<(Consent, Option<Consent>), ConsentError> {
        let now = epoch_seconds()?;
        let mut tables = self.write()?;

        if !tables.consent_hubs.contains_key(&consent_hub_id) {
            return Err(ConsentError::ConsentHubNotFound(format!("id {consent_hub_id}")));
        }
        if let Some(id) = id
            && tables.consents.contains_key(&id)
        {
            return Err(ConsentError::ConsentAlreadyExists(id));
        }

        let unsigned: Vec<i32> = tables
            .consents
            .values()
            .filter(|row| {
                row.user_id == user_id
                    && row.consent_hub_id == consent_hub_id
                    && row.status == ConsentStatus::Unsigned
            })
            .map(|row| row.id)
            .collect();
        if unsigned.len() > 1 {
            return Err(ConsentError::Consistency(format!(
                "{} unsigned consents exist for user {user_id} and consent hub {consent_hub_id}",
                unsigned.len()
            )));
        }
        let replaced = unsigned.first().and_then(|old_id| tables.remove_consent(*old_id));

        let id = match id {
            Some(id) => id,
            None => tables.next_consent_id(),
        };
        tables.consents.insert(
            id,
            ConsentRow {
                id,
                user_id,
                consent_hub_id,
                status: ConsentStatus::Unsigned,
                audit: AuditStamp::new(now, actor),
            },
        );
        if !attributes.is_empty() {
            tables.consent_attr_defs.insert(id, attributes);
        }

        let created = tables.assemble_consent(&tables.consents[&id]);
        Ok((created, replaced))
    }

    /// Delete a consent row and its attribute associations.
    pub fn delete_consent(&self, consent_id: i32) -> Result<Consent, ConsentError> {
        let mut tables = self.write()?;
        tables
            .remove_consent(consent_id)
            .ok_or_else(|| ConsentError::ConsentNotFound(format!("id {consent_id}")))
    }

    /// Move a consent to a decided status and delete every other decided
    /// consent of the same (user, hub) pair.
    ///
    /// Returns the updated consent and the superseded ones, in id order.
    pub fn change_status(
        &self,
        consent_id: i32,
        status: ConsentStatus,
        actor: &str,
    ) -> Result<(Consent, Vec<Consent>), ConsentError> {
        let now = epoch_seconds()?;
        let mut tables = self.write()?;

        let (user_id, consent_hub_id, current) = match tables.consents.get(&consent_id) {
            Some(row) => (row.user_id, row.consent_hub_id, row.status),
            None => return Err(ConsentError::ConsentNotFound(format!("id {consent_id}"))),
        };
        if status == ConsentStatus::Unsigned {
            return Err(ConsentError::InvalidConsentStatus(
                "target status must be GRANTED or REVOKED".to_string(),
            ));
        }
        if status == current {
            return Err(ConsentError::InvalidConsentStatus(format!(
                "consent {consent_id} already has status {status}"
            )));
        }

        // Only one decided consent per (user, hub) may remain
        let mut superseded_ids: Vec<i32> = tables
            .consents
            .values()
            .filter(|row| {
                row.id != consent_id
                    && row.user_id == user_id
                    && row.consent_hub_id == consent_hub_id
                    && row.status.is_decided()
            })
            .map(|row| row.id)
            .collect();
        superseded_ids.sort_unstable();

        if let Some(row) = tables.consents.get_mut(&consent_id) {
            row.status = status;
            row.audit.touch(now, actor);
        }
        let superseded: Vec<Consent> =
            superseded_ids.into_iter().filter_map(|id| tables.remove_consent(id)).collect();

        let updated = tables
            .consents
            .get(&consent_id)
            .map(|row| tables.assemble_consent(row))
            .ok_or_else(|| {
                ConsentError::Internal(format!("consent {consent_id} vanished during status change"))
            })?;
        Ok((updated, superseded))
    }

    pub fn consent_by_id(&self, consent_id: i32) -> Result<Consent, ConsentError> {
        let tables = self.read()?;
        tables
            .consents
            .get(&consent_id)
            .map(|row| tables.assemble_consent(row))
            .ok_or_else(|| ConsentError::ConsentNotFound(format!("id {consent_id}")))
    }

    pub fn all_consents(&self) -> Result<Vec<Consent>, ConsentError> {
        let tables = self.read()?;
        Ok(tables.sorted_consents(tables.consents.values()))
    }

    pub fn consents_for_user(
        &self,
        user_id: i32,
        status: Option<ConsentStatus>,
    ) -> Result<Vec<Consent>, ConsentError> {
        let tables = self.read()?;
        Ok(tables.sorted_consents(tables.consents.values().filter(|row| {
            row.user_id == user_id && status.is_none_or(|status| row.status == status)
        })))
    }

    pub fn consents_for_hub(
        &self,
        consent_hub_id: i32,
        status: Option<ConsentStatus>,
    ) -> Result<Vec<Consent>, ConsentError> {
        let tables = self.read()?;
        Ok(tables.sorted_consents(tables.consents.values().filter(|row| {
            row.consent_hub_id == consent_hub_id && status.is_none_or(|status| row.status == status)
        })))
    }

    pub fn consents_for_user_and_hub(
        &self,
        user_id: i32,
        consent_hub_id: i32,
    ) -> Result<Vec<Consent>, ConsentError> {
        let tables = self.read()?;
        Ok(tables.sorted_consents(
            tables
                .consents
                .values()
                .filter(|row| row.user_id == user_id && row.consent_hub_id == consent_hub_id),
        ))
    }

    /// Exactly-one lookup of a consent by (user, hub, status).
    ///
    /// More than one match breaks the at-most-one contract for decided
    /// dedup queries and is a consistency fault.
    pub fn consent_for_user_and_hub(
        &self,
        user_id: i32,
        consent_hub_id: i32,
        status: ConsentStatus,
    ) -> Result<Consent, ConsentError> {
        let matches = self
            .consents_for_user_and_hub(user_id, consent_hub_id)?
            .into_iter()
            .filter(|consent| consent.status == status)
            .collect::<Vec<_>>();
        match matches.len() {
            0 => Err(ConsentError::ConsentNotFound(format!(
                "user {user_id}, consent hub {consent_hub_id}, status {status}"
            ))),
            1 => Ok(matches.into_iter().next().ok_or_else(|| {
                ConsentError::Internal("non-empty match list yielded nothing".to_string())
            })?),
            n => Err(ConsentError::Consistency(format!(
                "{n} consents with status {status} exist for user {user_id} and consent hub {consent_hub_id}"
            ))),
        }
    }

    /// Insert a new consent hub with its facility associations.
    ///
    /// Duplicate detection is by id only; name collisions are not
    /// checked here.
    pub fn create_hub(
        &self,
        id: Option<i32>,
        name: String,
        enforce_consents: bool,
        facilities: &BTreeSet<i32>,
        actor: &str,
    ) -> Result<ConsentHub, ConsentError> {
        if facilities.is_empty() {
            return Err(ConsentError::ConsentHubWithoutFacilities);
        }
        let now = epoch_seconds()?;
        let mut tables = self.write()?;

        if let Some(id) = id
            && tables.consent_hubs.contains_key(&id)
        {
            return Err(ConsentError::ConsentHubAlreadyExists(id));
        }
        for facility_id in facilities {
            if let Some(owner) = tables.hubs_of_facility(*facility_id).first() {
                return Err(ConsentError::FacilityAlreadyAssigned {
                    consent_hub_id: *owner,
                    facility_id: *facility_id,
                });
            }
        }

        let id = match id {
            Some(id) => id,
            None => tables.next_hub_id(),
        };
        tables.consent_hubs.insert(
            id,
            ConsentHubRow { id, name, enforce_consents, audit: AuditStamp::new(now, actor) },
        );
        for facility_id in facilities {
            tables.consent_hubs_facilities.insert((id, *facility_id));
        }

        Ok(tables.assemble_hub(&tables.consent_hubs[&id]))
    }

    pub fn hub_by_id(&self, consent_hub_id: i32) -> Result<ConsentHub, ConsentError> {
        let tables = self.read()?;
        tables
            .consent_hubs
            .get(&consent_hub_id)
            .map(|row| tables.assemble_hub(row))
            .ok_or_else(|| ConsentError::ConsentHubNotFound(format!("id {consent_hub_id}")))
    }

    /// Exactly-one lookup by name. Name uniqueness is not enforced at
    /// creation, so a duplicate name surfaces here as a consistency
    /// fault.
    pub fn hub_by_name(&self, name: &str) -> Result<ConsentHub, ConsentError> {
        let tables = self.read()?;
        let matches: Vec<&ConsentHubRow> =
            tables.consent_hubs.values().filter(|row| row.name == name).collect();
        match matches.len() {
            0 => Err(ConsentError::ConsentHubNotFound(format!("name {name}"))),
            1 => Ok(tables.assemble_hub(matches[0])),
            n => Err(ConsentError::Consistency(format!("{n} consent hubs named {name} exist"))),
        }
    }

    pub fn hub_by_facility(&self, facility_id: i32) -> Result<ConsentHub, ConsentError> {
        let tables = self.read()?;
        let owners = tables.hubs_of_facility(facility_id);
        match owners.len() {
            0 => Err(ConsentError::ConsentHubNotFound(format!("facility {facility_id}"))),
            1 => tables
                .consent_hubs
                .get(&owners[0])
                .map(|row| tables.assemble_hub(row))
                .ok_or_else(|| {
                    ConsentError::Consistency(format!(
                        "facility {facility_id} is associated with missing consent hub {}",
                        owners[0]
                    ))
                }),
            n => Err(ConsentError::Consistency(format!(
                "facility {facility_id} is associated with {n} consent hubs"
            ))),
        }
    }

    pub fn all_hubs(&self) -> Result<Vec<ConsentHub>, ConsentError> {
        let tables = self.read()?;
        let mut hubs: Vec<ConsentHub> =
            tables.consent_hubs.values().map(|row| tables.assemble_hub(row)).collect();
        hubs.sort_by_key(|hub| hub.id);
        Ok(hubs)
    }

    /// Associate a facility with a hub.
    ///
    /// A facility belongs to at most one hub, so any existing
    /// association (same hub included) is a conflict.
    pub fn add_facility(
        &self,
        consent_hub_id: i32,
        facility_id: i32,
        actor: &str,
    ) -> Result<ConsentHub, ConsentError> {
        let now = epoch_seconds()?;
        let mut tables = self.write()?;

        if !tables.consent_hubs.contains_key(&consent_hub_id) {
            return Err(ConsentError::ConsentHubNotFound(format!("id {consent_hub_id}")));
        }
        if let Some(owner) = tables.hubs_of_facility(facility_id).first() {
            return Err(ConsentError::FacilityAlreadyAssigned {
                consent_hub_id: *owner,
                facility_id,
            });
        }

        tables.consent_hubs_facilities.insert((consent_hub_id, facility_id));
        if let Some(row) = tables.consent_hubs.get_mut(&consent_hub_id) {
            row.audit.touch(now, actor);
        }
        Ok(tables.assemble_hub(&tables.consent_hubs[&consent_hub_id]))
    }

    /// Remove a facility association. When the hub's last facility is
    /// removed the hub and its consents are deleted in the same
    /// transaction; the outcome carries the cascade result.
    pub fn remove_facility(
        &self,
        consent_hub_id: i32,
        facility_id: i32,
        actor: &str,
    ) -> Result<RemoveFacilityOutcome, ConsentError> {
        let now = epoch_seconds()?;
        let mut tables = self.write()?;

        if !tables.consent_hubs.contains_key(&consent_hub_id) {
            return Err(ConsentError::ConsentHubNotFound(format!("id {consent_hub_id}")));
        }
        if !tables.consent_hubs_facilities.remove(&(consent_hub_id, facility_id)) {
            return Err(ConsentError::RelationNotFound { consent_hub_id, facility_id });
        }
        if let Some(row) = tables.consent_hubs.get_mut(&consent_hub_id) {
            row.audit.touch(now, actor);
        }

        let hub = tables.assemble_hub(&tables.consent_hubs[&consent_hub_id]);
        let cascade =
            if hub.facilities.is_empty() { tables.cascade_delete_hub(consent_hub_id) } else { None };
        Ok(RemoveFacilityOutcome { hub, cascade })
    }

    /// Delete a hub, its consents and its facility associations in one
    /// transaction.
    pub fn delete_hub_cascade(&self, consent_hub_id: i32) -> Result<CascadeOutcome, ConsentError> {
        let mut tables = self.write()?;
        tables
            .cascade_delete_hub(consent_hub_id)
            .ok_or(ConsentError::ConsentHubAlreadyRemoved(consent_hub_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_hub(hub_id: i32) -> ConsentStore {
        let store = ConsentStore::default();
        store
            .create_hub(Some(hub_id), format!("hub-{hub_id}"), true, &BTreeSet::from([100]), "test")
            .unwrap();
        store
    }

    fn attrs(names: &[&str]) -> HashSet<AttributeDefinition> {
        names
            .iter()
            .map(|name| AttributeDefinition::new("urn:consentry:user:attribute-def", name))
            .collect()
    }

    #[test]
    fn unit_store_create_consent_replaces_unsigned() {
        let store = store_with_hub(1);

        let (first, replaced) = store.create_consent(None, 1, 1, attrs(&["mail"]), "test").unwrap();
        assert!(replaced.is_none());
        assert_eq!(first.status, ConsentStatus::Unsigned);

        let (second, replaced) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();
        let replaced = replaced.unwrap();
        assert_eq!(replaced.id, first.id);
        assert_ne!(second.id, first.id);

        // The replaced id is no longer resolvable
        assert!(matches!(
            store.consent_by_id(first.id).unwrap_err(),
            ConsentError::ConsentNotFound(_)
        ));
        assert_eq!(store.consents_for_user_and_hub(1, 1).unwrap().len(), 1);
    }

    #[test]
    fn unit_store_create_consent_explicit_id_collision() {
        let store = store_with_hub(1);
        store.create_consent(Some(42), 1, 1, HashSet::new(), "test").unwrap();
        assert_eq!(
            store.create_consent(Some(42), 2, 1, HashSet::new(), "test").unwrap_err(),
            ConsentError::ConsentAlreadyExists(42)
        );
    }

    #[test]
    fn unit_store_create_consent_unknown_hub() {
        let store = ConsentStore::default();
        assert!(matches!(
            store.create_consent(None, 1, 9, HashSet::new(), "test").unwrap_err(),
            ConsentError::ConsentHubNotFound(_)
        ));
    }

    #[test]
    fn unit_store_change_status_transitions() {
        let store = store_with_hub(1);
        let (consent, _) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();

        let (granted, superseded) =
            store.change_status(consent.id, ConsentStatus::Granted, "test").unwrap();
        assert_eq!(granted.status, ConsentStatus::Granted);
        assert!(superseded.is_empty());

        // Alternating decided transitions stay legal
        let (revoked, _) = store.change_status(consent.id, ConsentStatus::Revoked, "test").unwrap();
        assert_eq!(revoked.status, ConsentStatus::Revoked);
        let (granted_again, _) =
            store.change_status(consent.id, ConsentStatus::Granted, "test").unwrap();
        assert_eq!(granted_again.status, ConsentStatus::Granted);
    }

    #[test]
    fn unit_store_change_status_rejects_unsigned_and_noop() {
        let store = store_with_hub(1);
        let (consent, _) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();

        assert!(matches!(
            store.change_status(consent.id, ConsentStatus::Unsigned, "test").unwrap_err(),
            ConsentError::InvalidConsentStatus(_)
        ));

        store.change_status(consent.id, ConsentStatus::Granted, "test").unwrap();
        assert!(matches!(
            store.change_status(consent.id, ConsentStatus::Granted, "test").unwrap_err(),
            ConsentError::InvalidConsentStatus(_)
        ));
        // A failed transition leaves the row unchanged
        assert_eq!(store.consent_by_id(consent.id).unwrap().status, ConsentStatus::Granted);
    }

    #[test]
    fn unit_store_change_status_supersedes_other_decided() {
        let store = store_with_hub(1);
        let (first, _) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();
        store.change_status(first.id, ConsentStatus::Granted, "test").unwrap();

        let (second, _) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();
        let (revoked, superseded) =
            store.change_status(second.id, ConsentStatus::Revoked, "test").unwrap();

        assert_eq!(revoked.status, ConsentStatus::Revoked);
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].id, first.id);
        assert!(matches!(
            store.consent_by_id(first.id).unwrap_err(),
            ConsentError::ConsentNotFound(_)
        ));
    }

    #[test]
    fn unit_store_decided_and_unsigned_coexist() {
        let store = store_with_hub(1);
        let (first, _) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();
        store.change_status(first.id, ConsentStatus::Granted, "test").unwrap();

        // The invariant bounds UNSIGNED consents only
        let (second, replaced) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();
        assert!(replaced.is_none());
        assert_ne!(second.id, first.id);
        assert_eq!(store.consents_for_user_and_hub(1, 1).unwrap().len(), 2);
    }

    #[test]
    fn unit_store_exactly_one_lookup() {
        let store = store_with_hub(1);
        assert!(matches!(
            store.consent_for_user_and_hub(1, 1, ConsentStatus::Unsigned).unwrap_err(),
            ConsentError::ConsentNotFound(_)
        ));
        let (consent, _) = store.create_consent(None, 1, 1, HashSet::new(), "test").unwrap();
        assert_eq!(
            store.consent_for_user_and_hub(1, 1, ConsentStatus::Unsigned).unwrap().id,
            consent.id
        );
    }

    #[test]
    fn unit_store_hub_creation_and_lookups() {
        let store = ConsentStore::default();
        let hub = store
            .create_hub(None, "storage".to_string(), true, &BTreeSet::from([10, 11]), "test")
            .unwrap();

        assert_eq!(store.hub_by_id(hub.id).unwrap().facilities, BTreeSet::from([10, 11]));
        assert_eq!(store.hub_by_name("storage").unwrap().id, hub.id);
        assert_eq!(store.hub_by_facility(11).unwrap().id, hub.id);
        assert!(matches!(
            store.hub_by_facility(99).unwrap_err(),
            ConsentError::ConsentHubNotFound(_)
        ));
    }

    #[test]
    fn unit_store_hub_duplicate_id_rejected() {
        let store = ConsentStore::default();
        store.create_hub(Some(5), "a".to_string(), true, &BTreeSet::from([1]), "test").unwrap();
        assert_eq!(
            store
                .create_hub(Some(5), "b".to_string(), true, &BTreeSet::from([2]), "test")
                .unwrap_err(),
            ConsentError::ConsentHubAlreadyExists(5)
        );
    }

    #[test]
    fn unit_store_hub_by_name_duplicate_is_consistency_fault() {
        // Hub dedup is by id only, so two hubs may share a name; the
        // exactly-one name lookup then fails as a consistency fault.
        let store = ConsentStore::default();
        store.create_hub(None, "mirror".to_string(), true, &BTreeSet::from([1]), "test").unwrap();
        store.create_hub(None, "mirror".to_string(), true, &BTreeSet::from([2]), "test").unwrap();

        assert!(matches!(store.hub_by_name("mirror").unwrap_err(), ConsentError::Consistency(_)));
    }

    #[test]
    fn unit_store_hub_requires_facility() {
        let store = ConsentStore::default();
        assert_eq!(
            store.create_hub(None, "empty".to_string(), true, &BTreeSet::new(), "test").unwrap_err(),
            ConsentError::ConsentHubWithoutFacilities
        );
    }

    #[test]
    fn unit_store_add_facility_conflicts() {
        let store = ConsentStore::default();
        let hub =
            store.create_hub(None, "a".to_string(), true, &BTreeSet::from([1]), "test").unwrap();
        let other =
            store.create_hub(None, "b".to_string(), true, &BTreeSet::from([2]), "test").unwrap();

        store.add_facility(hub.id, 3, "test").unwrap();
        assert_eq!(
            store.add_facility(hub.id, 3, "test").unwrap_err(),
            ConsentError::FacilityAlreadyAssigned { consent_hub_id: hub.id, facility_id: 3 }
        );
        // A facility belongs to at most one hub
        assert_eq!(
            store.add_facility(other.id, 3, "test").unwrap_err(),
            ConsentError::FacilityAlreadyAssigned { consent_hub_id: hub.id, facility_id: 3 }
        );
    }

    #[test]
    fn unit_store_remove_facility_cascades_on_last() {
        let store = ConsentStore::default();
        let hub =
            store.create_hub(None, "a".to_string(), true, &BTreeSet::from([1, 2]), "test").unwrap();
        store.create_consent(None, 7, hub.id, HashSet::new(), "test").unwrap();

        let outcome = store.remove_facility(hub.id, 1, "test").unwrap();
        assert!(outcome.cascade.is_none());
        assert_eq!(outcome.hub.facilities, BTreeSet::from([2]));

        let outcome = store.remove_facility(hub.id, 2, "test").unwrap();
        let cascade = outcome.cascade.unwrap();
        assert_eq!(cascade.consents.len(), 1);
        assert!(matches!(store.hub_by_id(hub.id).unwrap_err(), ConsentError::ConsentHubNotFound(_)));
    }

    #[test]
    fn unit_store_remove_facility_relation_not_found() {
        let store = ConsentStore::default();
        let hub =
            store.create_hub(None, "a".to_string(), true, &BTreeSet::from([1]), "test").unwrap();
        assert_eq!(
            store.remove_facility(hub.id, 9, "test").unwrap_err(),
            ConsentError::RelationNotFound { consent_hub_id: hub.id, facility_id: 9 }
        );
        // Failed removal leaves the association in place
        assert_eq!(store.hub_by_id(hub.id).unwrap().facilities, BTreeSet::from([1]));
    }

    #[test]
    fn unit_store_delete_hub_cascade() {
        let store = ConsentStore::default();
        let hub =
            store.create_hub(None, "a".to_string(), true, &BTreeSet::from([1]), "test").unwrap();
        let (c1, _) = store.create_consent(None, 1, hub.id, HashSet::new(), "test").unwrap();
        store.change_status(c1.id, ConsentStatus::Granted, "test").unwrap();
        let (c2, _) = store.create_consent(None, 2, hub.id, HashSet::new(), "test").unwrap();

        let outcome = store.delete_hub_cascade(hub.id).unwrap();
        assert_eq!(outcome.hub.id, hub.id);
        assert_eq!(outcome.consents.iter().map(|c| c.id).collect::<Vec<_>>(), vec![c1.id, c2.id]);

        assert!(matches!(store.consent_by_id(c1.id).unwrap_err(), ConsentError::ConsentNotFound(_)));
        assert!(matches!(store.consent_by_id(c2.id).unwrap_err(), ConsentError::ConsentNotFound(_)));
        assert_eq!(
            store.delete_hub_cascade(hub.id).unwrap_err(),
            ConsentError::ConsentHubAlreadyRemoved(hub.id)
        );
    }
}
