use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::{LeaveRecord, LinkedId, MemberId, RosterEntry, VerifiedMember};

/// Storage failure taxonomy shared by all three tables.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a record already exists for this member")]
    Conflict,
    #[error("no record exists for this member")]
    NotFound,
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Durable roster table. Mutations are last-writer-wins on one record;
/// callers needing read-then-write atomicity serialize through the rank
/// transition orchestrator.
pub trait RosterStore: Send + Sync {
    fn get(&self, member: MemberId) -> Result<Option<RosterEntry>, StoreError>;
    fn find_by_linked(&self, linked: LinkedId) -> Result<Option<RosterEntry>, StoreError>;
    /// Case-insensitive linear scan. Fallback path only; correct under
    /// concurrent writers, not fast.
    fn find_by_name(&self, name: &str) -> Result<Option<RosterEntry>, StoreError>;
    fn upsert(&self, entry: RosterEntry) -> Result<(), StoreError>;
    fn delete(&self, member: MemberId) -> Result<bool, StoreError>;
    /// Snapshot read for the weekly cycle.
    fn all(&self) -> Result<Vec<RosterEntry>, StoreError>;
}

/// Members known to the organization but below the staff line.
pub trait VerifiedStore: Send + Sync {
    fn get(&self, member: MemberId) -> Result<Option<VerifiedMember>, StoreError>;
    fn find_by_linked(&self, linked: LinkedId) -> Result<Option<VerifiedMember>, StoreError>;
    fn find_by_name(&self, name: &str) -> Result<Option<VerifiedMember>, StoreError>;
    fn upsert(&self, member: VerifiedMember) -> Result<(), StoreError>;
    fn delete(&self, member: MemberId) -> Result<bool, StoreError>;
}

/// Active leave windows, at most one per member.
pub trait LeaveStore: Send + Sync {
    fn get(&self, member: MemberId) -> Result<Option<LeaveRecord>, StoreError>;
    fn find_by_linked(&self, linked: LinkedId) -> Result<Option<LeaveRecord>, StoreError>;
    fn find_by_name(&self, name: &str) -> Result<Option<LeaveRecord>, StoreError>;
    /// Rejects a second active leave with `StoreError::Conflict`.
    fn insert(&self, record: LeaveRecord) -> Result<(), StoreError>;
    /// Replaces an existing record; `StoreError::NotFound` when absent.
    fn update(&self, record: LeaveRecord) -> Result<(), StoreError>;
    /// Removes and returns the record. A `None` result is the idempotency
    /// boundary for leave expiry: the record was already processed.
    fn take(&self, member: MemberId) -> Result<Option<LeaveRecord>, StoreError>;
    /// Snapshot read for expiry polling.
    fn all(&self) -> Result<Vec<LeaveRecord>, StoreError>;
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("store mutex poisoned".to_string())
}

/// In-memory roster table backed by a mutex-guarded map.
#[derive(Default)]
pub struct MemoryRoster {
    entries: Mutex<HashMap<MemberId, RosterEntry>>,
}

impl RosterStore for MemoryRoster {
    fn get(&self, member: MemberId) -> Result<Option<RosterEntry>, StoreError> {
        Ok(self.entries.lock().map_err(poisoned)?.get(&member).cloned())
    }

    fn find_by_linked(&self, linked: LinkedId) -> Result<Option<RosterEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|entry| entry.linked == Some(linked))
            .cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<RosterEntry>, StoreError> {
        Ok(self
            .entries
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|entry| entry.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn upsert(&self, entry: RosterEntry) -> Result<(), StoreError> {
        self.entries
            .lock()
            .map_err(poisoned)?
            .insert(entry.member, entry);
        Ok(())
    }

    fn delete(&self, member: MemberId) -> Result<bool, StoreError> {
        Ok(self
            .entries
            .lock()
            .map_err(poisoned)?
            .remove(&member)
            .is_some())
    }

    fn all(&self) -> Result<Vec<RosterEntry>, StoreError> {
        let mut entries: Vec<RosterEntry> = self
            .entries
            .lock()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.member);
        Ok(entries)
    }
}

/// In-memory verified-member table.
#[derive(Default)]
pub struct MemoryVerified {
    members: Mutex<HashMap<MemberId, VerifiedMember>>,
}

impl VerifiedStore for MemoryVerified {
    fn get(&self, member: MemberId) -> Result<Option<VerifiedMember>, StoreError> {
        Ok(self.members.lock().map_err(poisoned)?.get(&member).cloned())
    }

    fn find_by_linked(&self, linked: LinkedId) -> Result<Option<VerifiedMember>, StoreError> {
        Ok(self
            .members
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|member| member.linked == Some(linked))
            .cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<VerifiedMember>, StoreError> {
        Ok(self
            .members
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|member| member.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn upsert(&self, member: VerifiedMember) -> Result<(), StoreError> {
        self.members
            .lock()
            .map_err(poisoned)?
            .insert(member.member, member);
        Ok(())
    }

    fn delete(&self, member: MemberId) -> Result<bool, StoreError> {
        Ok(self
            .members
            .lock()
            .map_err(poisoned)?
            .remove(&member)
            .is_some())
    }
}

/// In-memory leave table.
#[derive(Default)]
pub struct MemoryLeave {
    records: Mutex<HashMap<MemberId, LeaveRecord>>,
}

impl LeaveStore for MemoryLeave {
    fn get(&self, member: MemberId) -> Result<Option<LeaveRecord>, StoreError> {
        Ok(self.records.lock().map_err(poisoned)?.get(&member).cloned())
    }

    fn find_by_linked(&self, linked: LinkedId) -> Result<Option<LeaveRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|record| record.snapshot.linked == Some(linked))
            .cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<LeaveRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .map_err(poisoned)?
            .values()
            .find(|record| record.snapshot.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn insert(&self, record: LeaveRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        if records.contains_key(&record.snapshot.member) {
            return Err(StoreError::Conflict);
        }
        records.insert(record.snapshot.member, record);
        Ok(())
    }

    fn update(&self, record: LeaveRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(poisoned)?;
        if !records.contains_key(&record.snapshot.member) {
            return Err(StoreError::NotFound);
        }
        records.insert(record.snapshot.member, record);
        Ok(())
    }

    fn take(&self, member: MemberId) -> Result<Option<LeaveRecord>, StoreError> {
        Ok(self.records.lock().map_err(poisoned)?.remove(&member))
    }

    fn all(&self) -> Result<Vec<LeaveRecord>, StoreError> {
        let mut records: Vec<LeaveRecord> = self
            .records
            .lock()
            .map_err(poisoned)?
            .values()
            .cloned()
            .collect();
        records.sort_by_key(|record| record.snapshot.member);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staffing::domain::LeaveEnd;
    use crate::staffing::hierarchy::Tier;
    use chrono::{TimeZone, Utc};

    fn entry(id: u64, name: &str) -> RosterEntry {
        RosterEntry::new(MemberId(id), name, Some(LinkedId(id + 100)), Tier::Attendant)
    }

    #[test]
    fn name_scan_is_case_insensitive() {
        let store = MemoryRoster::default();
        store.upsert(entry(1, "Basil Ward")).expect("upsert");
        let found = store.find_by_name("basil ward").expect("scan");
        assert_eq!(found.map(|e| e.member), Some(MemberId(1)));
    }

    #[test]
    fn duplicate_leave_insert_conflicts() {
        let store = MemoryLeave::default();
        let record = LeaveRecord {
            snapshot: entry(7, "Nadia"),
            leave_start: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
            leave_end: LeaveEnd::parse("2026-08-15T00:00:00Z"),
            reason: "travel".to_string(),
        };
        store.insert(record.clone()).expect("first insert");
        assert!(matches!(store.insert(record), Err(StoreError::Conflict)));
    }

    #[test]
    fn take_removes_exactly_once() {
        let store = MemoryLeave::default();
        let record = LeaveRecord {
            snapshot: entry(9, "Olga"),
            leave_start: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
            leave_end: LeaveEnd::parse("2026-08-15T00:00:00Z"),
            reason: "rest".to_string(),
        };
        store.insert(record).expect("insert");
        assert!(store.take(MemberId(9)).expect("first take").is_some());
        assert!(store.take(MemberId(9)).expect("second take").is_none());
    }
}
