use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::config::RosterConfig;
use crate::staffing::domain::{LinkedId, MemberId, RosterEntry};
use crate::staffing::hierarchy::{BundleGrants, GrantId, RankCode, Tier, TierDirectory, TierRecord};
use crate::staffing::ports::{
    DirectoryError, MembershipDirectory, Notifier, NotifyError, RankingError, RankingService,
};
use crate::staffing::store::{MemoryLeave, MemoryRoster, MemoryVerified};
use crate::staffing::StaffingContext;

pub(crate) const STAFF_BUNDLE: GrantId = 4_001;
pub(crate) const PATIENT_BUNDLE: GrantId = 4_002;
pub(crate) const LEAVE_BUNDLE: GrantId = 4_003;
pub(crate) const EXCELLENCE: [GrantId; 5] = [3_001, 3_002, 3_003, 3_004, 3_005];

pub(crate) fn tier_directory() -> TierDirectory {
    let records = Tier::ALL
        .iter()
        .enumerate()
        .map(|(index, tier)| TierRecord {
            tier: *tier,
            rank_code: 1_000 + index as u64,
            grant: 2_000 + index as u64,
        })
        .collect();
    let bundles = BundleGrants {
        staff: vec![STAFF_BUNDLE],
        patient: vec![PATIENT_BUNDLE],
        leave: vec![LEAVE_BUNDLE],
    };
    TierDirectory::new(records, EXCELLENCE, bundles).expect("complete tier table")
}

pub(crate) fn at(year: i32, month: u32, day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, 0, 0)
        .single()
        .expect("valid instant")
}

pub(crate) fn staff_entry(id: u64, name: &str, tier: Tier) -> RosterEntry {
    RosterEntry::new(MemberId(id), name, Some(LinkedId(id * 10)), tier)
}

/// Membership directory that records all grant/revoke traffic in memory.
#[derive(Default)]
pub(crate) struct RecordingDirectory {
    grants: Mutex<HashMap<LinkedId, HashSet<GrantId>>>,
}

impl RecordingDirectory {
    pub(crate) fn seed(&self, linked: LinkedId, grants: &[GrantId]) {
        self.grants
            .lock()
            .expect("directory mutex poisoned")
            .entry(linked)
            .or_default()
            .extend(grants.iter().copied());
    }

    pub(crate) fn held(&self, linked: LinkedId) -> HashSet<GrantId> {
        self.grants
            .lock()
            .expect("directory mutex poisoned")
            .get(&linked)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MembershipDirectory for RecordingDirectory {
    async fn memberships(&self, linked: LinkedId) -> Result<HashSet<GrantId>, DirectoryError> {
        Ok(self.held(linked))
    }

    async fn grant(&self, linked: LinkedId, grant: GrantId) -> Result<(), DirectoryError> {
        self.grants
            .lock()
            .expect("directory mutex poisoned")
            .entry(linked)
            .or_default()
            .insert(grant);
        Ok(())
    }

    async fn revoke(&self, linked: LinkedId, grant: GrantId) -> Result<(), DirectoryError> {
        if let Some(held) = self
            .grants
            .lock()
            .expect("directory mutex poisoned")
            .get_mut(&linked)
        {
            held.remove(&grant);
        }
        Ok(())
    }
}

/// Ranking service double with a failure switch for abort-path tests.
#[derive(Default)]
pub(crate) struct RecordingRanking {
    calls: Mutex<Vec<(MemberId, RankCode)>>,
    failing: AtomicBool,
}

impl RecordingRanking {
    pub(crate) fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn calls(&self) -> Vec<(MemberId, RankCode)> {
        self.calls.lock().expect("ranking mutex poisoned").clone()
    }
}

#[async_trait]
impl RankingService for RecordingRanking {
    async fn set_rank(&self, member: MemberId, code: RankCode) -> Result<(), RankingError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RankingError::Remote("ranking platform offline".to_string()));
        }
        self.calls
            .lock()
            .expect("ranking mutex poisoned")
            .push((member, code));
        Ok(())
    }
}

/// Notifier double capturing direct notices and broadcasts.
#[derive(Default)]
pub(crate) struct RecordingNotifier {
    directs: Mutex<Vec<(LinkedId, String)>>,
    broadcasts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub(crate) fn directs(&self) -> Vec<(LinkedId, String)> {
        self.directs.lock().expect("notifier mutex poisoned").clone()
    }

    pub(crate) fn broadcasts(&self) -> Vec<String> {
        self.broadcasts
            .lock()
            .expect("notifier mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn direct(&self, linked: LinkedId, message: &str) -> Result<(), NotifyError> {
        self.directs
            .lock()
            .expect("notifier mutex poisoned")
            .push((linked, message.to_string()));
        Ok(())
    }

    async fn broadcast(&self, message: &str) -> Result<(), NotifyError> {
        self.broadcasts
            .lock()
            .expect("notifier mutex poisoned")
            .push(message.to_string());
        Ok(())
    }
}

/// Everything a staffing test needs: the context plus handles onto every
/// double for seeding and assertions.
pub(crate) struct TestHarness {
    pub(crate) roster: Arc<MemoryRoster>,
    pub(crate) verified: Arc<MemoryVerified>,
    pub(crate) leave: Arc<MemoryLeave>,
    pub(crate) directory: Arc<RecordingDirectory>,
    pub(crate) ranking: Arc<RecordingRanking>,
    pub(crate) notifier: Arc<RecordingNotifier>,
    pub(crate) policy: RosterConfig,
}

impl TestHarness {
    pub(crate) fn build(&self) -> StaffingContext {
        StaffingContext {
            roster: self.roster.clone(),
            verified: self.verified.clone(),
            leave: self.leave.clone(),
            directory: self.directory.clone(),
            ranking: self.ranking.clone(),
            notifier: self.notifier.clone(),
            tiers: Arc::new(tier_directory()),
            policy: self.policy.clone(),
        }
    }
}

pub(crate) fn context_builder() -> TestHarness {
    TestHarness {
        roster: Arc::new(MemoryRoster::default()),
        verified: Arc::new(MemoryVerified::default()),
        leave: Arc::new(MemoryLeave::default()),
        directory: Arc::new(RecordingDirectory::default()),
        ranking: Arc::new(RecordingRanking::default()),
        notifier: Arc::new(RecordingNotifier::default()),
        policy: RosterConfig::default(),
    }
}
