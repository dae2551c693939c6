use std::collections::{HashMap, HashSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusHandle;

use clinic_roster::config::RosterConfig;
use clinic_roster::error::AppError;
use clinic_roster::staffing::domain::{LinkedId, MemberId, RosterEntry};
use clinic_roster::staffing::hierarchy::{
    BundleGrants, GrantId, RankCode, Tier, TierDirectory, TierRecord,
};
use clinic_roster::staffing::ports::{
    DirectoryError, MembershipDirectory, Notifier, NotifyError, RankingError, RankingService,
};
use clinic_roster::staffing::store::{MemoryLeave, MemoryRoster, MemoryVerified};
use clinic_roster::staffing::StaffingContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) staffing: StaffingContext,
    /// Serializes the weekly timer and operator-triggered cycle runs.
    pub(crate) cycle_lock: Arc<tokio::sync::Mutex<()>>,
}

/// In-memory membership directory standing in for the local platform.
#[derive(Default)]
pub(crate) struct InMemoryDirectory {
    grants: Arc<Mutex<HashMap<LinkedId, HashSet<GrantId>>>>,
}

#[async_trait]
impl MembershipDirectory for InMemoryDirectory {
    async fn memberships(&self, linked: LinkedId) -> Result<HashSet<GrantId>, DirectoryError> {
        Ok(self
            .grants
            .lock()
            .map_err(|_| DirectoryError::Remote("directory mutex poisoned".to_string()))?
            .get(&linked)
            .cloned()
            .unwrap_or_default())
    }

    async fn grant(&self, linked: LinkedId, grant: GrantId) -> Result<(), DirectoryError> {
        self.grants
            .lock()
            .map_err(|_| DirectoryError::Remote("directory mutex poisoned".to_string()))?
            .entry(linked)
            .or_default()
            .insert(grant);
        tracing::debug!(%linked, grant, "membership granted");
        Ok(())
    }

    async fn revoke(&self, linked: LinkedId, grant: GrantId) -> Result<(), DirectoryError> {
        if let Some(held) = self
            .grants
            .lock()
            .map_err(|_| DirectoryError::Remote("directory mutex poisoned".to_string()))?
            .get_mut(&linked)
        {
            held.remove(&grant);
        }
        tracing::debug!(%linked, grant, "membership revoked");
        Ok(())
    }
}

/// Ranking adapter that records the authoritative rank per member.
#[derive(Default)]
pub(crate) struct InMemoryRanking {
    ranks: Arc<Mutex<HashMap<MemberId, RankCode>>>,
}

#[async_trait]
impl RankingService for InMemoryRanking {
    async fn set_rank(&self, member: MemberId, code: RankCode) -> Result<(), RankingError> {
        self.ranks
            .lock()
            .map_err(|_| RankingError::Remote("ranking mutex poisoned".to_string()))?
            .insert(member, code);
        tracing::info!(%member, code, "remote rank updated");
        Ok(())
    }
}

/// Notification adapter that writes notices to the log stream.
#[derive(Default)]
pub(crate) struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn direct(&self, linked: LinkedId, message: &str) -> Result<(), NotifyError> {
        tracing::info!(%linked, message, "direct notice");
        Ok(())
    }

    async fn broadcast(&self, message: &str) -> Result<(), NotifyError> {
        tracing::info!(message, "broadcast notice");
        Ok(())
    }
}

/// Production tier table. The codes here are deployment configuration;
/// swapping them never touches decision logic.
pub(crate) fn default_tier_directory() -> Result<TierDirectory, AppError> {
    let records = vec![
        tier_record(Tier::Admittee, 79_840_001, 910_000_000_000_000_001),
        tier_record(Tier::Patient, 79_840_002, 910_000_000_000_000_002),
        tier_record(Tier::LunaticPatient, 79_840_003, 910_000_000_000_000_003),
        tier_record(Tier::HonoredPatient, 79_840_004, 910_000_000_000_000_004),
        tier_record(Tier::Undocumented, 79_840_010, 910_000_000_000_000_010),
        tier_record(Tier::Noviciate, 79_840_011, 910_000_000_000_000_011),
        tier_record(Tier::Attendant, 79_840_012, 910_000_000_000_000_012),
        tier_record(Tier::Warden, 79_840_013, 910_000_000_000_000_013),
        tier_record(Tier::Custodian, 79_840_014, 910_000_000_000_000_014),
        tier_record(Tier::Concierge, 79_840_020, 910_000_000_000_000_020),
        tier_record(Tier::Lecturer, 79_840_021, 910_000_000_000_000_021),
    ];
    let excellence = [
        920_000_000_000_000_001,
        920_000_000_000_000_002,
        920_000_000_000_000_003,
        920_000_000_000_000_004,
        920_000_000_000_000_005,
    ];
    let bundles = BundleGrants {
        staff: vec![930_000_000_000_000_001],
        patient: vec![930_000_000_000_000_002, 930_000_000_000_000_003],
        leave: vec![930_000_000_000_000_004],
    };
    Ok(TierDirectory::new(records, excellence, bundles)?)
}

fn tier_record(tier: Tier, rank_code: RankCode, grant: GrantId) -> TierRecord {
    TierRecord {
        tier,
        rank_code,
        grant,
    }
}

/// Wire the in-memory adapters into a staffing context.
pub(crate) fn build_staffing_context(policy: RosterConfig) -> Result<StaffingContext, AppError> {
    Ok(StaffingContext {
        roster: Arc::new(MemoryRoster::default()),
        verified: Arc::new(MemoryVerified::default()),
        leave: Arc::new(MemoryLeave::default()),
        directory: Arc::new(InMemoryDirectory::default()),
        ranking: Arc::new(InMemoryRanking::default()),
        notifier: Arc::new(LogNotifier),
        tiers: Arc::new(default_tier_directory()?),
        policy,
    })
}

/// Seed a small, varied roster for the cycle demo.
pub(crate) fn seed_demo_roster(ctx: &StaffingContext) -> Result<(), AppError> {
    let members = [
        (1_001, "Greta Hall", Tier::Warden, 2, 420, false),
        (1_002, "Milo Anders", Tier::Attendant, 4, 30, true),
        (1_003, "Nadia Reis", Tier::Noviciate, 0, 75, false),
        (1_004, "Pavel Ostrov", Tier::Custodian, 1, 210, false),
        (1_005, "Sol Ferreira", Tier::Lecturer, 0, 500, false),
    ];
    for (id, name, tier, points, score, evaluation_mode) in members {
        let mut entry = RosterEntry::new(
            MemberId(id),
            name,
            Some(LinkedId(id * 100)),
            tier,
        );
        entry.points = points;
        entry.weekly_score = score;
        entry.evaluation_mode = evaluation_mode;
        ctx.roster.upsert(entry)?;
    }
    Ok(())
}
