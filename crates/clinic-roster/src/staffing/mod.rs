//! Staff roster subsystem: rank ledger, leave scheduling, the weekly
//! evaluation cycle, and the rank transition orchestrator.

pub mod domain;
pub mod evaluation;
pub mod hierarchy;
pub mod identity;
pub mod leave;
pub mod ports;
pub mod schedule;
pub mod store;
pub mod transition;

#[cfg(test)]
pub(crate) mod tests;

use std::sync::Arc;

use crate::config::RosterConfig;

pub use domain::{LeaveEnd, LeaveRecord, LinkedId, MemberId, RosterEntry, VerifiedMember};
pub use evaluation::EvaluationEngine;
pub use hierarchy::{Category, Tier, TierDirectory};
pub use identity::IdentityResolver;
pub use leave::LeaveScheduler;
pub use transition::RankTransition;

use ports::{MembershipDirectory, Notifier, RankingService};
use store::{LeaveStore, RosterStore, VerifiedStore};

/// Shared application context handed to every staffing component at
/// construction: the three stores, the external collaborators, the tier
/// table, and the policy knobs. Components never reach for global state.
#[derive(Clone)]
pub struct StaffingContext {
    pub roster: Arc<dyn RosterStore>,
    pub verified: Arc<dyn VerifiedStore>,
    pub leave: Arc<dyn LeaveStore>,
    pub directory: Arc<dyn MembershipDirectory>,
    pub ranking: Arc<dyn RankingService>,
    pub notifier: Arc<dyn Notifier>,
    pub tiers: Arc<TierDirectory>,
    pub policy: RosterConfig,
}

impl StaffingContext {
    /// Upper bound applied to every outbound ranking/directory call.
    pub fn outbound_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.policy.outbound_timeout_secs)
    }

    pub fn resolver(&self) -> IdentityResolver {
        IdentityResolver::new(
            Arc::clone(&self.roster),
            Arc::clone(&self.verified),
            Arc::clone(&self.leave),
        )
    }
}
