use super::domain::{LinkedId, MemberId, RosterEntry, VerifiedMember};
use super::hierarchy::{Category, GrantId, HierarchyError, RankCode, Tier};
use super::identity::ResolvedMember;
use super::ports::{grant_all, memberships_bounded, notify_direct, revoke_all, set_rank_bounded};
use super::store::StoreError;
use super::StaffingContext;

#[derive(Debug, thiserror::Error)]
pub enum TransitionError {
    #[error("no tier is mapped to rank code {0}")]
    UnknownRankCode(RankCode),
    #[error("member already holds that tier")]
    SameTier,
    #[error("member is on leave; end the leave before changing rank")]
    OnLeave,
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Ranking(#[from] super::ports::RankingError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result of a committed rank change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub member: MemberId,
    pub name: String,
    pub previous: Option<Tier>,
    pub current: Tier,
}

/// Membership grants to add and remove for one category-pair transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub add: Vec<GrantId>,
    pub remove: Vec<GrantId>,
}

/// The single choke point every rank change passes through.
///
/// The remote ranking platform is the source of truth: its update happens
/// first and a failure there aborts the operation with no local mutation.
/// Membership updates after that point are best-effort; a partial failure
/// is surfaced as a divergence warning, never rolled back.
pub struct RankTransition {
    ctx: StaffingContext,
}

impl RankTransition {
    pub fn new(ctx: StaffingContext) -> Self {
        Self { ctx }
    }

    pub async fn change_rank_by_code(
        &self,
        member: MemberId,
        name: &str,
        linked: Option<LinkedId>,
        code: RankCode,
    ) -> Result<TransitionOutcome, TransitionError> {
        let tier = self
            .ctx
            .tiers
            .tier_by_rank_code(code)
            .ok_or(TransitionError::UnknownRankCode(code))?;
        self.change_rank(member, name, linked, tier).await
    }

    pub async fn change_rank(
        &self,
        member: MemberId,
        name: &str,
        linked: Option<LinkedId>,
        new_tier: Tier,
    ) -> Result<TransitionOutcome, TransitionError> {
        // A member on leave lives only in the leave table; writing a fresh
        // RosterEntry here would coexist with the LeaveRecord, and the
        // eventual expiry would restore the stale snapshot over this
        // change. The leave has to end first.
        if self.ctx.leave.get(member)?.is_some() {
            return Err(TransitionError::OnLeave);
        }

        let roster_entry = self.ctx.roster.get(member)?;
        let verified = self.ctx.verified.get(member)?;

        let name = roster_entry
            .as_ref()
            .map(|entry| entry.name.clone())
            .or_else(|| verified.as_ref().map(|record| record.name.clone()))
            .unwrap_or_else(|| name.to_string());
        let linked = roster_entry
            .as_ref()
            .and_then(|entry| entry.linked)
            .or_else(|| verified.as_ref().and_then(|record| record.linked))
            .or(linked);

        let current_tier = match roster_entry.as_ref() {
            Some(entry) => Some(entry.tier),
            None => match linked {
                Some(linked) => self.tier_from_directory(linked).await,
                None => None,
            },
        };
        let current_category = match current_tier {
            Some(tier) => tier.category(),
            // A verified record without any tier grant reads as a patient;
            // a member unknown everywhere is being manually registered and
            // starts from intake.
            None if verified.is_some() => Category::Patient,
            None => Category::Intake,
        };

        if current_tier == Some(new_tier) {
            return Err(TransitionError::SameTier);
        }

        let delta = membership_delta(
            &self.ctx,
            current_tier,
            current_category,
            new_tier,
        )?;

        // Remote platform first. A failure here leaves every local table
        // untouched.
        let limit = self.ctx.outbound_timeout();
        let rank_code = self.ctx.tiers.record(new_tier)?.rank_code;
        set_rank_bounded(self.ctx.ranking.as_ref(), member, rank_code, limit).await?;

        if let Some(linked) = linked {
            revoke_all(self.ctx.directory.as_ref(), linked, &delta.remove, limit).await;
            grant_all(self.ctx.directory.as_ref(), linked, &delta.add, limit).await;
        }

        if new_tier.category().is_staff_side() {
            let entry = match roster_entry {
                Some(mut existing) => {
                    existing.tier = new_tier;
                    existing
                }
                None => RosterEntry::new(member, name.clone(), linked, new_tier),
            };
            self.ctx.roster.upsert(entry)?;
            self.ctx.verified.delete(member)?;
        } else {
            self.ctx.verified.upsert(VerifiedMember {
                member,
                name: name.clone(),
                linked,
            })?;
            self.ctx.roster.delete(member)?;
        }

        // A rank change always voids evaluation-adjacent privileges.
        if let Some(linked) = linked {
            revoke_all(
                self.ctx.directory.as_ref(),
                linked,
                self.ctx.tiers.excellence_grants(),
                limit,
            )
            .await;
        }

        let promoted = current_tier.map(|tier| new_tier > tier);
        let notice = match promoted {
            Some(true) => format!("You have been promoted to {}.", new_tier.label()),
            Some(false) => format!("Your rank is now {}.", new_tier.label()),
            None => format!("You have been registered as {}.", new_tier.label()),
        };
        notify_direct(self.ctx.notifier.as_ref(), linked, &notice).await;

        tracing::info!(
            %member,
            from = current_tier.map(Tier::label).unwrap_or("unregistered"),
            to = new_tier.label(),
            "rank changed"
        );

        Ok(TransitionOutcome {
            member,
            name,
            previous: current_tier,
            current: new_tier,
        })
    }

    /// Voluntary return to the intake tier.
    pub async fn resign(
        &self,
        target: &ResolvedMember,
    ) -> Result<TransitionOutcome, TransitionError> {
        let outcome = self
            .change_rank(target.member, &target.name, target.linked, Tier::Admittee)
            .await?;
        notify_direct(
            self.ctx.notifier.as_ref(),
            target.linked,
            "Your resignation has been processed. Thank you for your service.",
        )
        .await;
        Ok(outcome)
    }

    /// Fallback category discovery: scan the member's memberships for any
    /// known tier grant and take the highest tier found.
    async fn tier_from_directory(&self, linked: LinkedId) -> Option<Tier> {
        let limit = self.ctx.outbound_timeout();
        match memberships_bounded(self.ctx.directory.as_ref(), linked, limit).await {
            Ok(grants) => grants
                .into_iter()
                .filter_map(|grant| self.ctx.tiers.tier_by_grant(grant))
                .max(),
            Err(err) => {
                tracing::warn!(%linked, error = %err, "membership scan failed");
                None
            }
        }
    }
}

/// Fixed category-pair transition table. Tier grants always swap; bundle
/// grants move only on a category boundary.
fn membership_delta(
    ctx: &StaffingContext,
    current_tier: Option<Tier>,
    current_category: Category,
    new_tier: Tier,
) -> Result<MembershipDelta, HierarchyError> {
    let mut delta = MembershipDelta::default();
    let bundles = ctx.tiers.bundles();

    if let Some(tier) = current_tier {
        delta.remove.push(ctx.tiers.record(tier)?.grant);
    }
    delta.add.push(ctx.tiers.record(new_tier)?.grant);

    match (current_category, new_tier.category()) {
        (Category::Intake, Category::Staff | Category::SeniorStaff) => {
            delta.add.extend_from_slice(&bundles.staff);
        }
        (Category::Intake, Category::Patient) => {
            delta.add.extend_from_slice(&bundles.patient);
        }
        (Category::Intake, Category::Intake) => {}
        (Category::Patient, Category::Staff | Category::SeniorStaff) => {
            delta.remove.extend_from_slice(&bundles.patient);
            delta.add.extend_from_slice(&bundles.staff);
        }
        (Category::Patient, Category::Patient) => {}
        (Category::Patient, Category::Intake) => {
            delta.remove.extend_from_slice(&bundles.patient);
        }
        (Category::Staff | Category::SeniorStaff, Category::Patient) => {
            delta.remove.extend_from_slice(&bundles.staff);
            delta.add.extend_from_slice(&bundles.patient);
        }
        (Category::Staff | Category::SeniorStaff, Category::Intake) => {
            delta.remove.extend_from_slice(&bundles.staff);
        }
        (
            Category::Staff | Category::SeniorStaff,
            Category::Staff | Category::SeniorStaff,
        ) => {}
    }

    Ok(delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staffing::tests::common::context_builder;

    #[test]
    fn staff_to_patient_swaps_bundles() {
        let ctx = context_builder().build();
        let delta = membership_delta(&ctx, Some(Tier::Warden), Category::Staff, Tier::Patient)
            .expect("delta");
        let bundles = ctx.tiers.bundles();
        for grant in &bundles.staff {
            assert!(delta.remove.contains(grant));
        }
        for grant in &bundles.patient {
            assert!(delta.add.contains(grant));
        }
    }

    #[test]
    fn staff_to_staff_only_swaps_tier_grants() {
        let ctx = context_builder().build();
        let delta = membership_delta(&ctx, Some(Tier::Warden), Category::Staff, Tier::Custodian)
            .expect("delta");
        let warden_grant = ctx.tiers.record(Tier::Warden).expect("warden").grant;
        let custodian_grant = ctx.tiers.record(Tier::Custodian).expect("custodian").grant;
        assert_eq!(delta.remove, vec![warden_grant]);
        assert_eq!(delta.add, vec![custodian_grant]);
    }

    #[test]
    fn intake_to_staff_adds_the_staff_bundle() {
        let ctx = context_builder().build();
        let delta =
            membership_delta(&ctx, None, Category::Intake, Tier::Undocumented).expect("delta");
        for grant in &ctx.tiers.bundles().staff {
            assert!(delta.add.contains(grant));
        }
        assert!(delta.remove.is_empty());
    }
}
