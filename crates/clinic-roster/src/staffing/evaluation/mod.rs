pub mod bands;
pub mod summary;

use std::collections::HashSet;

use super::domain::{MemberId, RosterEntry, MAX_POINTS};
use super::ports::{grant_all, revoke_all};
use super::store::StoreError;
use super::StaffingContext;
use bands::{apply_streaks, ScoreBand, ADEQUATE_MIN};
use summary::{CycleReport, DemotionCandidate, PointAward, PromotionCandidate, PunitiveReset};

/// Bad-streak length that puts a member up for demotion review.
pub const DEMOTION_REVIEW_STREAK: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("member is not on the staff roster")]
    NotStaff,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Weekly batch job converting accumulated weekly score into excellence
/// point deltas, streak movement, and evaluation-mode transitions.
///
/// The cycle operates on a snapshot read of the roster; each member's
/// update is written as computed. Re-running the cycle is not idempotent,
/// so the caller must prevent double-fire (the api scheduler holds a mutex
/// across timer and operator triggers).
pub struct EvaluationEngine {
    ctx: StaffingContext,
}

impl EvaluationEngine {
    pub fn new(ctx: StaffingContext) -> Self {
        Self { ctx }
    }

    /// Accumulate weekly score for a member outside the cycle.
    pub fn record_score(&self, member: MemberId, delta: i64) -> Result<RosterEntry, EvaluationError> {
        let mut entry = self
            .ctx
            .roster
            .get(member)?
            .ok_or(EvaluationError::NotStaff)?;
        entry.weekly_score = entry.weekly_score.saturating_add(delta);
        self.ctx.roster.upsert(entry.clone())?;
        Ok(entry)
    }

    pub async fn run_cycle(&self) -> Result<CycleReport, EvaluationError> {
        let snapshot = self.ctx.roster.all()?;
        tracing::info!(members = snapshot.len(), "evaluation cycle started");

        let mut newly_marked: HashSet<MemberId> = HashSet::new();
        let mut worked: Vec<(RosterEntry, i64)> = Vec::with_capacity(snapshot.len());
        let mut awards: Vec<PointAward> = Vec::new();

        for mut entry in snapshot {
            let score = entry.weekly_score;

            // Top-tier holders are evaluation-exempt; their weekly score
            // still resets with everyone else's at the end of the cycle.
            if entry.tier.evaluation_exempt() {
                worked.push((entry, score));
                continue;
            }

            if entry.points >= MAX_POINTS && !entry.evaluation_mode {
                entry.evaluation_mode = true;
                newly_marked.insert(entry.member);
            }

            let band = ScoreBand::for_score(score);
            let (bad, minimum) = apply_streaks(band, entry.bad_streak, entry.minimum_streak);
            entry.bad_streak = bad;
            entry.minimum_streak = minimum;

            // Members in evaluation mode earn no ordinary points during
            // the grace period; their streaks still move on the real score.
            if !entry.evaluation_mode {
                let delta = band.point_delta();
                if delta > 0 {
                    let old_points = entry.points;
                    entry.points = old_points.saturating_add(delta).min(MAX_POINTS);
                    if entry.points == MAX_POINTS {
                        entry.evaluation_mode = true;
                        newly_marked.insert(entry.member);
                    }
                    self.reconcile_excellence_grants(&entry, old_points).await;
                    awards.push(PointAward {
                        member: entry.member,
                        name: entry.name.clone(),
                        tier: entry.tier,
                        delta: entry.points - old_points,
                        total: entry.points,
                    });
                }
            }

            self.ctx.roster.upsert(entry.clone())?;
            worked.push((entry, score));
        }

        // Failed-evaluation sweep. Members who entered evaluation mode in a
        // prior cycle and could not sustain an adequate weekly score lose
        // the flag and every point.
        let mut resets: Vec<PunitiveReset> = Vec::new();
        for (entry, score) in worked.iter_mut() {
            if entry.tier.evaluation_exempt() {
                continue;
            }
            if entry.evaluation_mode
                && !newly_marked.contains(&entry.member)
                && *score < ADEQUATE_MIN
            {
                entry.evaluation_mode = false;
                entry.points = 0;
                self.revoke_all_excellence_grants(entry).await;
                self.ctx.roster.upsert(entry.clone())?;
                resets.push(PunitiveReset {
                    member: entry.member,
                    name: entry.name.clone(),
                    tier: entry.tier,
                });
            }
        }

        // End-of-cycle weekly-score reset, applied exactly once per entry.
        for (entry, _) in worked.iter_mut() {
            if entry.weekly_score != 0 {
                entry.weekly_score = 0;
                self.ctx.roster.upsert(entry.clone())?;
            }
        }

        let mut report = CycleReport {
            evaluated: worked.len(),
            awards,
            resets,
            ..CycleReport::default()
        };

        for (entry, _) in &worked {
            if entry.tier.evaluation_exempt() {
                continue;
            }
            if entry.evaluation_mode && entry.points >= MAX_POINTS {
                report.promotion_candidates.push(PromotionCandidate {
                    member: entry.member,
                    name: entry.name.clone(),
                    tier: entry.tier,
                    target: entry.tier.promotion_target(),
                });
            }
            if entry.bad_streak >= DEMOTION_REVIEW_STREAK {
                report.demotion_candidates.push(DemotionCandidate {
                    member: entry.member,
                    name: entry.name.clone(),
                    tier: entry.tier,
                    target: entry.tier.demotion_target(),
                    bad_streak: entry.bad_streak,
                });
            }
        }
        report
            .promotion_candidates
            .sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.name.cmp(&b.name)));
        report
            .demotion_candidates
            .sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.name.cmp(&b.name)));

        let text = report.render();
        if let Err(err) = self.ctx.notifier.broadcast(&text).await {
            tracing::warn!(error = %err, "cycle summary broadcast failed");
        }

        tracing::info!(
            awards = report.awards.len(),
            resets = report.resets.len(),
            "evaluation cycle finished"
        );
        Ok(report)
    }

    /// Point changes reconcile the external point-level memberships:
    /// every level at or below the old count is revoked, then the grant
    /// for the new count is added.
    async fn reconcile_excellence_grants(&self, entry: &RosterEntry, old_points: u8) {
        let Some(linked) = entry.linked else {
            return;
        };
        let limit = self.ctx.outbound_timeout();
        let remove: Vec<_> = (1..=old_points)
            .filter_map(|level| self.ctx.tiers.excellence_grant(level))
            .collect();
        revoke_all(self.ctx.directory.as_ref(), linked, &remove, limit).await;
        if let Some(grant) = self.ctx.tiers.excellence_grant(entry.points) {
            grant_all(self.ctx.directory.as_ref(), linked, &[grant], limit).await;
        }
    }

    async fn revoke_all_excellence_grants(&self, entry: &RosterEntry) {
        let Some(linked) = entry.linked else {
            return;
        };
        revoke_all(
            self.ctx.directory.as_ref(),
            linked,
            self.ctx.tiers.excellence_grants(),
            self.ctx.outbound_timeout(),
        )
        .await;
    }
}
