use chrono::{DateTime, Duration, Utc};

use super::domain::{LeaveEnd, LeaveRecord, MemberId, RosterEntry};
use super::ports::{grant_all, notify_direct, revoke_all, set_rank_bounded};
use super::store::StoreError;
use super::StaffingContext;

#[derive(Debug, thiserror::Error)]
pub enum LeaveError {
    #[error("member is already on leave")]
    AlreadyOnLeave,
    #[error("member is not on leave")]
    NotOnLeave,
    #[error("member is not on the staff roster")]
    NotStaff,
    #[error("leave cooldown active, {remaining_days} day(s) remaining")]
    CooldownActive { remaining_days: i64 },
    #[error("leave must run for at least {min_days} day(s)")]
    TooShort { min_days: i64 },
    #[error("adjusted leave end would be in the past")]
    EndsInPast,
    #[error("operator-entered leave duration is not machine-adjustable")]
    ManualDuration,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cooldown gate: a member may start a new leave only once the configured
/// number of whole days has elapsed since their last leave ended. Members
/// who have never taken leave pass unconditionally.
pub fn can_start_leave(
    last_leave_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    cooldown_days: i64,
) -> bool {
    match last_leave_end {
        None => true,
        Some(ended) => now - ended >= Duration::days(cooldown_days),
    }
}

/// Per-member leave lifecycle: ACTIVE -> ON_LEAVE -> ACTIVE.
///
/// Starting a leave snapshots the roster entry into a leave record and
/// removes the entry; ending a leave rebuilds the entry from the snapshot.
/// External rank and membership changes around either edge are best-effort
/// and never block the local state transition.
pub struct LeaveScheduler {
    ctx: StaffingContext,
}

impl LeaveScheduler {
    pub fn new(ctx: StaffingContext) -> Self {
        Self { ctx }
    }

    /// Self-service leave request. `operator` skips the cooldown and
    /// minimum-length checks for operator-entered leaves.
    pub async fn start_leave(
        &self,
        member: MemberId,
        days: i64,
        minutes: i64,
        reason: &str,
        operator: bool,
        now: DateTime<Utc>,
    ) -> Result<LeaveRecord, LeaveError> {
        if self.ctx.leave.get(member)?.is_some() {
            return Err(LeaveError::AlreadyOnLeave);
        }
        let entry = self.ctx.roster.get(member)?.ok_or(LeaveError::NotStaff)?;

        if !operator {
            let cooldown = self.ctx.policy.leave_cooldown_days;
            if !can_start_leave(entry.last_leave_end, now, cooldown) {
                let elapsed = entry
                    .last_leave_end
                    .map(|ended| (now - ended).num_days())
                    .unwrap_or(cooldown);
                return Err(LeaveError::CooldownActive {
                    remaining_days: (cooldown - elapsed).max(1),
                });
            }
            let requested_minutes = days * 1_440 + minutes;
            if requested_minutes < self.ctx.policy.min_leave_days * 1_440 {
                return Err(LeaveError::TooShort {
                    min_days: self.ctx.policy.min_leave_days,
                });
            }
        }

        let leave_end = LeaveEnd::At(now + Duration::days(days) + Duration::minutes(minutes));
        self.begin(entry, now, leave_end, reason).await
    }

    /// Operator-imported leave with a raw end value. RFC 3339 text and
    /// epoch seconds become a scheduled expiry; anything else is kept as
    /// non-adjustable free text with no machine expiry.
    pub async fn record_manual_leave(
        &self,
        member: MemberId,
        raw_end: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<LeaveRecord, LeaveError> {
        if self.ctx.leave.get(member)?.is_some() {
            return Err(LeaveError::AlreadyOnLeave);
        }
        let entry = self.ctx.roster.get(member)?.ok_or(LeaveError::NotStaff)?;
        self.begin(entry, now, LeaveEnd::parse(raw_end), reason).await
    }

    async fn begin(
        &self,
        entry: RosterEntry,
        now: DateTime<Utc>,
        leave_end: LeaveEnd,
        reason: &str,
    ) -> Result<LeaveRecord, LeaveError> {
        let record = LeaveRecord {
            snapshot: entry.clone(),
            leave_start: now,
            leave_end,
            reason: reason.to_string(),
        };
        self.ctx.leave.insert(record.clone())?;
        self.ctx.roster.delete(entry.member)?;

        let limit = self.ctx.outbound_timeout();
        if let Err(err) = set_rank_bounded(
            self.ctx.ranking.as_ref(),
            entry.member,
            self.ctx.policy.on_leave_rank_code,
            limit,
        )
        .await
        {
            tracing::warn!(member = %entry.member, error = %err, "on-leave rank change failed");
        }

        if let Some(linked) = entry.linked {
            let bundles = self.ctx.tiers.bundles();
            revoke_all(self.ctx.directory.as_ref(), linked, &bundles.staff, limit).await;
            revoke_all(
                self.ctx.directory.as_ref(),
                linked,
                self.ctx.tiers.excellence_grants(),
                limit,
            )
            .await;
            grant_all(self.ctx.directory.as_ref(), linked, &bundles.leave, limit).await;
        }

        notify_direct(
            self.ctx.notifier.as_ref(),
            entry.linked,
            &format!("Your leave has started. Reason on file: {reason}"),
        )
        .await;

        tracing::info!(member = %entry.member, "leave started");
        Ok(record)
    }

    /// End a leave and reinstate the member. Removing the record is the
    /// idempotency boundary: once it is gone, a repeat call (or a
    /// concurrent poll tick) sees nothing to do.
    pub async fn end_leave(
        &self,
        member: MemberId,
        now: DateTime<Utc>,
    ) -> Result<RosterEntry, LeaveError> {
        let record = self.ctx.leave.take(member)?.ok_or(LeaveError::NotOnLeave)?;

        let mut entry = record.snapshot;
        entry.last_leave_end = Some(now);
        self.ctx.roster.upsert(entry.clone())?;

        let limit = self.ctx.outbound_timeout();
        match self.ctx.tiers.record(entry.tier) {
            Ok(tier_record) => {
                if let Err(err) = set_rank_bounded(
                    self.ctx.ranking.as_ref(),
                    entry.member,
                    tier_record.rank_code,
                    limit,
                )
                .await
                {
                    tracing::warn!(member = %entry.member, error = %err, "rank restore failed");
                }
            }
            Err(err) => {
                tracing::error!(member = %entry.member, error = %err, "tier has no external mapping");
            }
        }

        if let Some(linked) = entry.linked {
            let bundles = self.ctx.tiers.bundles();
            revoke_all(self.ctx.directory.as_ref(), linked, &bundles.leave, limit).await;
            grant_all(self.ctx.directory.as_ref(), linked, &bundles.staff, limit).await;
            if let Some(grant) = self.ctx.tiers.excellence_grant(entry.points) {
                grant_all(self.ctx.directory.as_ref(), linked, &[grant], limit).await;
            }
        }

        notify_direct(
            self.ctx.notifier.as_ref(),
            entry.linked,
            "Your leave has ended. Welcome back.",
        )
        .await;

        tracing::info!(member = %entry.member, "leave ended");
        Ok(entry)
    }

    /// Scan every leave record and end the expired ones. Free-text records
    /// carry no machine expiry and are skipped. One failing record is
    /// logged and does not block the rest of the scan.
    pub async fn poll_expirations(&self, now: DateTime<Utc>) -> Result<Vec<MemberId>, LeaveError> {
        let records = self.ctx.leave.all()?;
        let mut processed = Vec::new();

        for record in records {
            let LeaveEnd::At(scheduled) = record.leave_end else {
                continue;
            };
            if scheduled > now {
                continue;
            }
            let member = record.snapshot.member;
            match self.end_leave(member, now).await {
                Ok(_) => processed.push(member),
                Err(LeaveError::NotOnLeave) => {
                    // Another tick already handled this record.
                }
                Err(err) => {
                    tracing::warn!(member = %member, error = %err, "leave expiry failed");
                }
            }
        }

        Ok(processed)
    }

    /// Shift a scheduled expiry by whole days. Free-text operator leaves
    /// are not machine-adjustable and the expiry may never land in the past.
    pub async fn adjust_leave_end(
        &self,
        member: MemberId,
        delta_days: i64,
        now: DateTime<Utc>,
    ) -> Result<LeaveRecord, LeaveError> {
        let mut record = self.ctx.leave.get(member)?.ok_or(LeaveError::NotOnLeave)?;

        let LeaveEnd::At(scheduled) = record.leave_end else {
            return Err(LeaveError::ManualDuration);
        };
        let adjusted = scheduled + Duration::days(delta_days);
        if adjusted <= now {
            return Err(LeaveError::EndsInPast);
        }

        record.leave_end = LeaveEnd::At(adjusted);
        self.ctx.leave.update(record.clone())?;

        notify_direct(
            self.ctx.notifier.as_ref(),
            record.snapshot.linked,
            &format!("Your leave now ends on {}", adjusted.format("%Y-%m-%d %H:%M UTC")),
        )
        .await;

        Ok(record)
    }
}
