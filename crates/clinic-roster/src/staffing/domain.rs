use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::hierarchy::Tier;

/// Stable external member identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub u64);

/// Optional local-platform identity linked to a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkedId(pub u64);

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for LinkedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Excellence point ceiling; reaching it triggers evaluation mode.
pub const MAX_POINTS: u8 = 5;

/// Durable record for a member currently holding a staff tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub member: MemberId,
    pub name: String,
    pub linked: Option<LinkedId>,
    pub tier: Tier,
    pub points: u8,
    pub evaluation_mode: bool,
    pub weekly_score: i64,
    pub bad_streak: u32,
    pub minimum_streak: u32,
    pub last_leave_end: Option<DateTime<Utc>>,
}

impl RosterEntry {
    /// Fresh entry with zeroed evaluation state, used when a member first
    /// joins the staff side of the ladder.
    pub fn new(member: MemberId, name: impl Into<String>, linked: Option<LinkedId>, tier: Tier) -> Self {
        Self {
            member,
            name: name.into(),
            linked,
            tier,
            points: 0,
            evaluation_mode: false,
            weekly_score: 0,
            bad_streak: 0,
            minimum_streak: 0,
            last_leave_end: None,
        }
    }
}

/// Record for a member known to the organization but below the staff line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedMember {
    pub member: MemberId,
    pub name: String,
    pub linked: Option<LinkedId>,
}

/// Scheduled end of a leave window, normalized at the write boundary.
///
/// Upstream data carries three shapes: RFC 3339 text, epoch seconds, and
/// operator free text such as "Manual inactivity for 30 days". The first
/// two become a real instant; free text stays opaque and is flagged as
/// non-adjustable rather than parsed for a duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LeaveEnd {
    At(DateTime<Utc>),
    Manual(String),
}

impl LeaveEnd {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return LeaveEnd::At(parsed.with_timezone(&Utc));
        }
        if let Ok(epoch) = trimmed.parse::<i64>() {
            if let Some(instant) = Utc.timestamp_opt(epoch, 0).single() {
                return LeaveEnd::At(instant);
            }
        }
        LeaveEnd::Manual(trimmed.to_string())
    }

    /// Concrete instant for cooldown bookkeeping. Free text has no
    /// machine-readable expiry and resolves to the moment of resolution.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            LeaveEnd::At(at) => *at,
            LeaveEnd::Manual(_) => now,
        }
    }

    pub const fn is_manual(&self) -> bool {
        matches!(self, LeaveEnd::Manual(_))
    }
}

/// Active leave window for one member. At most one exists per member; the
/// snapshot restores the roster entry when the leave ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub snapshot: RosterEntry,
    pub leave_start: DateTime<Utc>,
    pub leave_end: LeaveEnd,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_text() {
        let end = LeaveEnd::parse("2026-09-04T16:00:00Z");
        assert_eq!(
            end,
            LeaveEnd::At(Utc.with_ymd_and_hms(2026, 9, 4, 16, 0, 0).unwrap())
        );
    }

    #[test]
    fn parses_epoch_seconds() {
        let end = LeaveEnd::parse("1788883200");
        assert!(matches!(end, LeaveEnd::At(_)));
        assert!(!end.is_manual());
    }

    #[test]
    fn free_text_becomes_manual() {
        let end = LeaveEnd::parse("Manual inactivity for 30 days");
        assert!(end.is_manual());
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        assert_eq!(end.resolve(now), now);
    }

    #[test]
    fn instant_resolves_to_itself() {
        let at = Utc.with_ymd_and_hms(2026, 9, 4, 16, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap();
        assert_eq!(LeaveEnd::At(at).resolve(now), at);
    }
}
