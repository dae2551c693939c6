use std::sync::Arc;

use super::domain::{LinkedId, MemberId};
use super::store::{LeaveStore, RosterStore, StoreError, VerifiedStore};

/// Which table ultimately answered the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityOrigin {
    Roster,
    Verified,
    OnLeave,
}

/// A member identity pinned down by the resolution chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedMember {
    pub member: MemberId,
    pub name: String,
    pub linked: Option<LinkedId>,
    pub origin: IdentityOrigin,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("no member matches '{0}'")]
    Unresolved(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a raw numeric token most plausibly names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericHint {
    Linked(LinkedId),
    Member(MemberId),
}

/// Extract a linked id from platform mention syntax, `<@123>` or `<@!123>`.
pub fn parse_mention(raw: &str) -> Option<LinkedId> {
    let inner = raw
        .trim()
        .strip_prefix("<@")?
        .strip_suffix('>')?
        .trim_start_matches('!');
    inner.parse::<u64>().ok().map(LinkedId)
}

/// Classify a bare digit string. Local-platform snowflake ids run 17 digits
/// or longer; anything shorter is treated as an external member id.
pub fn classify_digits(raw: &str) -> Option<NumericHint> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let value = trimmed.parse::<u64>().ok()?;
    if trimmed.len() >= 17 {
        Some(NumericHint::Linked(LinkedId(value)))
    } else {
        Some(NumericHint::Member(MemberId(value)))
    }
}

/// Ordered chain of lookup strategies returning the first definitive match.
///
/// Mention parsing and the digit heuristic are pure; the remaining
/// strategies consult the roster, verified, and leave tables in that order,
/// ending with a case-insensitive name scan. A miss is an explicit error,
/// never a default.
pub struct IdentityResolver {
    roster: Arc<dyn RosterStore>,
    verified: Arc<dyn VerifiedStore>,
    leave: Arc<dyn LeaveStore>,
}

impl IdentityResolver {
    pub fn new(
        roster: Arc<dyn RosterStore>,
        verified: Arc<dyn VerifiedStore>,
        leave: Arc<dyn LeaveStore>,
    ) -> Self {
        Self {
            roster,
            verified,
            leave,
        }
    }

    pub fn resolve(&self, raw: &str) -> Result<ResolvedMember, IdentityError> {
        if let Some(linked) = parse_mention(raw) {
            if let Some(found) = self.by_linked(linked)? {
                return Ok(found);
            }
            return Err(IdentityError::Unresolved(raw.to_string()));
        }

        match classify_digits(raw) {
            Some(NumericHint::Linked(linked)) => {
                if let Some(found) = self.by_linked(linked)? {
                    return Ok(found);
                }
            }
            Some(NumericHint::Member(member)) => {
                if let Some(found) = self.by_member(member)? {
                    return Ok(found);
                }
            }
            None => {
                if let Some(found) = self.by_name(raw.trim())? {
                    return Ok(found);
                }
            }
        }

        Err(IdentityError::Unresolved(raw.to_string()))
    }

    fn by_member(&self, member: MemberId) -> Result<Option<ResolvedMember>, IdentityError> {
        if let Some(entry) = self.roster.get(member)? {
            return Ok(Some(ResolvedMember {
                member: entry.member,
                name: entry.name,
                linked: entry.linked,
                origin: IdentityOrigin::Roster,
            }));
        }
        if let Some(record) = self.verified.get(member)? {
            return Ok(Some(ResolvedMember {
                member: record.member,
                name: record.name,
                linked: record.linked,
                origin: IdentityOrigin::Verified,
            }));
        }
        if let Some(record) = self.leave.get(member)? {
            return Ok(Some(ResolvedMember {
                member: record.snapshot.member,
                name: record.snapshot.name,
                linked: record.snapshot.linked,
                origin: IdentityOrigin::OnLeave,
            }));
        }
        Ok(None)
    }

    fn by_linked(&self, linked: LinkedId) -> Result<Option<ResolvedMember>, IdentityError> {
        if let Some(entry) = self.roster.find_by_linked(linked)? {
            return Ok(Some(ResolvedMember {
                member: entry.member,
                name: entry.name,
                linked: entry.linked,
                origin: IdentityOrigin::Roster,
            }));
        }
        if let Some(record) = self.verified.find_by_linked(linked)? {
            return Ok(Some(ResolvedMember {
                member: record.member,
                name: record.name,
                linked: record.linked,
                origin: IdentityOrigin::Verified,
            }));
        }
        if let Some(record) = self.leave.find_by_linked(linked)? {
            return Ok(Some(ResolvedMember {
                member: record.snapshot.member,
                name: record.snapshot.name,
                linked: record.snapshot.linked,
                origin: IdentityOrigin::OnLeave,
            }));
        }
        Ok(None)
    }

    fn by_name(&self, name: &str) -> Result<Option<ResolvedMember>, IdentityError> {
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(entry) = self.roster.find_by_name(name)? {
            return Ok(Some(ResolvedMember {
                member: entry.member,
                name: entry.name,
                linked: entry.linked,
                origin: IdentityOrigin::Roster,
            }));
        }
        if let Some(record) = self.verified.find_by_name(name)? {
            return Ok(Some(ResolvedMember {
                member: record.member,
                name: record.name,
                linked: record.linked,
                origin: IdentityOrigin::Verified,
            }));
        }
        if let Some(record) = self.leave.find_by_name(name)? {
            return Ok(Some(ResolvedMember {
                member: record.snapshot.member,
                name: record.snapshot.name,
                linked: record.snapshot.linked,
                origin: IdentityOrigin::OnLeave,
            }));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staffing::domain::{LeaveEnd, LeaveRecord, RosterEntry, VerifiedMember};
    use crate::staffing::hierarchy::Tier;
    use crate::staffing::store::{MemoryLeave, MemoryRoster, MemoryVerified};
    use chrono::{TimeZone, Utc};

    fn resolver() -> IdentityResolver {
        let roster = Arc::new(MemoryRoster::default());
        let verified = Arc::new(MemoryVerified::default());
        let leave = Arc::new(MemoryLeave::default());

        roster
            .upsert(RosterEntry::new(
                MemberId(512),
                "Greta Hall",
                Some(LinkedId(98_765_432_101_234_567)),
                Tier::Warden,
            ))
            .expect("seed roster");
        verified
            .upsert(VerifiedMember {
                member: MemberId(640),
                name: "Piotr Sand".to_string(),
                linked: None,
            })
            .expect("seed verified");
        leave
            .insert(LeaveRecord {
                snapshot: RosterEntry::new(
                    MemberId(777),
                    "Ines Vogel",
                    Some(LinkedId(11_111_111_111_111_111)),
                    Tier::Attendant,
                ),
                leave_start: Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap(),
                leave_end: LeaveEnd::parse("2026-08-20T00:00:00Z"),
                reason: "travel".to_string(),
            })
            .expect("seed leave");

        IdentityResolver::new(roster, verified, leave)
    }

    #[test]
    fn mention_syntax_yields_linked_id() {
        assert_eq!(
            parse_mention("<@98765432101234567>"),
            Some(LinkedId(98_765_432_101_234_567))
        );
        assert_eq!(
            parse_mention("<@!98765432101234567>"),
            Some(LinkedId(98_765_432_101_234_567))
        );
        assert_eq!(parse_mention("plain text"), None);
    }

    #[test]
    fn digit_length_splits_linked_from_member() {
        assert_eq!(
            classify_digits("98765432101234567"),
            Some(NumericHint::Linked(LinkedId(98_765_432_101_234_567)))
        );
        assert_eq!(
            classify_digits("512"),
            Some(NumericHint::Member(MemberId(512)))
        );
        assert_eq!(classify_digits("not digits"), None);
    }

    #[test]
    fn resolves_roster_member_by_external_id() {
        let found = resolver().resolve("512").expect("resolves");
        assert_eq!(found.member, MemberId(512));
        assert_eq!(found.origin, IdentityOrigin::Roster);
    }

    #[test]
    fn resolves_mention_through_linked_lookup() {
        let found = resolver()
            .resolve("<@98765432101234567>")
            .expect("resolves");
        assert_eq!(found.member, MemberId(512));
    }

    #[test]
    fn falls_back_to_case_insensitive_name_scan() {
        let found = resolver().resolve("piotr sand").expect("resolves");
        assert_eq!(found.member, MemberId(640));
        assert_eq!(found.origin, IdentityOrigin::Verified);
    }

    #[test]
    fn leave_table_answers_for_members_on_leave() {
        let found = resolver().resolve("777").expect("resolves");
        assert_eq!(found.origin, IdentityOrigin::OnLeave);
    }

    #[test]
    fn miss_is_an_explicit_error() {
        assert!(matches!(
            resolver().resolve("nobody here"),
            Err(IdentityError::Unresolved(_))
        ));
    }
}
