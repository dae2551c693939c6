use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Membership-grant identifier on the local platform.
pub type GrantId = u64;
/// Rank code understood by the remote ranking service.
pub type RankCode = u64;

/// Number of excellence point levels carrying their own membership grant.
pub const EXCELLENCE_LEVELS: usize = 5;

/// A rung in the staff ladder, ordered lowest to highest privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Admittee,
    Patient,
    LunaticPatient,
    HonoredPatient,
    Undocumented,
    Noviciate,
    Attendant,
    Warden,
    Custodian,
    Concierge,
    Lecturer,
}

/// Coarse grouping of tiers driving which membership bundle applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Intake,
    Patient,
    Staff,
    SeniorStaff,
}

impl Category {
    /// Staff and senior staff share the staff membership bundle.
    pub const fn is_staff_side(self) -> bool {
        matches!(self, Category::Staff | Category::SeniorStaff)
    }
}

impl Tier {
    pub const ALL: [Tier; 11] = [
        Tier::Admittee,
        Tier::Patient,
        Tier::LunaticPatient,
        Tier::HonoredPatient,
        Tier::Undocumented,
        Tier::Noviciate,
        Tier::Attendant,
        Tier::Warden,
        Tier::Custodian,
        Tier::Concierge,
        Tier::Lecturer,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Tier::Admittee => "Admittee",
            Tier::Patient => "Patient",
            Tier::LunaticPatient => "Lunatic Patient",
            Tier::HonoredPatient => "Honored Patient",
            Tier::Undocumented => "Undocumented",
            Tier::Noviciate => "Noviciate",
            Tier::Attendant => "Attendant",
            Tier::Warden => "Warden",
            Tier::Custodian => "Custodian",
            Tier::Concierge => "Concierge",
            Tier::Lecturer => "Lecturer",
        }
    }

    pub const fn category(self) -> Category {
        match self {
            Tier::Admittee => Category::Intake,
            Tier::Patient | Tier::LunaticPatient | Tier::HonoredPatient => Category::Patient,
            Tier::Undocumented
            | Tier::Noviciate
            | Tier::Attendant
            | Tier::Warden
            | Tier::Custodian => Category::Staff,
            Tier::Concierge | Tier::Lecturer => Category::SeniorStaff,
        }
    }

    /// Next rung up the ladder. `None` at the top: there is nowhere left
    /// to promote to.
    pub fn promotion_target(self) -> Option<Tier> {
        let index = Tier::ALL.iter().position(|tier| *tier == self)?;
        Tier::ALL.get(index + 1).copied()
    }

    /// Policy fallback for demotion. The two senior-most tiers drop to
    /// Custodian; every other staff tier drops to the lowest staff tier;
    /// non-staff tiers drop to the intake tier.
    pub const fn demotion_target(self) -> Tier {
        match self {
            Tier::Concierge | Tier::Lecturer => Tier::Custodian,
            Tier::Undocumented
            | Tier::Noviciate
            | Tier::Attendant
            | Tier::Warden
            | Tier::Custodian => Tier::Undocumented,
            _ => Tier::Admittee,
        }
    }

    /// Holders of the top tier are exempt from the weekly evaluation.
    pub fn evaluation_exempt(self) -> bool {
        self.promotion_target().is_none()
    }
}

/// External identifiers attached to one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierRecord {
    pub tier: Tier,
    pub rank_code: RankCode,
    pub grant: GrantId,
}

/// Membership bundles granted alongside a category, not a single tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleGrants {
    pub staff: Vec<GrantId>,
    pub patient: Vec<GrantId>,
    pub leave: Vec<GrantId>,
}

/// Static lookup table mapping every tier to its external identifiers,
/// with O(1) reverse lookups by rank code and by grant id.
#[derive(Debug, Clone)]
pub struct TierDirectory {
    records: HashMap<Tier, TierRecord>,
    by_code: HashMap<RankCode, Tier>,
    by_grant: HashMap<GrantId, Tier>,
    excellence: [GrantId; EXCELLENCE_LEVELS],
    bundles: BundleGrants,
}

impl TierDirectory {
    pub fn new(
        records: Vec<TierRecord>,
        excellence: [GrantId; EXCELLENCE_LEVELS],
        bundles: BundleGrants,
    ) -> Result<Self, HierarchyError> {
        let mut by_tier = HashMap::new();
        let mut by_code = HashMap::new();
        let mut by_grant = HashMap::new();

        for record in records {
            if by_tier.insert(record.tier, record).is_some() {
                return Err(HierarchyError::DuplicateTier(record.tier));
            }
            if by_code.insert(record.rank_code, record.tier).is_some() {
                return Err(HierarchyError::DuplicateRankCode(record.rank_code));
            }
            if by_grant.insert(record.grant, record.tier).is_some() {
                return Err(HierarchyError::DuplicateGrant(record.grant));
            }
        }

        for tier in Tier::ALL {
            if !by_tier.contains_key(&tier) {
                return Err(HierarchyError::MissingTier(tier));
            }
        }

        Ok(Self {
            records: by_tier,
            by_code,
            by_grant,
            excellence,
            bundles,
        })
    }

    pub fn record(&self, tier: Tier) -> Result<&TierRecord, HierarchyError> {
        self.records
            .get(&tier)
            .ok_or(HierarchyError::MissingTier(tier))
    }

    pub fn tier_by_rank_code(&self, code: RankCode) -> Option<Tier> {
        self.by_code.get(&code).copied()
    }

    pub fn tier_by_grant(&self, grant: GrantId) -> Option<Tier> {
        self.by_grant.get(&grant).copied()
    }

    /// Grant for a point level in 1..=5. Level 0 holds no grant.
    pub fn excellence_grant(&self, points: u8) -> Option<GrantId> {
        if points == 0 {
            return None;
        }
        self.excellence.get(usize::from(points) - 1).copied()
    }

    pub fn excellence_grants(&self) -> &[GrantId; EXCELLENCE_LEVELS] {
        &self.excellence
    }

    pub fn bundles(&self) -> &BundleGrants {
        &self.bundles
    }
}

/// Misconfigured tier tables are fatal to the single operation, never a
/// silent default.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("tier {} has no external mapping", .0.label())]
    MissingTier(Tier),
    #[error("tier {} is mapped more than once", .0.label())]
    DuplicateTier(Tier),
    #[error("rank code {0} is mapped to more than one tier")]
    DuplicateRankCode(RankCode),
    #[error("grant id {0} is mapped to more than one tier")]
    DuplicateGrant(GrantId),
}
