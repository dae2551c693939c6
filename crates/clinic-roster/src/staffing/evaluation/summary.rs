use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;

use crate::staffing::domain::MemberId;
use crate::staffing::hierarchy::Tier;

/// One member's point change this cycle.
#[derive(Debug, Clone, Serialize)]
pub struct PointAward {
    pub member: MemberId,
    pub name: String,
    pub tier: Tier,
    pub delta: u8,
    pub total: u8,
}

/// A member punitively reset by the failed-evaluation sweep.
#[derive(Debug, Clone, Serialize)]
pub struct PunitiveReset {
    pub member: MemberId,
    pub name: String,
    pub tier: Tier,
}

/// A member holding max points in evaluation mode at cycle end.
#[derive(Debug, Clone, Serialize)]
pub struct PromotionCandidate {
    pub member: MemberId,
    pub name: String,
    pub tier: Tier,
    pub target: Option<Tier>,
}

/// A member whose bad streak has crossed the demotion-review threshold.
#[derive(Debug, Clone, Serialize)]
pub struct DemotionCandidate {
    pub member: MemberId,
    pub name: String,
    pub tier: Tier,
    pub target: Tier,
    pub bad_streak: u32,
}

/// Outcome of one weekly evaluation cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub evaluated: usize,
    pub awards: Vec<PointAward>,
    pub resets: Vec<PunitiveReset>,
    pub promotion_candidates: Vec<PromotionCandidate>,
    pub demotion_candidates: Vec<DemotionCandidate>,
}

impl CycleReport {
    /// Human-readable summary for the broadcast channel. Earners are
    /// grouped by tier in ascending tier order, names sorted within each
    /// tier, so repeated renders of the same report are identical.
    pub fn render(&self) -> String {
        let mut text = String::from("Weekly excellence summary\n");

        if self.awards.is_empty() {
            text.push_str("No point changes this cycle.\n");
        } else {
            let mut by_tier: BTreeMap<Tier, Vec<&PointAward>> = BTreeMap::new();
            for award in &self.awards {
                by_tier.entry(award.tier).or_default().push(award);
            }
            for (tier, mut awards) in by_tier {
                awards.sort_by(|a, b| a.name.cmp(&b.name));
                let _ = writeln!(text, "== {} ==", tier.label());
                for award in awards {
                    let _ = writeln!(
                        text,
                        "{}: +{} (total {})",
                        award.name, award.delta, award.total
                    );
                }
            }
        }

        if !self.resets.is_empty() {
            text.push_str("\nFailed evaluations:\n");
            for reset in &self.resets {
                let _ = writeln!(text, "{} ({}) reset to 0 points", reset.name, reset.tier.label());
            }
        }

        if !self.promotion_candidates.is_empty() {
            text.push_str("\nPromotion candidates:\n");
            for candidate in &self.promotion_candidates {
                match candidate.target {
                    Some(target) => {
                        let _ = writeln!(
                            text,
                            "{}: {} -> {}",
                            candidate.name,
                            candidate.tier.label(),
                            target.label()
                        );
                    }
                    None => {
                        let _ = writeln!(
                            text,
                            "{}: already at {}",
                            candidate.name,
                            candidate.tier.label()
                        );
                    }
                }
            }
        }

        if !self.demotion_candidates.is_empty() {
            text.push_str("\nDemotion review:\n");
            for candidate in &self.demotion_candidates {
                let _ = writeln!(
                    text,
                    "{}: {} -> {} (bad streak {})",
                    candidate.name,
                    candidate.tier.label(),
                    candidate.target.label(),
                    candidate.bad_streak
                );
            }
        }

        text
    }
}
