use super::common::{context_builder, staff_entry, EXCELLENCE};
use crate::staffing::domain::{LinkedId, MemberId};
use crate::staffing::evaluation::{EvaluationEngine, EvaluationError};
use crate::staffing::hierarchy::Tier;
use crate::staffing::store::RosterStore;

#[tokio::test]
async fn high_score_caps_points_and_enters_evaluation_mode() {
    let harness = context_builder();
    let mut entry = staff_entry(1, "Greta Hall", Tier::Warden);
    entry.points = 2;
    entry.weekly_score = 420;
    harness.roster.upsert(entry).expect("seed");
    harness.directory.seed(LinkedId(10), &[EXCELLENCE[1]]);

    let engine = EvaluationEngine::new(harness.build());
    let report = engine.run_cycle().await.expect("cycle");

    let entry = harness
        .roster
        .get(MemberId(1))
        .expect("get")
        .expect("entry survives");
    assert_eq!(entry.points, 5);
    assert!(entry.evaluation_mode);
    assert_eq!(entry.weekly_score, 0);

    let held = harness.directory.held(LinkedId(10));
    assert!(held.contains(&EXCELLENCE[4]), "holds the 5-point grant");
    assert!(!held.contains(&EXCELLENCE[1]), "old 2-point grant revoked");

    assert_eq!(report.awards.len(), 1);
    assert_eq!(report.awards[0].delta, 3, "delta is capped at the maximum");
    assert_eq!(report.promotion_candidates.len(), 1);
    assert_eq!(
        report.promotion_candidates[0].target,
        Some(Tier::Custodian)
    );
}

#[tokio::test]
async fn failed_evaluation_sweep_resets_the_member() {
    let harness = context_builder();
    let mut entry = staff_entry(2, "Milo", Tier::Attendant);
    entry.points = 4;
    entry.evaluation_mode = true;
    entry.weekly_score = 30;
    harness.roster.upsert(entry).expect("seed");
    harness.directory.seed(LinkedId(20), &[EXCELLENCE[3]]);

    let engine = EvaluationEngine::new(harness.build());
    let report = engine.run_cycle().await.expect("cycle");

    let entry = harness
        .roster
        .get(MemberId(2))
        .expect("get")
        .expect("entry survives");
    assert!(!entry.evaluation_mode);
    assert_eq!(entry.points, 0);
    assert_eq!(entry.weekly_score, 0);
    assert_eq!(entry.bad_streak, 1, "an inadequate week still counts");

    let held = harness.directory.held(LinkedId(20));
    for grant in EXCELLENCE {
        assert!(!held.contains(&grant), "all point grants revoked");
    }
    assert_eq!(report.resets.len(), 1);
}

#[tokio::test]
async fn adequate_score_in_evaluation_mode_survives_the_sweep() {
    let harness = context_builder();
    let mut entry = staff_entry(3, "Nadia", Tier::Warden);
    entry.points = 5;
    entry.evaluation_mode = true;
    entry.weekly_score = 75;
    harness.roster.upsert(entry).expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    engine.run_cycle().await.expect("cycle");

    let entry = harness
        .roster
        .get(MemberId(3))
        .expect("get")
        .expect("entry survives");
    assert!(entry.evaluation_mode, "adequate week keeps the flag");
    assert_eq!(entry.points, 5);
}

#[tokio::test]
async fn two_adequate_cycles_forgive_a_bad_streak() {
    let harness = context_builder();
    let mut entry = staff_entry(4, "Ines", Tier::Noviciate);
    entry.bad_streak = 2;
    entry.minimum_streak = 1;
    entry.weekly_score = 60;
    harness.roster.upsert(entry).expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    let report = engine.run_cycle().await.expect("cycle");

    let entry = harness
        .roster
        .get(MemberId(4))
        .expect("get")
        .expect("entry survives");
    assert_eq!(entry.bad_streak, 0);
    assert_eq!(entry.minimum_streak, 0);
    assert_eq!(entry.points, 0, "the 50..=99 band earns no points");
    assert!(report.awards.is_empty());
}

#[tokio::test]
async fn top_tier_is_exempt_but_weekly_score_still_resets() {
    let harness = context_builder();
    let mut entry = staff_entry(5, "Sol", Tier::Lecturer);
    entry.weekly_score = 500;
    harness.roster.upsert(entry).expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    let report = engine.run_cycle().await.expect("cycle");

    let entry = harness
        .roster
        .get(MemberId(5))
        .expect("get")
        .expect("entry survives");
    assert_eq!(entry.points, 0);
    assert!(!entry.evaluation_mode);
    assert_eq!(entry.weekly_score, 0);
    assert!(report.awards.is_empty());
}

#[tokio::test]
async fn member_entering_mode_this_run_is_not_swept() {
    let harness = context_builder();
    let mut entry = staff_entry(6, "Pavel", Tier::Custodian);
    entry.points = 5;
    entry.weekly_score = 10;
    harness.roster.upsert(entry).expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    engine.run_cycle().await.expect("cycle");

    let entry = harness
        .roster
        .get(MemberId(6))
        .expect("get")
        .expect("entry survives");
    assert!(entry.evaluation_mode, "freshly marked this run");
    assert_eq!(entry.points, 5, "grace period starts next cycle");
}

#[tokio::test]
async fn long_bad_streak_surfaces_a_demotion_candidate() {
    let harness = context_builder();
    let mut entry = staff_entry(7, "Rosa", Tier::Concierge);
    entry.bad_streak = 2;
    entry.weekly_score = 5;
    harness.roster.upsert(entry).expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    let report = engine.run_cycle().await.expect("cycle");

    assert_eq!(report.demotion_candidates.len(), 1);
    let candidate = &report.demotion_candidates[0];
    assert_eq!(candidate.bad_streak, 3);
    assert_eq!(candidate.target, Tier::Custodian);
}

#[tokio::test]
async fn cycle_summary_is_broadcast_once() {
    let harness = context_builder();
    let mut entry = staff_entry(8, "Tomas", Tier::Warden);
    entry.weekly_score = 210;
    harness.roster.upsert(entry).expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    engine.run_cycle().await.expect("cycle");

    let broadcasts = harness.notifier.broadcasts();
    assert_eq!(broadcasts.len(), 1);
    assert!(broadcasts[0].contains("Tomas"));
    assert!(broadcasts[0].contains("+2"));
}

#[tokio::test]
async fn record_score_accumulates_between_cycles() {
    let harness = context_builder();
    harness
        .roster
        .upsert(staff_entry(9, "Vera", Tier::Attendant))
        .expect("seed");

    let engine = EvaluationEngine::new(harness.build());
    engine.record_score(MemberId(9), 40).expect("first score");
    let entry = engine.record_score(MemberId(9), 80).expect("second score");
    assert_eq!(entry.weekly_score, 120);

    let err = engine
        .record_score(MemberId(404), 10)
        .expect_err("unknown member");
    assert!(matches!(err, EvaluationError::NotStaff));
}
