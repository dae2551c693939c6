use crate::infra::{build_staffing_context, seed_demo_roster};
use clap::Args;
use clinic_roster::config::RosterConfig;
use clinic_roster::error::AppError;
use clinic_roster::staffing::EvaluationEngine;

#[derive(Args, Debug, Default)]
pub(crate) struct CycleArgs {
    /// Print the full roster after the cycle instead of just the summary.
    #[arg(long)]
    pub(crate) list_roster: bool,
}

/// Seeds a handful of staff members, runs one evaluation cycle against
/// them, and prints the same summary the weekly broadcast would carry.
pub(crate) async fn run_cycle_demo(args: CycleArgs) -> Result<(), AppError> {
    let ctx = build_staffing_context(RosterConfig::default())?;
    seed_demo_roster(&ctx)?;

    let engine = EvaluationEngine::new(ctx.clone());
    let report = engine.run_cycle().await?;

    println!("Weekly evaluation cycle demo");
    println!("Members evaluated: {}", report.evaluated);
    println!();
    println!("{}", report.render());

    if args.list_roster {
        println!("\nRoster after the cycle");
        for entry in ctx.roster.all()? {
            println!(
                "  {} [{}] {} points={} weekly={} bad_streak={} min_streak={}{}",
                entry.member,
                entry.tier.label(),
                entry.name,
                entry.points,
                entry.weekly_score,
                entry.bad_streak,
                entry.minimum_streak,
                if entry.evaluation_mode {
                    " (evaluation)"
                } else {
                    ""
                },
            );
        }
    }

    Ok(())
}
