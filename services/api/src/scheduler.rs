use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use clinic_roster::staffing::schedule::EvaluationSchedule;
use clinic_roster::staffing::{EvaluationEngine, LeaveScheduler, StaffingContext};

/// Spawns the two long-running roster jobs: the leave-expiry poller and
/// the weekly evaluation timer. Both tasks run for the lifetime of the
/// process.
pub(crate) fn spawn_background_tasks(ctx: StaffingContext, cycle_lock: Arc<Mutex<()>>) {
    let poll_interval = Duration::from_secs(ctx.policy.leave_poll_interval_secs);
    let schedule = EvaluationSchedule {
        weekday: ctx.policy.cycle_weekday,
        hour: ctx.policy.cycle_hour,
    };

    tokio::spawn(leave_poll_loop(ctx.clone(), poll_interval));
    tokio::spawn(evaluation_loop(ctx, schedule, cycle_lock));
}

async fn leave_poll_loop(ctx: StaffingContext, poll_interval: Duration) {
    let scheduler = LeaveScheduler::new(ctx);
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match scheduler.poll_expirations(Utc::now()).await {
            Ok(processed) if processed.is_empty() => {}
            Ok(processed) => {
                info!(count = processed.len(), "expired leaves processed");
            }
            Err(err) => warn!(error = %err, "leave expiry sweep failed"),
        }
    }
}

async fn evaluation_loop(
    ctx: StaffingContext,
    schedule: EvaluationSchedule,
    cycle_lock: Arc<Mutex<()>>,
) {
    let engine = EvaluationEngine::new(ctx);

    loop {
        let now = Utc::now();
        let next = schedule.next_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        info!(fires_at = %next, "next evaluation cycle scheduled");
        tokio::time::sleep(wait).await;

        let _guard = cycle_lock.lock().await;
        match engine.run_cycle().await {
            Ok(report) => info!(evaluated = report.evaluated, "evaluation cycle complete"),
            Err(err) => error!(error = %err, "evaluation cycle failed"),
        }
    }
}
