use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::Extension;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use clinic_roster::error::AppError;
use clinic_roster::staffing::domain::{LeaveRecord, LinkedId, MemberId, RosterEntry};
use clinic_roster::staffing::evaluation::summary::CycleReport;
use clinic_roster::staffing::hierarchy::Tier;
use clinic_roster::staffing::identity::IdentityOrigin;
use clinic_roster::staffing::{EvaluationEngine, LeaveScheduler, RankTransition};

pub(crate) fn roster_router() -> axum::Router {
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/members/:query", get(member_lookup_endpoint))
        .route("/api/v1/members/:query/rank", post(change_rank_endpoint))
        .route("/api/v1/members/:query/score", post(record_score_endpoint))
        .route("/api/v1/leave", post(start_leave_endpoint))
        .route("/api/v1/leave/:query", delete(end_leave_endpoint))
        .route("/api/v1/leave/:query/extend", post(extend_leave_endpoint))
        .route("/api/v1/evaluation/run", post(run_cycle_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[derive(Debug, Serialize)]
pub(crate) struct MemberView {
    pub(crate) member: u64,
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) linked: Option<u64>,
    pub(crate) origin: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) roster: Option<RosterEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) leave: Option<LeaveRecord>,
}

pub(crate) async fn member_lookup_endpoint(
    Path(query): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Json<MemberView>, AppError> {
    let resolved = state.staffing.resolver().resolve(&query)?;
    let roster = state.staffing.roster.get(resolved.member)?;
    let leave = state.staffing.leave.get(resolved.member)?;

    Ok(Json(MemberView {
        member: resolved.member.0,
        name: resolved.name,
        linked: resolved.linked.map(|linked| linked.0),
        origin: match resolved.origin {
            IdentityOrigin::Roster => "roster",
            IdentityOrigin::Verified => "verified",
            IdentityOrigin::OnLeave => "on_leave",
        },
        roster,
        leave,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChangeRankRequest {
    pub(crate) rank_code: u64,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default)]
    pub(crate) linked: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChangeRankResponse {
    pub(crate) member: u64,
    pub(crate) name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) previous: Option<Tier>,
    pub(crate) current: Tier,
}

pub(crate) async fn change_rank_endpoint(
    Path(query): Path<String>,
    Extension(state): Extension<AppState>,
    Json(payload): Json<ChangeRankRequest>,
) -> Result<Json<ChangeRankResponse>, AppError> {
    // Known members resolve through the lookup chain; unknown ones are
    // manually registered from the request body.
    let (member, name, linked) = match state.staffing.resolver().resolve(&query) {
        Ok(resolved) => (resolved.member, resolved.name, resolved.linked),
        Err(_) => {
            let id = query
                .trim()
                .parse::<u64>()
                .map_err(|_| clinic_roster::staffing::identity::IdentityError::Unresolved(query.clone()))?;
            (
                MemberId(id),
                payload.name.clone().unwrap_or_else(|| query.clone()),
                payload.linked.map(LinkedId),
            )
        }
    };

    let transition = RankTransition::new(state.staffing.clone());
    let outcome = transition
        .change_rank_by_code(member, &name, linked, payload.rank_code)
        .await?;

    Ok(Json(ChangeRankResponse {
        member: outcome.member.0,
        name: outcome.name,
        previous: outcome.previous,
        current: outcome.current,
    }))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    pub(crate) delta: i64,
}

pub(crate) async fn record_score_endpoint(
    Path(query): Path<String>,
    Extension(state): Extension<AppState>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<RosterEntry>, AppError> {
    let resolved = state.staffing.resolver().resolve(&query)?;
    let engine = EvaluationEngine::new(state.staffing.clone());
    let entry = engine.record_score(resolved.member, payload.delta)?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartLeaveRequest {
    pub(crate) member: u64,
    pub(crate) days: i64,
    #[serde(default)]
    pub(crate) minutes: i64,
    pub(crate) reason: String,
    /// Operator-entered leaves skip the cooldown and minimum-length checks.
    #[serde(default)]
    pub(crate) operator: bool,
}

pub(crate) async fn start_leave_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<StartLeaveRequest>,
) -> Result<Json<LeaveRecord>, AppError> {
    let scheduler = LeaveScheduler::new(state.staffing.clone());
    let record = scheduler
        .start_leave(
            MemberId(payload.member),
            payload.days,
            payload.minutes,
            &payload.reason,
            payload.operator,
            Utc::now(),
        )
        .await?;
    Ok(Json(record))
}

pub(crate) async fn end_leave_endpoint(
    Path(query): Path<String>,
    Extension(state): Extension<AppState>,
) -> Result<Json<RosterEntry>, AppError> {
    let resolved = state.staffing.resolver().resolve(&query)?;
    let scheduler = LeaveScheduler::new(state.staffing.clone());
    let entry = scheduler.end_leave(resolved.member, Utc::now()).await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExtendLeaveRequest {
    pub(crate) delta_days: i64,
}

pub(crate) async fn extend_leave_endpoint(
    Path(query): Path<String>,
    Extension(state): Extension<AppState>,
    Json(payload): Json<ExtendLeaveRequest>,
) -> Result<Json<LeaveRecord>, AppError> {
    let resolved = state.staffing.resolver().resolve(&query)?;
    let scheduler = LeaveScheduler::new(state.staffing.clone());
    let record = scheduler
        .adjust_leave_end(resolved.member, payload.delta_days, Utc::now())
        .await?;
    Ok(Json(record))
}

pub(crate) async fn run_cycle_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<CycleReport>, AppError> {
    // Same lock the weekly timer holds, so an operator trigger can never
    // double-apply point deltas against a timer firing.
    let _guard = state.cycle_lock.lock().await;
    let engine = EvaluationEngine::new(state.staffing.clone());
    let report = engine.run_cycle().await?;
    Ok(Json(report))
}
