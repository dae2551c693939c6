use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;

use super::domain::{LinkedId, MemberId};
use super::hierarchy::{GrantId, RankCode};

/// Failure talking to the local membership directory.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("membership directory call failed: {0}")]
    Remote(String),
    #[error("membership directory call timed out")]
    Timeout,
}

/// Failure talking to the remote ranking service.
#[derive(Debug, thiserror::Error)]
pub enum RankingError {
    #[error("ranking service call failed: {0}")]
    Remote(String),
    #[error("ranking service call timed out")]
    Timeout,
    #[error("ranking service rejected the rank change")]
    Rejected,
}

/// Failure delivering a notification. Fire-and-forget; callers log it.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    Remote(String),
}

/// Local-platform membership directory. Each call is an independent
/// best-effort operation; batch helpers log per-grant failures rather than
/// aggregating them into one failure.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn memberships(&self, linked: LinkedId) -> Result<HashSet<GrantId>, DirectoryError>;
    async fn grant(&self, linked: LinkedId, grant: GrantId) -> Result<(), DirectoryError>;
    async fn revoke(&self, linked: LinkedId, grant: GrantId) -> Result<(), DirectoryError>;
}

/// Authoritative rank change on the third-party platform. At-least-once,
/// potentially failing, with no transactional coupling to local state.
#[async_trait]
pub trait RankingService: Send + Sync {
    async fn set_rank(&self, member: MemberId, code: RankCode) -> Result<(), RankingError>;
}

/// Outbound notification surface.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn direct(&self, linked: LinkedId, message: &str) -> Result<(), NotifyError>;
    async fn broadcast(&self, message: &str) -> Result<(), NotifyError>;
}

/// Rank change with an upper bound on how long the remote call may hang.
pub async fn set_rank_bounded(
    ranking: &dyn RankingService,
    member: MemberId,
    code: RankCode,
    limit: Duration,
) -> Result<(), RankingError> {
    match timeout(limit, ranking.set_rank(member, code)).await {
        Ok(result) => result,
        Err(_) => Err(RankingError::Timeout),
    }
}

/// Membership scan with an upper bound on how long the call may hang.
pub async fn memberships_bounded(
    directory: &dyn MembershipDirectory,
    linked: LinkedId,
    limit: Duration,
) -> Result<HashSet<GrantId>, DirectoryError> {
    match timeout(limit, directory.memberships(linked)).await {
        Ok(result) => result,
        Err(_) => Err(DirectoryError::Timeout),
    }
}

/// Grant a batch of memberships, logging each failure individually.
pub async fn grant_all(
    directory: &dyn MembershipDirectory,
    linked: LinkedId,
    grants: &[GrantId],
    limit: Duration,
) {
    for grant in grants {
        let outcome = match timeout(limit, directory.grant(linked, *grant)).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout),
        };
        if let Err(err) = outcome {
            tracing::warn!(%linked, grant, error = %err, "membership grant failed");
        }
    }
}

/// Revoke a batch of memberships, logging each failure individually.
pub async fn revoke_all(
    directory: &dyn MembershipDirectory,
    linked: LinkedId,
    grants: &[GrantId],
    limit: Duration,
) {
    for grant in grants {
        let outcome = match timeout(limit, directory.revoke(linked, *grant)).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout),
        };
        if let Err(err) = outcome {
            tracing::warn!(%linked, grant, error = %err, "membership revoke failed");
        }
    }
}

/// Deliver a direct notice, logging delivery failure.
pub async fn notify_direct(notifier: &dyn Notifier, linked: Option<LinkedId>, message: &str) {
    let Some(linked) = linked else {
        return;
    };
    if let Err(err) = notifier.direct(linked, message).await {
        tracing::warn!(%linked, error = %err, "direct notice delivery failed");
    }
}
