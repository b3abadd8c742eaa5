// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repository capability: typed persistence boundary. Like
//! [`crate::session_client::SessionClient`], a generic trait bound rather
//! than `dyn` — `PostingEngine`/`Orchestrator` monomorphize over one
//! concrete store per process. Implementors are responsible for their own
//! indexes and uniqueness constraints; this trait only names the
//! operations.

use std::future::Future;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::{AdId, GroupId, PostId, SessionId, TenantId};
use crate::model::{Ad, Group, Payment, Session, SystemStatistics, Subscription, Tenant};
use crate::post::{Post, PostHistory};
use crate::session_client::GroupSnapshot;

/// Repository failures are opaque to the engine; only the message is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryError(pub String);

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RepositoryError {}

impl RepositoryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Aggregate inputs for one day's `SystemStatistics` row. Left to the
/// implementer's store to compute efficiently (a SQL
/// `SUM`/`COUNT`, typically); the engine only needs the totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DailyRollupInputs {
    pub posts_completed: u64,
    pub groups_sent: u64,
    pub groups_failed: u64,
    pub revenue: f64,
}

pub trait Repository: Send + Sync + 'static {
    fn get_tenant(&self, id: &TenantId) -> impl Future<Output = RepoResult<Option<Tenant>>> + Send;

    fn get_ad(&self, id: &AdId) -> impl Future<Output = RepoResult<Option<Ad>>> + Send;
    fn update_ad(&self, ad: &Ad) -> impl Future<Output = RepoResult<()>> + Send;
    /// Ads with `is_scheduled`, `scheduled_for <= now`, status in
    /// `{Active, Paused}`.
    fn list_due_scheduled_ads(&self, now: SystemTime) -> impl Future<Output = RepoResult<Vec<Ad>>> + Send;

    /// Sessions in `{Active, ¬Frozen, sessionString≠∅}` for a tenant.
    fn list_usable_sessions(&self, tenant_id: &TenantId) -> impl Future<Output = RepoResult<Vec<Session>>> + Send;
    fn get_session(&self, id: &SessionId) -> impl Future<Output = RepoResult<Option<Session>>> + Send;
    fn update_session(&self, session: &Session) -> impl Future<Output = RepoResult<()>> + Send;
    /// Frozen sessions whose `frozen_at <= threshold` (frozen-session thaw).
    fn list_frozen_sessions_before(&self, threshold: SystemTime) -> impl Future<Output = RepoResult<Vec<Session>>> + Send;
    /// Every known session, regardless of status — used by the priority
    /// recompute maintenance tick, which has no narrower filter.
    fn list_all_sessions(&self) -> impl Future<Output = RepoResult<Vec<Session>>> + Send;

    fn list_groups_for_session(&self, session_id: &SessionId) -> impl Future<Output = RepoResult<Vec<Group>>> + Send;
    fn get_group(&self, id: &GroupId) -> impl Future<Output = RepoResult<Option<Group>>> + Send;
    fn update_group(&self, group: &Group) -> impl Future<Output = RepoResult<()>> + Send;
    /// Bulk-insert groups discovered by a sync, skipping duplicates on the
    /// unique `(session_id, platform_id)` key. Returns the number of
    /// newly-inserted rows.
    fn batch_add_groups(&self, session_id: &SessionId, groups: Vec<GroupSnapshot>) -> impl Future<Output = RepoResult<usize>> + Send;

    fn create_post(&self, post: &Post) -> impl Future<Output = RepoResult<()>> + Send;
    fn get_post(&self, id: &PostId) -> impl Future<Output = RepoResult<Option<Post>>> + Send;
    fn update_post(&self, post: &Post) -> impl Future<Output = RepoResult<()>> + Send;
    fn record_post_history(&self, entry: &PostHistory) -> impl Future<Output = RepoResult<()>> + Send;
    /// Count of non-`Skipped` [`crate::post::PostHistory`] rows for a post.
    fn count_non_skipped_history(&self, post_id: &PostId) -> impl Future<Output = RepoResult<u64>> + Send;

    /// Active subscriptions with `end_date <= now` (subscription expiry).
    fn list_subscriptions_expiring(&self, now: SystemTime) -> impl Future<Output = RepoResult<Vec<Subscription>>> + Send;
    fn update_subscription(&self, subscription: &Subscription) -> impl Future<Output = RepoResult<()>> + Send;

    /// Pending payments with `created_at <= threshold` (payment expiry).
    fn list_payments_pending_before(&self, threshold: SystemTime) -> impl Future<Output = RepoResult<Vec<Payment>>> + Send;
    fn update_payment(&self, payment: &Payment) -> impl Future<Output = RepoResult<()>> + Send;

    fn get_daily_statistics(&self, epoch_day: u64) -> impl Future<Output = RepoResult<Option<SystemStatistics>>> + Send;
    fn upsert_daily_statistics(&self, stats: &SystemStatistics) -> impl Future<Output = RepoResult<()>> + Send;
    /// Aggregate counts/revenue for `[day_start, day_end)`, feeding the
    /// daily statistics rollup.
    fn daily_rollup_inputs(&self, day_start: SystemTime, day_end: SystemTime) -> impl Future<Output = RepoResult<DailyRollupInputs>> + Send;
}
