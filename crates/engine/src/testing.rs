// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles: an in-memory [`Repository`], a scriptable
//! [`SessionClient`], and a [`FakeClock`] whose `now()` tracks simulated
//! sleeps. Used by this crate's own tests and by `crates/cli`'s demo
//! mode — builders and fakes kept in one module rather than scattered
//! `#[cfg(test)]` blocks, since other crates need them too.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::errors::RawSendError;
use crate::ids::{AdId, GroupId, PostId, SessionId, TenantId};
use crate::model::{Ad, Group, Payment, Session, SystemStatistics, Subscription, Tenant};
use crate::post::{Post, PostHistory};
use crate::repository::{DailyRollupInputs, RepoResult, Repository};
use crate::session_client::{GroupSnapshot, SendAck, SessionClient};

/// A fully in-memory [`Repository`], one `RwLock<HashMap<..>>` per entity.
/// Not meant to model real persistence semantics like transactions; it
/// exists so the engine's own tests and the CLI demo don't need a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tenants: RwLock<HashMap<TenantId, Tenant>>,
    ads: RwLock<HashMap<AdId, Ad>>,
    sessions: RwLock<HashMap<SessionId, Session>>,
    groups: RwLock<HashMap<GroupId, Group>>,
    posts: RwLock<HashMap<PostId, Post>>,
    history: RwLock<Vec<PostHistory>>,
    subscriptions: RwLock<HashMap<TenantId, Subscription>>,
    payments: RwLock<HashMap<String, Payment>>,
    statistics: RwLock<HashMap<u64, SystemStatistics>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_tenant(&self, tenant: Tenant) {
        self.tenants.write().await.insert(tenant.id.clone(), tenant);
    }

    pub async fn put_session(&self, session: Session) {
        self.sessions.write().await.insert(session.id.clone(), session);
    }

    pub async fn put_group(&self, group: Group) {
        self.groups.write().await.insert(group.id.clone(), group);
    }

    pub async fn put_ad(&self, ad: Ad) {
        self.ads.write().await.insert(ad.id.clone(), ad);
    }

    pub async fn history_for(&self, post_id: &PostId) -> Vec<PostHistory> {
        self.history.read().await.iter().filter(|h| &h.post_id == post_id).cloned().collect()
    }
}

impl Repository for InMemoryRepository {
    async fn get_tenant(&self, id: &TenantId) -> RepoResult<Option<Tenant>> {
        Ok(self.tenants.read().await.get(id).cloned())
    }

    async fn get_ad(&self, id: &AdId) -> RepoResult<Option<Ad>> {
        Ok(self.ads.read().await.get(id).cloned())
    }

    async fn update_ad(&self, ad: &Ad) -> RepoResult<()> {
        self.ads.write().await.insert(ad.id.clone(), ad.clone());
        Ok(())
    }

    async fn list_due_scheduled_ads(&self, now: SystemTime) -> RepoResult<Vec<Ad>> {
        use crate::model::AdStatus;
        Ok(self
            .ads
            .read()
            .await
            .values()
            .filter(|ad| {
                ad.is_scheduled
                    && ad.scheduled_for.is_some_and(|t| t <= now)
                    && matches!(ad.status, AdStatus::Active | AdStatus::Paused)
            })
            .cloned()
            .collect())
    }

    async fn list_usable_sessions(&self, tenant_id: &TenantId) -> RepoResult<Vec<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| &s.tenant_id == tenant_id && s.is_usable())
            .cloned()
            .collect())
    }

    async fn get_session(&self, id: &SessionId) -> RepoResult<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update_session(&self, session: &Session) -> RepoResult<()> {
        self.sessions.write().await.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn list_frozen_sessions_before(&self, threshold: SystemTime) -> RepoResult<Vec<Session>> {
        Ok(self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.is_frozen && s.frozen_at.is_some_and(|t| t <= threshold))
            .cloned()
            .collect())
    }

    async fn list_all_sessions(&self) -> RepoResult<Vec<Session>> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }

    async fn list_groups_for_session(&self, session_id: &SessionId) -> RepoResult<Vec<Group>> {
        Ok(self.groups.read().await.values().filter(|g| &g.session_id == session_id).cloned().collect())
    }

    async fn get_group(&self, id: &GroupId) -> RepoResult<Option<Group>> {
        Ok(self.groups.read().await.get(id).cloned())
    }

    async fn update_group(&self, group: &Group) -> RepoResult<()> {
        self.groups.write().await.insert(group.id.clone(), group.clone());
        Ok(())
    }

    async fn batch_add_groups(&self, session_id: &SessionId, snapshots: Vec<GroupSnapshot>) -> RepoResult<usize> {
        let mut groups = self.groups.write().await;
        let existing: std::collections::HashSet<String> =
            groups.values().filter(|g| &g.session_id == session_id).map(|g| g.platform_id.clone()).collect();

        let mut inserted = 0;
        for snap in snapshots {
            if existing.contains(&snap.platform_id) {
                continue;
            }
            let group = Group {
                id: GroupId::new(),
                session_id: session_id.clone(),
                platform_id: snap.platform_id,
                title: snap.title,
                kind: snap.kind,
                member_count: snap.member_count,
                is_active: true,
                is_skipped: false,
                skip_reason: None,
                has_restrictions: false,
                restriction_until: None,
                is_priority: false,
                priority_order: None,
                activity_score: 0.0,
                last_post_at: None,
            };
            groups.insert(group.id.clone(), group);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn create_post(&self, post: &Post) -> RepoResult<()> {
        self.posts.write().await.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get_post(&self, id: &PostId) -> RepoResult<Option<Post>> {
        Ok(self.posts.read().await.get(id).cloned())
    }

    async fn update_post(&self, post: &Post) -> RepoResult<()> {
        self.posts.write().await.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn record_post_history(&self, entry: &PostHistory) -> RepoResult<()> {
        self.history.write().await.push(entry.clone());
        Ok(())
    }

    async fn count_non_skipped_history(&self, post_id: &PostId) -> RepoResult<u64> {
        use crate::post::DeliveryStatus;
        Ok(self
            .history
            .read()
            .await
            .iter()
            .filter(|h| &h.post_id == post_id && h.status != DeliveryStatus::Skipped)
            .count() as u64)
    }

    async fn list_subscriptions_expiring(&self, now: SystemTime) -> RepoResult<Vec<Subscription>> {
        use crate::model::SubscriptionStatus;
        Ok(self
            .subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.status == SubscriptionStatus::Active && s.end_date <= now)
            .cloned()
            .collect())
    }

    async fn update_subscription(&self, subscription: &Subscription) -> RepoResult<()> {
        self.subscriptions.write().await.insert(subscription.tenant_id.clone(), subscription.clone());
        Ok(())
    }

    async fn list_payments_pending_before(&self, threshold: SystemTime) -> RepoResult<Vec<Payment>> {
        use crate::model::PaymentStatus;
        Ok(self
            .payments
            .read()
            .await
            .values()
            .filter(|p| p.status == PaymentStatus::Pending && p.created_at <= threshold)
            .cloned()
            .collect())
    }

    async fn update_payment(&self, payment: &Payment) -> RepoResult<()> {
        self.payments.write().await.insert(payment.id.clone(), payment.clone());
        Ok(())
    }

    async fn get_daily_statistics(&self, epoch_day: u64) -> RepoResult<Option<SystemStatistics>> {
        Ok(self.statistics.read().await.get(&epoch_day).cloned())
    }

    async fn upsert_daily_statistics(&self, stats: &SystemStatistics) -> RepoResult<()> {
        self.statistics.write().await.insert(stats.epoch_day, stats.clone());
        Ok(())
    }

    async fn daily_rollup_inputs(&self, day_start: SystemTime, day_end: SystemTime) -> RepoResult<DailyRollupInputs> {
        use crate::model::PaymentStatus;
        use crate::post::PostStatus;

        let mut inputs = DailyRollupInputs::default();
        for post in self.posts.read().await.values() {
            if post.created_at < day_start || post.created_at >= day_end {
                continue;
            }
            if post.status == PostStatus::Completed {
                inputs.posts_completed += 1;
            }
            inputs.groups_sent += post.groups_completed;
            inputs.groups_failed += post.groups_failed;
        }
        for payment in self.payments.read().await.values() {
            if payment.status == PaymentStatus::Paid && payment.created_at >= day_start && payment.created_at < day_end {
                inputs.revenue += payment.amount;
            }
        }
        Ok(inputs)
    }
}

/// Scripted outcomes for [`FakeSessionClient::send`], keyed by
/// `(session_id, platform_group_id)`. Each call pops the front of that
/// group's queue; an empty queue defaults to a successful send.
#[derive(Default)]
pub struct FakeSessionClient {
    scripts: RwLock<HashMap<(SessionId, String), VecDeque<Result<SendAck, RawSendError>>>>,
    connect_failures: RwLock<std::collections::HashSet<SessionId>>,
    sync_results: RwLock<HashMap<SessionId, Vec<GroupSnapshot>>>,
}

impl FakeSessionClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn script_send(&self, session_id: SessionId, platform_group_id: impl Into<String>, outcome: Result<SendAck, RawSendError>) {
        self.scripts.write().await.entry((session_id, platform_group_id.into())).or_default().push_back(outcome);
    }

    pub async fn fail_connect(&self, session_id: SessionId) {
        self.connect_failures.write().await.insert(session_id);
    }

    pub async fn script_sync(&self, session_id: SessionId, groups: Vec<GroupSnapshot>) {
        self.sync_results.write().await.insert(session_id, groups);
    }
}

impl SessionClient for FakeSessionClient {
    type Handle = SessionId;

    async fn connect(&self, session: &Session) -> Result<Self::Handle, RawSendError> {
        if self.connect_failures.read().await.contains(&session.id) {
            return Err(RawSendError::Transient("connect failed".to_string()));
        }
        Ok(session.id.clone())
    }

    async fn disconnect(&self, _handle: &Self::Handle) {}

    async fn sync_groups(&self, handle: &Self::Handle) -> Result<Vec<GroupSnapshot>, RawSendError> {
        Ok(self.sync_results.read().await.get(handle).cloned().unwrap_or_default())
    }

    async fn send(&self, handle: &Self::Handle, platform_group_id: &str, _text: &str) -> Result<SendAck, RawSendError> {
        let mut scripts = self.scripts.write().await;
        if let Some(queue) = scripts.get_mut(&(handle.clone(), platform_group_id.to_string())) {
            if let Some(outcome) = queue.pop_front() {
                return outcome;
            }
        }
        Ok(SendAck::default())
    }

    async fn is_connected(&self, handle: &Self::Handle) -> bool {
        !self.connect_failures.read().await.contains(handle)
    }
}

/// A [`Clock`] whose `now()` advances exactly as much as it sleeps, so
/// cooldown arithmetic stays internally consistent under `tokio::time::pause`
/// without needing wall-clock time to actually elapse. Tokio's own
/// `start_paused` idiom is trusted for the sleep itself; this layer exists
/// only because the engine reasons in [`SystemTime`], which `tokio::time`
/// does not control.
pub struct FakeClock {
    base: SystemTime,
    elapsed_ms: AtomicU64,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(SystemTime::now())
    }
}

impl FakeClock {
    pub fn new(base: SystemTime) -> Self {
        Self { base, elapsed_ms: AtomicU64::new(0) }
    }

    pub fn advance(&self, dur: Duration) {
        self.elapsed_ms.fetch_add(dur.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now(&self) -> SystemTime {
        self.base + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
    }

    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
        self.advance(dur);
    }
}

/// Convenience: an `Arc`-wrapped trio for tests that need to share doubles
/// across spawned tasks.
pub struct Fixture {
    pub repo: Arc<InMemoryRepository>,
    pub client: Arc<FakeSessionClient>,
    pub clock: Arc<FakeClock>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    pub fn new() -> Self {
        Self { repo: Arc::new(InMemoryRepository::new()), client: Arc::new(FakeSessionClient::new()), clock: Arc::new(FakeClock::default()) }
    }
}
