// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios exercising the orchestrator's public façade against
//! the in-memory test doubles: seed a tenant/session/group/ad, start a job,
//! let it run a little, stop it, and check the job's own counters and the
//! repository's recorded post history.

use std::time::Duration;

use broadcast_engine::config::EngineConfig;
use broadcast_engine::errors::RawSendError;
use broadcast_engine::ids::{AdId, GroupId, SessionId, TenantId};
use broadcast_engine::job::JobStatus;
use broadcast_engine::model::{Ad, AdStatus, Group, GroupKind, Session, SessionStatus, Tenant};
use broadcast_engine::orchestrator::Orchestrator;
use broadcast_engine::post::DeliveryStatus;
use broadcast_engine::testing::{FakeClock, FakeSessionClient, InMemoryRepository};
use clap::Parser;

type TestOrchestrator = Orchestrator<InMemoryRepository, FakeSessionClient, FakeClock>;

fn config() -> EngineConfig {
    let mut config = EngineConfig::parse_from(["broadcast-engine"]);
    config.min_group_delay_ms = 100;
    config.max_group_delay_ms = 100;
    config.round_pause_ms = 200;
    config.group_cooldown_secs = 600;
    config
}

fn build(config: EngineConfig) -> TestOrchestrator {
    Orchestrator::new(InMemoryRepository::new(), FakeSessionClient::new(), FakeClock::default(), config)
}

fn tenant(id: TenantId) -> Tenant {
    Tenant { id, name: "acme".into(), brand_ad_enabled: false, subscription: None }
}

fn session(id: SessionId, tenant_id: TenantId) -> Session {
    Session {
        id,
        tenant_id,
        name: "s".into(),
        phone: "+1".into(),
        session_string: "cred".into(),
        status: SessionStatus::Active,
        is_frozen: false,
        frozen_at: None,
        unfreeze_at: None,
        freeze_count: 0,
        last_sync_at: None,
        total_groups: 0,
        active_groups: 0,
    }
}

fn group(session_id: SessionId, platform_id: &str) -> Group {
    Group {
        id: GroupId::new(),
        session_id,
        platform_id: platform_id.to_string(),
        title: platform_id.to_string(),
        kind: GroupKind::Group,
        member_count: 10,
        is_active: true,
        is_skipped: false,
        skip_reason: None,
        has_restrictions: false,
        restriction_until: None,
        is_priority: false,
        priority_order: None,
        activity_score: 0.0,
        last_post_at: None,
    }
}

fn ad(id: AdId, tenant_id: TenantId) -> Ad {
    Ad {
        id,
        tenant_id,
        content: "buy now".into(),
        media: vec![],
        status: AdStatus::Active,
        scheduled_for: None,
        is_scheduled: false,
        interval_min: None,
        interval_max: None,
        group_interval: None,
        brand_ad_text: None,
        selected_groups: vec![],
        last_scheduled_at: None,
        last_error: None,
    }
}

/// S1: single-session happy round, all groups deliverable.
#[tokio::test(start_paused = true)]
async fn single_session_happy_round() {
    let orchestrator = build(config());
    let repo = &orchestrator.context().repo;
    let tenant_id = TenantId::new();
    let session_id = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_id.clone(), tenant_id.clone())).await;
    repo.put_group(group(session_id.clone(), "g1")).await;
    repo.put_group(group(session_id.clone(), "g2")).await;
    repo.put_group(group(session_id.clone(), "g3")).await;
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;

    let job = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    orchestrator.stop_job(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = job.stats();
    assert_eq!(stats.posted_groups, 3);
    assert_eq!(stats.rounds_completed, 1);

    let history = repo.history_for(&job.post_id).await;
    assert_eq!(history.iter().filter(|h| h.status == DeliveryStatus::Sent).count(), 3);

    let groups = repo.list_groups_for_session(&session_id).await.unwrap();
    assert!(groups.iter().all(|g| g.last_post_at.is_some()));
}

/// S2: a flood wait under 60s is served as an inline sleep, not a cooldown;
/// the rest of the round still completes.
#[tokio::test(start_paused = true)]
async fn flood_wait_under_threshold_sleeps_inline_then_continues() {
    let orchestrator = build(config());
    let repo = &orchestrator.context().repo;
    let client = &orchestrator.context().client;
    let tenant_id = TenantId::new();
    let session_id = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_id.clone(), tenant_id.clone())).await;
    for name in ["g1", "g2", "g3", "g4", "g5"] {
        repo.put_group(group(session_id.clone(), name)).await;
    }
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;
    client.script_send(session_id.clone(), "g3", Err(RawSendError::FloodWait(Duration::from_secs(10)))).await;

    let job = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(15)).await;
    orchestrator.stop_job(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = job.stats();
    assert_eq!(stats.posted_groups, 4);
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.rounds_completed, 1);

    let history = repo.history_for(&job.post_id).await;
    assert_eq!(history.iter().filter(|h| h.status == DeliveryStatus::Sent).count(), 4);
    assert_eq!(history.iter().filter(|h| h.status == DeliveryStatus::Failed).count(), 1);
}

/// S3: a large flood wait (over 60s) arms a session-wide cooldown; the rest
/// of the round's groups are recorded as skipped rather than retried.
#[tokio::test(start_paused = true)]
async fn large_flood_arms_cooldown_and_skips_remaining_groups() {
    let orchestrator = build(config());
    let repo = &orchestrator.context().repo;
    let client = &orchestrator.context().client;
    let tenant_id = TenantId::new();
    let session_id = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_id.clone(), tenant_id.clone())).await;
    for name in ["g1", "g2", "g3", "g4", "g5"] {
        repo.put_group(group(session_id.clone(), name)).await;
    }
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;
    client.script_send(session_id.clone(), "g1", Err(RawSendError::FloodWait(Duration::from_secs(300)))).await;

    let job = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    orchestrator.stop_job(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = job.stats();
    assert_eq!(stats.posted_groups, 0);
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.skipped_groups, 4);
    assert_eq!(stats.rounds_completed, 1);
}

/// S4: AuthRevoked halts the owning session but leaves the other session's
/// groups unaffected.
#[tokio::test(start_paused = true)]
async fn auth_revoked_halts_one_session_others_continue() {
    let orchestrator = build(config());
    let repo = &orchestrator.context().repo;
    let client = &orchestrator.context().client;
    let tenant_id = TenantId::new();
    let session_a = SessionId::new();
    let session_b = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_a.clone(), tenant_id.clone())).await;
    repo.put_session(session(session_b.clone(), tenant_id.clone())).await;
    for name in ["a1", "a2", "a3"] {
        repo.put_group(group(session_a.clone(), name)).await;
    }
    for name in ["b1", "b2", "b3"] {
        repo.put_group(group(session_b.clone(), name)).await;
    }
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;
    // Whichever of A's groups the shuffled driver reaches first gets
    // AuthRevoked; the rest of A's groups never reach send (the session
    // cooldown gate skips them first), so scripting all three keeps the
    // outcome independent of shuffle order.
    for name in ["a1", "a2", "a3"] {
        client.script_send(session_a.clone(), name, Err(RawSendError::AuthRevoked)).await;
    }

    let job = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    orchestrator.stop_job(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = job.stats();
    assert_eq!(stats.posted_groups, 3);
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.skipped_groups, 2);

    let banned = repo.get_session(&session_a).await.unwrap().unwrap();
    assert_eq!(banned.status, SessionStatus::Banned);
    assert!(banned.is_frozen);

    let untouched = repo.get_session(&session_b).await.unwrap().unwrap();
    assert_eq!(untouched.status, SessionStatus::Active);

    let history = repo.history_for(&job.post_id).await;
    assert_eq!(history.iter().filter(|h| h.status == DeliveryStatus::Failed).count(), 1);
    assert_eq!(history.iter().filter(|h| h.status == DeliveryStatus::Skipped).count(), 2);
    assert_eq!(history.iter().filter(|h| h.status == DeliveryStatus::Sent).count(), 3);
}

/// S5: a group still in its post-to-post cooldown window is skipped by a
/// second job started immediately after the first one's send.
#[tokio::test(start_paused = true)]
async fn group_on_cooldown_is_skipped_by_a_later_job() {
    let orchestrator = build(config());
    let repo = &orchestrator.context().repo;
    let tenant_id = TenantId::new();
    let session_id = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_id.clone(), tenant_id.clone())).await;
    repo.put_group(group(session_id.clone(), "g1")).await;
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;

    let first = orchestrator.start_posting(tenant_id.clone(), ad_id.clone(), false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    orchestrator.stop_job(&first.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(first.stats().posted_groups, 1);

    let second = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    orchestrator.stop_job(&second.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let stats = second.stats();
    assert_eq!(stats.posted_groups, 0);
    assert_eq!(stats.skipped_groups, 1);
}

/// S6: stopping mid-round halts new sends promptly; the round may never
/// complete.
#[tokio::test(start_paused = true)]
async fn stop_during_long_round_halts_promptly() {
    let mut cfg = config();
    cfg.min_group_delay_ms = 50;
    cfg.max_group_delay_ms = 50;
    let orchestrator = build(cfg);
    let repo = &orchestrator.context().repo;
    let tenant_id = TenantId::new();
    let session_a = SessionId::new();
    let session_b = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_a.clone(), tenant_id.clone())).await;
    repo.put_session(session(session_b.clone(), tenant_id.clone())).await;
    for i in 0..100 {
        repo.put_group(group(session_a.clone(), &format!("a{i}"))).await;
        repo.put_group(group(session_b.clone(), &format!("b{i}"))).await;
    }
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;

    let job = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    orchestrator.stop_job(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(job.status(), JobStatus::Stopped);
    let stats = job.stats();
    assert!(stats.posted_groups <= 200);
}

/// Immediate `StopJob` right after `StartPosting` bounds the number of
/// groups that could have been sent before the stop flag was observed by at
/// most one in-flight send per session.
#[tokio::test(start_paused = true)]
async fn immediate_stop_bounds_posted_groups_by_session_count() {
    let orchestrator = build(config());
    let repo = &orchestrator.context().repo;
    let tenant_id = TenantId::new();
    let session_id = SessionId::new();
    let ad_id = AdId::new();
    repo.put_tenant(tenant(tenant_id.clone())).await;
    repo.put_session(session(session_id.clone(), tenant_id.clone())).await;
    repo.put_group(group(session_id.clone(), "g1")).await;
    repo.put_group(group(session_id, "g2")).await;
    repo.put_ad(ad(ad_id.clone(), tenant_id.clone())).await;

    let job = orchestrator.start_posting(tenant_id, ad_id, false).await.unwrap();
    orchestrator.stop_job(&job.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(job.stats().posted_groups <= 1);
}
