// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use super::*;
use crate::errors::RawSendError;
use crate::ids::{AdId, GroupId, JobId, SessionId, TenantId};
use crate::model::{GroupKind, SessionStatus};
use crate::session_client::SendAck;
use crate::testing::{FakeClock, FakeSessionClient, InMemoryRepository};

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::parse_from(["broadcast-engine"]);
    config.min_group_delay_ms = 10;
    config.max_group_delay_ms = 10;
    config.group_cooldown_secs = 600;
    config
}

fn session(id: SessionId) -> Session {
    Session {
        id,
        tenant_id: TenantId::new(),
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

fn context(config: EngineConfig) -> EngineContext<InMemoryRepository, FakeSessionClient, FakeClock> {
    EngineContext::new(Arc::new(InMemoryRepository::new()), Arc::new(FakeSessionClient::new()), Arc::new(FakeClock::default()), Arc::new(config))
}

#[tokio::test(start_paused = true)]
async fn all_groups_sent_when_nothing_goes_wrong() {
    let ctx = context(fast_config());
    let job = Job::new(JobId::new(), TenantId::new(), AdId::new(), PostId::new(), ctx.clock.now());
    let session_id = SessionId::new();
    let session = session(session_id.clone());
    let groups = vec![group(session_id.clone(), "g1"), group(session_id.clone(), "g2"), group(session_id, "g3")];

    let sent = run_driver(&ctx, &job, &PostId::new(), &session, &session.id, "content", groups).await;

    assert_eq!(sent, 3);
    assert_eq!(job.stats().posted_groups, 3);
}

#[tokio::test(start_paused = true)]
async fn flood_wait_over_60s_skips_remaining_groups_as_session_cooldown() {
    let ctx = context(fast_config());
    let job = Job::new(JobId::new(), TenantId::new(), AdId::new(), PostId::new(), ctx.clock.now());
    let session_id = SessionId::new();
    let session = session(session_id.clone());
    let g1 = group(session_id.clone(), "g1");
    let g2 = group(session_id.clone(), "g2");
    let g3 = group(session_id.clone(), "g3");

    ctx.client.script_send(session_id.clone(), "g1", Err(RawSendError::FloodWait(Duration::from_secs(300)))).await;

    let sent = run_driver(&ctx, &job, &PostId::new(), &session, &session.id, "content", vec![g1, g2, g3]).await;

    assert_eq!(sent, 0);
    let stats = job.stats();
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.skipped_groups, 2);
}

#[tokio::test(start_paused = true)]
async fn flood_wait_under_60s_sleeps_inline_then_continues() {
    let ctx = context(fast_config());
    let job = Job::new(JobId::new(), TenantId::new(), AdId::new(), PostId::new(), ctx.clock.now());
    let session_id = SessionId::new();
    let session = session(session_id.clone());
    let g1 = group(session_id.clone(), "g1");
    let g2 = group(session_id.clone(), "g2");

    ctx.client.script_send(session_id.clone(), "g1", Err(RawSendError::FloodWait(Duration::from_secs(10)))).await;

    let sent = run_driver(&ctx, &job, &PostId::new(), &session, &session.id, "content", vec![g1, g2]).await;

    assert_eq!(sent, 1);
    let stats = job.stats();
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.posted_groups, 1);
}

#[tokio::test(start_paused = true)]
async fn group_in_cooldown_is_skipped() {
    let ctx = context(fast_config());
    let job = Job::new(JobId::new(), TenantId::new(), AdId::new(), PostId::new(), ctx.clock.now());
    let session_id = SessionId::new();
    let session = session(session_id.clone());
    let mut g = group(session_id, "g1");
    g.last_post_at = Some(ctx.clock.now());

    let sent = run_driver(&ctx, &job, &PostId::new(), &session, &session.id, "content", vec![g]).await;

    assert_eq!(sent, 0);
    assert_eq!(job.stats().skipped_groups, 1);
}

#[tokio::test(start_paused = true)]
async fn auth_revoked_bans_session_and_skips_remaining_groups() {
    let ctx = context(fast_config());
    let job = Job::new(JobId::new(), TenantId::new(), AdId::new(), PostId::new(), ctx.clock.now());
    let session_id = SessionId::new();
    let session = session(session_id.clone());
    let g1 = group(session_id.clone(), "g1");
    let g2 = group(session_id.clone(), "g2");

    ctx.client.script_send(session_id.clone(), "g1", Err(RawSendError::AuthRevoked)).await;

    let sent = run_driver(&ctx, &job, &PostId::new(), &session, &session.id, "content", vec![g1, g2]).await;

    assert_eq!(sent, 0);
    let stats = job.stats();
    assert_eq!(stats.failed_groups, 1);
    assert_eq!(stats.skipped_groups, 1);
    let stored = ctx.repo.get_session(&session_id).await.unwrap().expect("driver persists the banned session");
    assert_eq!(stored.status, SessionStatus::Banned);
    assert!(stored.is_frozen);
}

#[tokio::test(start_paused = true)]
async fn successful_send_returns_ack() {
    let ctx = context(fast_config());
    let job = Job::new(JobId::new(), TenantId::new(), AdId::new(), PostId::new(), ctx.clock.now());
    let session_id = SessionId::new();
    let session = session(session_id.clone());
    ctx.client.script_send(session_id.clone(), "g1", Ok(SendAck { message_id: Some("m1".into()) })).await;
    let g1 = group(session_id, "g1");

    let sent = run_driver(&ctx, &job, &PostId::new(), &session, &session.id, "content", vec![g1]).await;
    assert_eq!(sent, 1);
}
