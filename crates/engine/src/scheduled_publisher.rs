// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduled ad publisher: a fire-every-minute scan for ads whose
//! `scheduled_for` has come due. [`publish_due_ads`] does one tick's work
//! and is unit-testable directly; [`spawn_scheduled_publisher`] is the
//! fire-and-forget background task, in the same shape as the engine's
//! other maintenance loops.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::clock::{sleep_cancellable, Clock, CronSchedule};
use crate::errors::OrchestratorError;
use crate::model::AdStatus;
use crate::orchestrator::Orchestrator;
use crate::repository::Repository;
use crate::session_client::SessionClient;

pub fn spawn_scheduled_publisher<R: Repository, S: SessionClient, C: Clock>(orchestrator: Arc<Orchestrator<R, S, C>>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let schedule = CronSchedule::EveryMinute;
        loop {
            let clock = Arc::clone(&orchestrator.context().clock);
            let wait = schedule.duration_until_next(clock.now());
            sleep_cancellable(&*clock, wait, &shutdown).await;
            if shutdown.is_cancelled() {
                break;
            }
            if let Err(err) = publish_due_ads(&orchestrator).await {
                error!(error = ?err, "scheduled publisher tick failed");
            }
        }
    });
}

/// One tick: publish every ad due for scheduled delivery.
pub async fn publish_due_ads<R: Repository, S: SessionClient, C: Clock>(orchestrator: &Orchestrator<R, S, C>) -> Result<(), OrchestratorError> {
    let ctx = orchestrator.context();
    let now = ctx.clock.now();
    let due = ctx.repo.list_due_scheduled_ads(now).await?;

    for mut ad in due {
        let tenant_id = ad.tenant_id.clone();
        let ad_id = ad.id.clone();

        match orchestrator.start_posting(tenant_id, ad_id, false).await {
            Ok(job) => {
                ad.status = AdStatus::Active;
                ad.last_scheduled_at = Some(now);
                ad.last_error = None;
                ctx.repo.update_ad(&ad).await?;
                info!(ad_id = %ad.id, job_id = %job.id, "scheduled ad published");
            }
            Err(err) => {
                ad.status = AdStatus::Paused;
                ad.last_error = Some(err.to_string());
                ctx.repo.update_ad(&ad).await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use clap::Parser;

    use super::*;
    use crate::config::EngineConfig;
    use crate::ids::{AdId, GroupId, SessionId, TenantId};
    use crate::model::{Ad, Group, GroupKind, Session, SessionStatus, Tenant};
    use crate::testing::{FakeClock, FakeSessionClient, InMemoryRepository};

    fn orchestrator() -> Orchestrator<InMemoryRepository, FakeSessionClient, FakeClock> {
        Orchestrator::new(InMemoryRepository::new(), FakeSessionClient::new(), FakeClock::default(), EngineConfig::parse_from(["broadcast-engine"]))
    }

    async fn seed_deliverable_tenant(orch: &Orchestrator<InMemoryRepository, FakeSessionClient, FakeClock>, tenant_id: TenantId) {
        orch.context()
            .repo
            .put_tenant(Tenant { id: tenant_id.clone(), name: "t".into(), brand_ad_enabled: false, subscription: None })
            .await;
        let session_id = SessionId::new();
        orch.context()
            .repo
            .put_session(Session {
                id: session_id.clone(),
                tenant_id: tenant_id.clone(),
                name: "s".into(),
                phone: "+1".into(),
                session_string: "cred".into(),
                status: SessionStatus::Active,
                is_frozen: false,
                frozen_at: None,
                unfreeze_at: None,
                freeze_count: 0,
                last_sync_at: None,
                total_groups: 1,
                active_groups: 1,
            })
            .await;
        orch.context()
            .repo
            .put_group(Group {
                id: GroupId::new(),
                session_id,
                platform_id: "g1".into(),
                title: "g".into(),
                kind: GroupKind::Group,
                member_count: 1,
                is_active: true,
                is_skipped: false,
                skip_reason: None,
                has_restrictions: false,
                restriction_until: None,
                is_priority: false,
                priority_order: None,
                activity_score: 0.0,
                last_post_at: None,
            })
            .await;
    }

    fn due_ad(tenant_id: TenantId, now: SystemTime) -> Ad {
        Ad {
            id: AdId::new(),
            tenant_id,
            content: "buy now".into(),
            media: vec![],
            status: AdStatus::Active,
            scheduled_for: Some(now),
            is_scheduled: true,
            interval_min: None,
            interval_max: None,
            group_interval: None,
            brand_ad_text: None,
            selected_groups: vec![],
            last_scheduled_at: None,
            last_error: None,
        }
    }

    #[tokio::test]
    async fn publishes_due_ad_and_stamps_last_scheduled_at() {
        let orch = orchestrator();
        let tenant_id = TenantId::new();
        seed_deliverable_tenant(&orch, tenant_id.clone()).await;
        let now = orch.now();
        let ad = due_ad(tenant_id, now);
        let ad_id = ad.id.clone();
        orch.context().repo.put_ad(ad).await;

        publish_due_ads(&orch).await.unwrap();

        let stored = orch.context().repo.get_ad(&ad_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AdStatus::Active);
        assert!(stored.last_scheduled_at.is_some());
        assert!(stored.last_error.is_none());
    }

    #[tokio::test]
    async fn failure_to_start_pauses_ad_and_records_error() {
        let orch = orchestrator();
        let tenant_id = TenantId::new();
        // No tenant/sessions/groups seeded: StartPosting will fail.
        let ad = due_ad(tenant_id, orch.now());
        let ad_id = ad.id.clone();
        orch.context().repo.put_ad(ad).await;

        publish_due_ads(&orch).await.unwrap();

        let stored = orch.context().repo.get_ad(&ad_id).await.unwrap().unwrap();
        assert_eq!(stored.status, AdStatus::Paused);
        assert!(stored.last_error.is_some());
    }

    #[tokio::test]
    async fn ad_not_yet_due_is_left_alone() {
        let orch = orchestrator();
        let tenant_id = TenantId::new();
        seed_deliverable_tenant(&orch, tenant_id.clone()).await;
        let mut ad = due_ad(tenant_id, orch.now());
        ad.scheduled_for = Some(orch.now() + std::time::Duration::from_secs(3600));
        let ad_id = ad.id.clone();
        orch.context().repo.put_ad(ad).await;

        publish_due_ads(&orch).await.unwrap();

        let stored = orch.context().repo.get_ad(&ad_id).await.unwrap().unwrap();
        assert!(stored.last_scheduled_at.is_none());
    }
}
