// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maintenance loops: independent fire-and-log timers, none able to
//! block another. Each loop's tick is a free function so it is
//! unit-testable without spawning anything; each `spawn_*` wraps its tick
//! in a fire-and-forget background task.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::clock::{sleep_cancellable, Clock, CronSchedule};
use crate::config::EngineConfig;
use crate::ids::SessionId;
use crate::model::{epoch_day, PaymentStatus, SessionStatus, SubscriptionStatus, SystemStatistics};
use crate::repository::{RepoResult, Repository};

const PAYMENT_EXPIRY_AGE: Duration = Duration::from_secs(48 * 3600);
const FROZEN_SESSION_THAW_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Spawns all four count-returning loops plus the priority recompute loop,
/// each on its own independent timer.
pub fn spawn_maintenance_loops<R: Repository, C: Clock>(repo: Arc<R>, clock: Arc<C>, config: Arc<EngineConfig>, shutdown: CancellationToken) {
    spawn_loop(Arc::clone(&repo), Arc::clone(&clock), CronSchedule::EveryHour, shutdown.clone(), "subscription expiry", |repo, clock| {
        expire_subscriptions(repo, clock)
    });
    spawn_loop(Arc::clone(&repo), Arc::clone(&clock), CronSchedule::EveryNHours(6), shutdown.clone(), "payment expiry", |repo, clock| {
        expire_payments(repo, clock)
    });
    spawn_loop(
        Arc::clone(&repo),
        Arc::clone(&clock),
        CronSchedule::DailyAt { hour: 3, minute: 0 },
        shutdown.clone(),
        "frozen session thaw",
        |repo, clock| thaw_frozen_sessions(repo, clock),
    );
    spawn_loop(
        Arc::clone(&repo),
        Arc::clone(&clock),
        CronSchedule::DailyAt { hour: 0, minute: 0 },
        shutdown.clone(),
        "daily statistics rollup",
        |repo, clock| roll_up_daily_statistics(repo, clock),
    );
    spawn_priority_recompute_loop(repo, clock, config, shutdown);
}

/// Shared plumbing for the three count-returning loops: sleep until the
/// schedule's next fire, run the tick, log the outcome, repeat.
fn spawn_loop<R, C, F, Fut>(repo: Arc<R>, clock: Arc<C>, schedule: CronSchedule, shutdown: CancellationToken, label: &'static str, tick: F)
where
    R: Repository,
    C: Clock,
    F: Fn(Arc<R>, Arc<C>) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = RepoResult<usize>> + Send,
{
    tokio::spawn(async move {
        loop {
            let wait = schedule.duration_until_next(clock.now());
            sleep_cancellable(&*clock, wait, &shutdown).await;
            if shutdown.is_cancelled() {
                break;
            }
            match tick(Arc::clone(&repo), Arc::clone(&clock)).await {
                Ok(count) => info!(count, loop_name = label, "maintenance tick"),
                Err(err) => error!(error = ?err, loop_name = label, "maintenance tick failed"),
            }
        }
    });
}

/// Subscription expiry: Active + `end_date <= now` → Expired.
pub async fn expire_subscriptions<R: Repository, C: Clock>(repo: Arc<R>, clock: Arc<C>) -> RepoResult<usize> {
    let now = clock.now();
    let expiring = repo.list_subscriptions_expiring(now).await?;
    let count = expiring.len();
    for mut subscription in expiring {
        subscription.status = SubscriptionStatus::Expired;
        repo.update_subscription(&subscription).await?;
    }
    Ok(count)
}

/// Payment expiry: Pending + `created_at <= now - 48h` → Expired.
pub async fn expire_payments<R: Repository, C: Clock>(repo: Arc<R>, clock: Arc<C>) -> RepoResult<usize> {
    let threshold = clock.now() - PAYMENT_EXPIRY_AGE;
    let pending = repo.list_payments_pending_before(threshold).await?;
    let count = pending.len();
    for mut payment in pending {
        payment.status = PaymentStatus::Expired;
        repo.update_payment(&payment).await?;
    }
    Ok(count)
}

/// Frozen-session thaw: a session frozen more than 7 days ago has the
/// freeze cleared. Status is left untouched — Banned sessions stay Banned.
pub async fn thaw_frozen_sessions<R: Repository, C: Clock>(repo: Arc<R>, clock: Arc<C>) -> RepoResult<usize> {
    let threshold = clock.now() - FROZEN_SESSION_THAW_AGE;
    let frozen = repo.list_frozen_sessions_before(threshold).await?;
    let mut thawed = 0;
    for mut session in frozen {
        if session.status == SessionStatus::Banned {
            continue;
        }
        session.is_frozen = false;
        session.frozen_at = None;
        session.unfreeze_at = None;
        repo.update_session(&session).await?;
        thawed += 1;
    }
    Ok(thawed)
}

/// Daily statistics rollup: upsert the `SystemStatistics` row for the
/// day that just ended.
pub async fn roll_up_daily_statistics<R: Repository, C: Clock>(repo: Arc<R>, clock: Arc<C>) -> RepoResult<usize> {
    let now = clock.now();
    let day = epoch_day(now);
    let day_start = SystemTime::UNIX_EPOCH + Duration::from_secs(day * 86_400);
    let day_end = day_start + Duration::from_secs(86_400);

    let inputs = repo.daily_rollup_inputs(day_start, day_end).await?;
    let stats = SystemStatistics {
        epoch_day: day,
        posts_completed: inputs.posts_completed,
        groups_sent: inputs.groups_sent,
        groups_failed: inputs.groups_failed,
        revenue: inputs.revenue,
    };
    repo.upsert_daily_statistics(&stats).await?;
    Ok(1)
}

fn spawn_priority_recompute_loop<R: Repository, C: Clock>(repo: Arc<R>, clock: Arc<C>, config: Arc<EngineConfig>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        loop {
            let wait = CronSchedule::EveryHour.duration_until_next(clock.now());
            sleep_cancellable(&*clock, wait, &shutdown).await;
            if shutdown.is_cancelled() {
                break;
            }
            let sessions = match repo.list_all_sessions().await {
                Ok(sessions) => sessions,
                Err(err) => {
                    error!(error = ?err, "priority recompute: failed to list sessions");
                    continue;
                }
            };
            for session in sessions {
                if let Err(err) = recompute_priority_groups(&*repo, &session.id, config.priority_top_n).await {
                    error!(error = ?err, session_id = %session.id, "priority recompute failed");
                }
            }
        }
    });
}

/// Priority group recompute: per session, the top `top_n` groups by
/// `(activity_score desc, member_count desc)` are marked `is_priority` with
/// `priority_order` 1..=top_n; every other group is demoted. Returns the
/// number of groups marked priority. Callable directly from a maintenance
/// tick or from tests.
pub async fn recompute_priority_groups<R: Repository>(repo: &R, session_id: &SessionId, top_n: usize) -> RepoResult<usize> {
    let mut groups = repo.list_groups_for_session(session_id).await?;
    groups.sort_by(|a, b| b.activity_score.total_cmp(&a.activity_score).then_with(|| b.member_count.cmp(&a.member_count)));

    let mut marked = 0;
    for (idx, mut group) in groups.into_iter().enumerate() {
        let (is_priority, priority_order) = if idx < top_n { (true, Some(idx as u32 + 1)) } else { (false, None) };
        if group.is_priority == is_priority && group.priority_order == priority_order {
            continue;
        }
        group.is_priority = is_priority;
        group.priority_order = priority_order;
        if is_priority {
            marked += 1;
        }
        repo.update_group(&group).await?;
    }
    Ok(marked)
}
