// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The round loop: round -> inter-round pause -> round -> …, forever,
//! until `StopJob` flips the sticky stop flag. Owns nothing process-wide;
//! everything it needs travels in as an argument, spawned once per job by
//! `crate::orchestrator::Orchestrator::start_posting`.

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ids::{AdId, GroupId, PostId};
use crate::job::{poll_until, Job};
use crate::model::{AdStatus, Group, Session};
use crate::post::PostStatus;
use crate::repository::Repository;
use crate::session_client::SessionClient;

use super::driver::run_driver;
use super::EngineContext;

/// Everything one job's round loop needs, gathered once by `StartPosting`
/// and handed to the spawned task.
pub struct RoundLoopInputs<S: SessionClient> {
    pub post_id: PostId,
    pub ad_id: AdId,
    /// Ad content, already brand-suffixed per tenant. A snapshot taken at
    /// `StartPosting` time, not refreshed per round.
    pub content: String,
    pub selected_groups: Vec<GroupId>,
    pub use_priority_groups: bool,
    pub sessions: Vec<(Session, S::Handle)>,
}

/// Runs until the job's stop flag is set, or the ad is no longer `Active`.
/// Never returns an error; all failures are recorded on the job itself.
pub async fn run_round_loop<R: Repository, S: SessionClient, C: crate::clock::Clock>(
    ctx: Arc<EngineContext<R, S, C>>,
    job: Arc<Job>,
    inputs: RoundLoopInputs<S>,
) {
    loop {
        if job.is_stop_requested() {
            break;
        }
        while job.is_pause_requested() && !job.is_stop_requested() {
            poll_until(Duration::from_secs(5), Duration::from_secs(5), &job.stop).await;
        }
        if job.is_stop_requested() {
            break;
        }

        // Only an Active ad may be the subject of a running Post. If a
        // controller pauses/closes it from under us, finish up.
        match ctx.repo.get_ad(&inputs.ad_id).await {
            Ok(Some(ad)) if ad.status != AdStatus::Active => {
                job.mark_completed();
                break;
            }
            Ok(None) => {
                job.mark_completed();
                break;
            }
            _ => {}
        }

        run_round(&ctx, &job, &inputs).await;

        if job.is_stop_requested() {
            break;
        }

        let pause = jittered_round_pause(ctx.config.round_pause());
        poll_until(pause, Duration::from_secs(2), &job.stop).await;
    }

    sync_post_record(&ctx, &job, &inputs.post_id).await;
}

/// Run one round: partition by session, spawn one driver per session,
/// wait for all of them. Concurrency is session-level parallel,
/// per-session serial.
async fn run_round<R: Repository, S: SessionClient, C: crate::clock::Clock>(
    ctx: &Arc<EngineContext<R, S, C>>,
    job: &Arc<Job>,
    inputs: &RoundLoopInputs<S>,
) {
    let mut drivers = Vec::with_capacity(inputs.sessions.len());

    for (session, handle) in &inputs.sessions {
        let groups = ctx.repo.list_groups_for_session(&session.id).await.unwrap_or_default();
        let now = ctx.clock.now();

        let mut deliverable: Vec<Group> = groups
            .into_iter()
            .filter(|g| g.is_deliverable(now))
            .filter(|g| inputs.selected_groups.is_empty() || inputs.selected_groups.contains(&g.id))
            .filter(|g| !inputs.use_priority_groups || g.is_priority)
            .collect();
        deliverable.shuffle(&mut rand::rng());

        let ctx = Arc::clone(ctx);
        let job = Arc::clone(job);
        let post_id = inputs.post_id.clone();
        let session = session.clone();
        let handle = handle.clone();
        let content = inputs.content.clone();

        drivers.push(tokio::spawn(async move { run_driver(&ctx, &job, &post_id, &session, &handle, &content, deliverable).await }));
    }

    for driver in drivers {
        let _ = driver.await;
    }

    job.record_round();
}

/// `uniformInt(roundPauseMs - 3min, roundPauseMs + 3min)`.
fn jittered_round_pause(base: Duration) -> Duration {
    let jitter = Duration::from_secs(180);
    let min = base.saturating_sub(jitter);
    let max = base + jitter;
    if min >= max {
        return base;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rand::rng().random_range(0..=span))
}

async fn sync_post_record<R: Repository, S: SessionClient, C: crate::clock::Clock>(ctx: &Arc<EngineContext<R, S, C>>, job: &Job, post_id: &PostId) {
    let Ok(Some(mut post)) = ctx.repo.get_post(post_id).await else {
        return;
    };
    let stats = job.stats();
    post.groups_completed = stats.posted_groups;
    post.groups_failed = stats.failed_groups;
    post.groups_skipped = stats.skipped_groups;
    post.status = match stats.status {
        crate::job::JobStatus::Completed => PostStatus::Completed,
        _ => PostStatus::Cancelled,
    };
    let _ = ctx.repo.update_post(&post).await;
}
