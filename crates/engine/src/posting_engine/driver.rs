// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session driver: one serial pass through a shuffled group list. Runs
//! concurrently with every other session's driver in the same round;
//! within itself, sends are strictly sequential.

use std::time::Duration;

use rand::Rng;

use crate::classifier::{self, apply_effects, apply_success, GROUP_COOLDOWN_REASON, SESSION_COOLDOWN_REASON};
use crate::clock::{sleep_cancellable, Clock};
use crate::config::EngineConfig;
use crate::errors::ErrorKind;
use crate::ids::PostId;
use crate::job::{Job, LogOutcome};
use crate::model::{Group, Session};
use crate::post::PostHistory;
use crate::rate_state::CooldownCheck;
use crate::repository::Repository;
use crate::session_client::SessionClient;

use super::EngineContext;

/// Run one session's drive through `groups` for a single round. Returns the
/// number of successful sends.
pub async fn run_driver<R: Repository, S: SessionClient, C: Clock>(
    ctx: &EngineContext<R, S, C>,
    job: &Job,
    post_id: &PostId,
    session: &Session,
    handle: &S::Handle,
    content: &str,
    groups: Vec<Group>,
) -> u64 {
    let mut sent_this_driver: u64 = 0;
    let total = groups.len();

    for (idx, mut group) in groups.into_iter().enumerate() {
        if job.is_stop_requested() {
            return sent_this_driver;
        }
        // Spin on pause at 2 s intervals.
        while job.is_pause_requested() && !job.is_stop_requested() {
            crate::job::poll_until(Duration::from_secs(2), Duration::from_secs(2), &job.stop).await;
        }
        if job.is_stop_requested() {
            return sent_this_driver;
        }

        let now = ctx.clock.now();

        // Group cooldown.
        if let Some(last) = group.last_post_at {
            if now.duration_since(last).unwrap_or_default() < ctx.config.group_cooldown() {
                skip(ctx, job, post_id, &session.id, &group.id, GROUP_COOLDOWN_REASON, now).await;
                continue;
            }
        }

        // Session cooldown.
        let cooldown = ctx.rate_states.with_state(&session.id, |state| state.check_cooldown(now)).await;
        if cooldown == CooldownCheck::Active {
            skip(ctx, job, post_id, &session.id, &group.id, SESSION_COOLDOWN_REASON, now).await;
            continue;
        }

        // Send, then classify and record.
        match ctx.client.send(handle, &group.platform_id, content).await {
            Ok(ack) => {
                ctx.rate_states.with_state(&session.id, |state| apply_success(state, &mut group, now, &ctx.config)).await;
                let _ = ctx.repo.update_group(&group).await;
                job.record_sent();
                sent_this_driver += 1;
                job.log(session.id.clone(), Some(group.id.clone()), LogOutcome::Sent, "Sent");
                let _ = ctx.repo.record_post_history(&PostHistory::sent(post_id.clone(), group.id.clone(), now, ack.message_id)).await;
            }
            Err(raw) => {
                let kind = classifier::classify_send_error(&raw);
                let mut session_mut = session.clone();
                let effect = ctx
                    .rate_states
                    .with_state(&session.id, |state| apply_effects(&kind, &mut session_mut, state, &mut group, now, &ctx.config))
                    .await;
                let _ = ctx.repo.update_group(&group).await;

                if matches!(kind, ErrorKind::AuthRevoked) {
                    let _ = ctx.repo.update_session(&session_mut).await;
                    ctx.disconnect(&session.id).await;
                }

                job.log(session.id.clone(), Some(group.id.clone()), effect.log_outcome, effect.message.clone());
                match effect.log_outcome {
                    LogOutcome::Sent => unreachable!("a failed send never logs Sent"),
                    LogOutcome::Failed => {
                        job.record_failed();
                        let history = PostHistory::failed(post_id.clone(), group.id.clone(), now, effect.message.clone());
                        let _ = ctx.repo.record_post_history(&history).await;
                    }
                    LogOutcome::Skipped => {
                        job.record_skipped();
                        let history = PostHistory::skipped(post_id.clone(), group.id.clone(), now, effect.message.clone());
                        let _ = ctx.repo.record_post_history(&history).await;
                    }
                }

                if let Some(wait) = effect.inline_sleep {
                    sleep_cancellable(&*ctx.clock, wait, &job.stop).await;
                }
            }
        }

        if job.is_stop_requested() {
            return sent_this_driver;
        }

        let is_last = idx + 1 == total;
        if !is_last {
            let delay = next_group_delay(sent_this_driver, &ctx.config);
            sleep_cancellable(&*ctx.clock, delay, &job.stop).await;
        }
    }

    sent_this_driver
}

async fn skip<R: Repository, S: SessionClient, C: Clock>(
    ctx: &EngineContext<R, S, C>,
    job: &Job,
    post_id: &PostId,
    session_id: &crate::ids::SessionId,
    group_id: &crate::ids::GroupId,
    reason: &'static str,
    now: std::time::SystemTime,
) {
    job.log(session_id.clone(), Some(group_id.clone()), LogOutcome::Skipped, reason);
    job.record_skipped();
    let history = PostHistory::skipped(post_id.clone(), group_id.clone(), now, reason);
    let _ = ctx.repo.record_post_history(&history).await;
}

/// Long pause every `long_pause_interval` sends, otherwise the ordinary
/// inter-group delay. Both ranges are inclusive uniform draws.
fn next_group_delay(sent_so_far: u64, config: &EngineConfig) -> Duration {
    let mut rng = rand::rng();
    if sent_so_far > 0 && sent_so_far % u64::from(config.long_pause_interval) == 0 {
        uniform(&mut rng, config.long_pause_min(), config.long_pause_max())
    } else {
        uniform(&mut rng, config.min_group_delay(), config.max_group_delay())
    }
}

fn uniform(rng: &mut impl Rng, min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    Duration::from_millis(min.as_millis() as u64 + rng.random_range(0..=span))
}

#[cfg(test)]
#[path = "driver_tests.rs"]
mod tests;
