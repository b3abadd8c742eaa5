// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

use super::*;

fn config() -> EngineConfig {
    EngineConfig::parse_from(["broadcast-engine"])
}

fn now() -> SystemTime {
    SystemTime::now()
}

#[test]
fn check_cooldown_is_clear_with_no_cooldown_armed() {
    let mut state = SessionRateState::default();
    assert_eq!(state.check_cooldown(now()), CooldownCheck::Clear);
}

#[test]
fn check_cooldown_reports_active_before_expiry() {
    let mut state = SessionRateState::default();
    let t = now();
    state.cooldown_until = Some(t + Duration::from_secs(60));
    assert_eq!(state.check_cooldown(t), CooldownCheck::Active);
}

#[test]
fn check_cooldown_lazily_clears_once_elapsed() {
    let mut state = SessionRateState::default();
    let t = now();
    state.cooldown_until = Some(t - Duration::from_secs(1));
    state.messages_sent = 7;
    assert_eq!(state.check_cooldown(t), CooldownCheck::Clear);
    assert!(state.cooldown_until.is_none());
    assert_eq!(state.messages_sent, 0);
}

#[test]
fn on_success_arms_cooldown_at_message_limit() {
    let config = config();
    let mut state = SessionRateState::default();
    let t = now();
    for _ in 0..config.session_message_limit - 1 {
        state.on_success(t, &config);
    }
    assert!(state.cooldown_until.is_none());
    state.on_success(t, &config);
    assert!(state.cooldown_until.is_some());
    assert_eq!(state.messages_sent, 0);
}

#[test]
fn on_success_resets_consecutive_errors() {
    let config = config();
    let mut state = SessionRateState { consecutive_errors: 3, ..Default::default() };
    state.on_success(now(), &config);
    assert_eq!(state.consecutive_errors, 0);
}

#[test]
fn on_flood_with_short_wait_returns_inline_sleep() {
    let config = config();
    let mut state = SessionRateState::default();
    let sleep = state.on_flood(Duration::from_secs(5), now(), &config);
    assert_eq!(sleep, Some(Duration::from_secs(5)));
    assert!(state.cooldown_until.is_none());
}

#[test]
fn on_flood_with_long_wait_arms_cooldown_instead_of_inline_sleep() {
    let config = config();
    let mut state = SessionRateState::default();
    let t = now();
    let sleep = state.on_flood(Duration::from_secs(300), t, &config);
    assert_eq!(sleep, None);
    assert_eq!(state.cooldown_until, Some(t + Duration::from_secs(300)));
}

#[test]
fn on_flood_freezes_session_past_threshold() {
    let config = config();
    let mut state = SessionRateState::default();
    let t = now();
    for _ in 0..config.max_flood_per_session {
        state.on_flood(Duration::from_secs(1), t, &config);
    }
    assert_eq!(state.cooldown_until, Some(t + config.flood_freeze()));
}

#[test]
fn on_auth_revoked_arms_an_effectively_permanent_cooldown() {
    let mut state = SessionRateState::default();
    state.on_auth_revoked();
    let until = state.cooldown_until.expect("cooldown armed");
    assert!(until.duration_since(SystemTime::now()).unwrap() > Duration::from_secs(300 * 24 * 3600));
}

#[test]
fn on_transient_arms_cooldown_after_consecutive_threshold() {
    let config = config();
    let mut state = SessionRateState::default();
    let t = now();
    for _ in 0..config.max_consecutive_errors - 1 {
        state.on_transient(t, &config);
    }
    assert!(state.cooldown_until.is_none());
    state.on_transient(t, &config);
    assert!(state.cooldown_until.is_some());
    assert_eq!(state.consecutive_errors, 0);
}

#[tokio::test]
async fn registry_creates_default_entry_on_first_touch() {
    let registry = RateStateRegistry::new();
    let session_id = SessionId::new();
    assert!(registry.snapshot(&session_id).await.is_none());
    registry.with_state(&session_id, |s| s.messages_sent += 1).await;
    let snapshot = registry.snapshot(&session_id).await.expect("entry created");
    assert_eq!(snapshot.messages_sent, 1);
}

#[tokio::test]
async fn registry_tracks_sessions_independently() {
    let registry = RateStateRegistry::new();
    let a = SessionId::new();
    let b = SessionId::new();
    registry.with_state(&a, |s| s.messages_sent = 5).await;
    registry.with_state(&b, |s| s.messages_sent = 9).await;
    assert_eq!(registry.snapshot(&a).await.unwrap().messages_sent, 5);
    assert_eq!(registry.snapshot(&b).await.unwrap().messages_sent, 9);
}
