// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session anti-throttle state machine.
//!
//! [`SessionRateState`] is pure data plus pure transition methods so the
//! state machine itself is unit-testable without spinning up a driver.
//! [`RateStateRegistry`] is the concurrency wrapper: one entry per session,
//! guarded by its own lock — a read-mostly outer map plus cheap per-entry
//! locking, since only one driver ever touches a given session's entry at
//! a time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::ids::SessionId;

/// In-memory only; never persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionRateState {
    pub messages_sent: u32,
    pub flood_count: u32,
    pub consecutive_errors: u32,
    pub cooldown_until: Option<SystemTime>,
}

/// What a driver should do after arming/observing a cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownCheck {
    /// No cooldown in effect; proceed.
    Clear,
    /// A cooldown is in effect; skip the rest of this session's groups.
    Active,
}

impl SessionRateState {
    /// Lazily clears an elapsed cooldown and reports whether it is still
    /// active: `cooldown_until` once elapsed is cleared on inspection rather
    /// than by a background sweep.
    pub fn check_cooldown(&mut self, now: SystemTime) -> CooldownCheck {
        match self.cooldown_until {
            Some(until) if until > now => CooldownCheck::Active,
            Some(_) => {
                self.cooldown_until = None;
                self.messages_sent = 0;
                CooldownCheck::Clear
            }
            None => CooldownCheck::Clear,
        }
    }

    /// Records a successful send, rolling into cooldown once the
    /// per-session message limit is reached.
    pub fn on_success(&mut self, now: SystemTime, config: &EngineConfig) {
        self.messages_sent += 1;
        self.consecutive_errors = 0;
        if self.messages_sent >= config.session_message_limit {
            self.cooldown_until = Some(now + config.session_cooldown);
            self.messages_sent = 0;
        }
    }

    /// Records a flood-control signal. Returns the inline sleep to apply (if any) —
    /// the driver, not this state machine, performs the actual sleep so the
    /// state machine stays synchronous and unit-testable.
    pub fn on_flood(&mut self, wait: Duration, now: SystemTime, config: &EngineConfig) -> Option<Duration> {
        self.flood_count += 1;
        self.consecutive_errors += 1;

        let inline_sleep = if wait <= Duration::from_secs(60) {
            Some(wait)
        } else {
            self.cooldown_until = Some(now + wait);
            None
        };

        if self.flood_count >= config.max_flood_per_session {
            self.cooldown_until = Some(now + config.flood_freeze);
        }

        inline_sleep
    }

    /// Records an auth-revoked failure: effectively permanent cooldown.
    pub fn on_auth_revoked(&mut self) {
        self.cooldown_until = Some(SystemTime::now() + Duration::from_secs(365 * 24 * 3600));
    }

    /// Records a transient or unclassified error.
    pub fn on_transient(&mut self, now: SystemTime, config: &EngineConfig) {
        self.consecutive_errors += 1;
        if self.consecutive_errors >= config.max_consecutive_errors {
            self.cooldown_until = Some(now + config.session_cooldown_on_errors);
            self.consecutive_errors = 0;
        }
    }
}

/// One lock per session; the outer map itself is read-mostly (grows once
/// per session the first time it's touched, never shrinks within a job).
#[derive(Default)]
pub struct RateStateRegistry {
    entries: RwLock<HashMap<SessionId, Mutex<SessionRateState>>>,
}

impl RateStateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the session's rate state, creating a default entry
    /// on first use. The fast path only takes a read lock on the outer map;
    /// the write lock is only needed once per session, for its first touch.
    pub async fn with_state<R>(&self, session_id: &SessionId, f: impl FnOnce(&mut SessionRateState) -> R) -> R {
        {
            let entries = self.entries.read().await;
            if let Some(mutex) = entries.get(session_id) {
                let mut state = mutex.lock().unwrap_or_else(|e| e.into_inner());
                return f(&mut state);
            }
        }
        let mut entries = self.entries.write().await;
        let mutex = entries.entry(session_id.clone()).or_insert_with(|| Mutex::new(SessionRateState::default()));
        let mut state = mutex.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    /// Snapshot for diagnostics; the only reader outside the owning driver.
    pub async fn snapshot(&self, session_id: &SessionId) -> Option<SessionRateState> {
        let entries = self.entries.read().await;
        entries.get(session_id).map(|m| *m.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[cfg(test)]
#[path = "rate_state_tests.rs"]
mod tests;
