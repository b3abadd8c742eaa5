// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error classification and side effects. Pure functions: the driver owns
//! the actual mutation order and I/O, this module only computes what
//! should change — a pure mapping plus a pure effect description, no I/O
//! inside the enum itself.

use std::time::{Duration, SystemTime};

use crate::config::EngineConfig;
use crate::errors::{ErrorKind, RawSendError};
use crate::job::LogOutcome;
use crate::model::{Group, Session, SessionStatus};
use crate::rate_state::SessionRateState;

/// Platform wire error -> engine taxonomy. The only place that speaks
/// the platform's dialect.
pub fn classify_send_error(raw: &RawSendError) -> ErrorKind {
    match raw {
        RawSendError::FloodWait(d) => ErrorKind::FloodWait(d.as_secs()),
        RawSendError::SlowmodeWait(d) => ErrorKind::SlowmodeWait(d.as_secs()),
        RawSendError::WriteForbidden => ErrorKind::WriteForbidden,
        // chat-restricted/plain-send-forbidden/premium-required share the
        // write-forbidden-shaped effect but a distinct reason string.
        RawSendError::ChatRestricted | RawSendError::PremiumRequired => ErrorKind::ChatRestricted,
        RawSendError::AuthRevoked => ErrorKind::AuthRevoked,
        RawSendError::Transient(msg) => ErrorKind::Transient(msg.clone()),
    }
}

/// What the driver should do after classifying and applying effects.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyEffect {
    pub log_outcome: LogOutcome,
    pub message: String,
    /// If set, the driver should sleep this long before its next group
    /// (flood-signal wait under 60s) in addition to any gated wait.
    pub inline_sleep: Option<Duration>,
}

/// Apply a successful send's effects.
pub fn apply_success(session_rate: &mut SessionRateState, group: &mut Group, now: SystemTime, config: &EngineConfig) -> ClassifyEffect {
    session_rate.on_success(now, config);
    group.last_post_at = Some(now);
    ClassifyEffect { log_outcome: LogOutcome::Sent, message: "Sent".to_string(), inline_sleep: None }
}

/// Apply a classified failure's effects and return what the driver should
/// log. `session` is mutated only for [`ErrorKind::AuthRevoked`].
pub fn apply_effects(
    kind: &ErrorKind,
    session: &mut Session,
    session_rate: &mut SessionRateState,
    group: &mut Group,
    now: SystemTime,
    config: &EngineConfig,
) -> ClassifyEffect {
    match kind {
        ErrorKind::FloodWait(secs) => {
            let wait = Duration::from_secs(*secs);
            let inline_sleep = session_rate.on_flood(wait, now, config);
            ClassifyEffect { log_outcome: LogOutcome::Failed, message: format!("FLOOD_WAIT {secs}"), inline_sleep }
        }
        ErrorKind::SlowmodeWait(secs) => {
            group.has_restrictions = true;
            group.skip_reason = Some(format!("slowmode {secs}"));
            group.restriction_until = Some(now + Duration::from_secs(*secs));
            ClassifyEffect { log_outcome: LogOutcome::Skipped, message: format!("slowmode {secs}"), inline_sleep: None }
        }
        ErrorKind::WriteForbidden => {
            group.has_restrictions = true;
            group.is_skipped = true;
            group.skip_reason = Some("write forbidden".to_string());
            ClassifyEffect { log_outcome: LogOutcome::Skipped, message: "write forbidden".to_string(), inline_sleep: None }
        }
        ErrorKind::ChatRestricted => {
            group.has_restrictions = true;
            group.is_skipped = true;
            group.skip_reason = Some("chat restricted".to_string());
            ClassifyEffect { log_outcome: LogOutcome::Skipped, message: "chat restricted".to_string(), inline_sleep: None }
        }
        ErrorKind::AuthRevoked => {
            session.status = SessionStatus::Banned;
            session.is_frozen = true;
            session.frozen_at = Some(now);
            session.freeze_count += 1;
            session_rate.on_auth_revoked();
            ClassifyEffect { log_outcome: LogOutcome::Failed, message: "session dead".to_string(), inline_sleep: None }
        }
        ErrorKind::Transient(raw) => {
            session_rate.on_transient(now, config);
            ClassifyEffect { log_outcome: LogOutcome::Failed, message: raw.clone(), inline_sleep: None }
        }
        ErrorKind::NoUsableSession | ErrorKind::NoDeliverableGroup => {
            unreachable!("StartPosting-only error kinds never reach the classifier")
        }
    }
}

/// Reason string used when a group is skipped for being in its own
/// post-to-post cooldown window. Distinct literal from
/// [`SESSION_COOLDOWN_REASON`] so logs/tests can tell the two apart.
pub const GROUP_COOLDOWN_REASON: &str = "Cooldown";

/// Reason string used when a group is skipped because its session is
/// presently cooling down.
pub const SESSION_COOLDOWN_REASON: &str = "Session cooldown";
