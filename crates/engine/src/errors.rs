// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy. [`RawSendError`] is what a [`crate::session_client::SessionClient`]
//! reports; [`ErrorKind`] is what the rest of the engine reasons about.
//! [`OrchestratorError`] is what callers of the public façade see. A
//! closed, `Copy` enum plus an `as_str` used both for `Display` and for
//! log messages, rather than a boxed `dyn Error`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What a `SessionClient::send` call reports, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSendError {
    FloodWait(Duration),
    SlowmodeWait(Duration),
    WriteForbidden,
    ChatRestricted,
    PremiumRequired,
    AuthRevoked,
    Transient(String),
}

/// The engine's own classification of a send outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail")]
pub enum ErrorKind {
    FloodWait(u64),
    SlowmodeWait(u64),
    WriteForbidden,
    ChatRestricted,
    AuthRevoked,
    NoUsableSession,
    NoDeliverableGroup,
    Transient(String),
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FloodWait(_) => "FLOOD_WAIT",
            Self::SlowmodeWait(_) => "SLOWMODE_WAIT",
            Self::WriteForbidden => "WRITE_FORBIDDEN",
            Self::ChatRestricted => "CHAT_RESTRICTED",
            Self::AuthRevoked => "AUTH_REVOKED",
            Self::NoUsableSession => "NO_USABLE_SESSION",
            Self::NoDeliverableGroup => "NO_DELIVERABLE_GROUP",
            Self::Transient(_) => "TRANSIENT",
        }
    }

    /// Whether a later attempt at the same (group, session) could succeed.
    pub fn retryable(&self) -> bool {
        !matches!(self, Self::WriteForbidden | Self::ChatRestricted | Self::AuthRevoked)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors the public orchestrator façade surfaces to callers. Outside the
/// driver's own retry loop, errors surface to the caller rather than being
/// retried silently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", content = "message")]
pub enum OrchestratorError {
    AdNotFound,
    AdNotOwnedByTenant,
    AdContentEmpty,
    AdNotActive,
    NoUsableSession,
    NoDeliverableGroup,
    JobAlreadyRunning,
    JobNotFound,
    JobNotRemovable,
    Repository(String),
}

impl OrchestratorError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdNotFound => "AD_NOT_FOUND",
            Self::AdNotOwnedByTenant => "AD_NOT_OWNED_BY_TENANT",
            Self::AdContentEmpty => "AD_CONTENT_EMPTY",
            Self::AdNotActive => "AD_NOT_ACTIVE",
            Self::NoUsableSession => "NO_USABLE_SESSION",
            Self::NoDeliverableGroup => "NO_DELIVERABLE_GROUP",
            Self::JobAlreadyRunning => "JOB_ALREADY_RUNNING",
            Self::JobNotFound => "JOB_NOT_FOUND",
            Self::JobNotRemovable => "JOB_NOT_REMOVABLE",
            Self::Repository(_) => "REPOSITORY_ERROR",
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Repository(msg) => write!(f, "{}: {msg}", self.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

impl std::error::Error for OrchestratorError {}

impl From<crate::repository::RepositoryError> for OrchestratorError {
    fn from(err: crate::repository::RepositoryError) -> Self {
        Self::Repository(err.0)
    }
}
