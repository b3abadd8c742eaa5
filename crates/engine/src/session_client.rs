// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SessionClient` capability: the engine's sole dependency on the
//! messaging platform. A generic trait bound rather than a `dyn` object —
//! the engine is monomorphized over one concrete client per process, the
//! same way `PostingEngine`/`Orchestrator` are monomorphized over one
//! concrete [`crate::repository::Repository`] — so `async fn` in the trait
//! needs no boxing or dynamic dispatch.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::errors::RawSendError;
use crate::model::{GroupKind, Session};

/// A group as reported by the platform during sync, before it is reconciled
/// against the repository's existing rows (`SyncGroups`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    pub platform_id: String,
    pub title: String,
    pub kind: GroupKind,
    pub member_count: u64,
    pub username: Option<String>,
}

/// A successful send's platform-assigned identifier, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendAck {
    pub message_id: Option<String>,
}

/// The messaging-platform capability required by the engine. Implementors
/// own their own connection pooling/retry below this interface;
/// [`crate::config::EngineConfig::connection_retries`] is a hint for that
/// layer, not something this trait enforces itself.
pub trait SessionClient: Send + Sync + 'static {
    /// An opaque, cheaply-cloneable handle to a live connection.
    type Handle: Clone + Send + Sync + 'static;

    fn connect(&self, session: &Session) -> impl Future<Output = Result<Self::Handle, RawSendError>> + Send;

    fn disconnect(&self, handle: &Self::Handle) -> impl Future<Output = ()> + Send;

    fn sync_groups(&self, handle: &Self::Handle) -> impl Future<Output = Result<Vec<GroupSnapshot>, RawSendError>> + Send;

    fn send(&self, handle: &Self::Handle, platform_group_id: &str, text: &str) -> impl Future<Output = Result<SendAck, RawSendError>> + Send;

    fn is_connected(&self, handle: &Self::Handle) -> impl Future<Output = bool> + Send;
}
