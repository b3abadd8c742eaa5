// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PostingEngine: the job's round loop and per-session driver. Split into
//! [`round`] (the infinite per-job loop) and [`driver`] (per-session
//! dispatch within one round). [`EngineContext`] bundles the dependencies
//! both halves need and is owned by [`crate::orchestrator::Orchestrator`],
//! one instance per process.

pub mod driver;
pub mod round;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::RawSendError;
use crate::ids::SessionId;
use crate::model::Session;
use crate::rate_state::RateStateRegistry;
use crate::repository::Repository;
use crate::session_client::SessionClient;

pub struct EngineContext<R: Repository, S: SessionClient, C: Clock> {
    pub repo: Arc<R>,
    pub client: Arc<S>,
    pub clock: Arc<C>,
    pub config: Arc<EngineConfig>,
    pub rate_states: Arc<RateStateRegistry>,
    connected: RwLock<HashMap<SessionId, S::Handle>>,
}

impl<R: Repository, S: SessionClient, C: Clock> EngineContext<R, S, C> {
    pub fn new(repo: Arc<R>, client: Arc<S>, clock: Arc<C>, config: Arc<EngineConfig>) -> Self {
        Self {
            repo,
            client,
            clock,
            config,
            rate_states: Arc::new(RateStateRegistry::new()),
            connected: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the session's live handle, connecting lazily if needed.
    pub async fn ensure_connected(&self, session: &Session) -> Result<S::Handle, RawSendError> {
        if let Some(handle) = self.connected.read().await.get(&session.id) {
            if self.client.is_connected(handle).await {
                return Ok(handle.clone());
            }
        }
        let handle = self.client.connect(session).await?;
        self.connected.write().await.insert(session.id.clone(), handle.clone());
        Ok(handle)
    }

    pub async fn disconnect(&self, session_id: &SessionId) {
        if let Some(handle) = self.connected.write().await.remove(session_id) {
            self.client.disconnect(&handle).await;
        }
    }
}
