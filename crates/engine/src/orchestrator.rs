// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broadcast orchestrator: the public façade. Resolves sessions and
//! groups, enforces tenant isolation and the one-running-job-per-(tenant,
//! ad) invariant, and owns the in-memory job registry. Generic over
//! [`Repository`], [`SessionClient`], and [`Clock`] — one concrete
//! instance built once per process, passed around as `Arc<Self>`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::errors::OrchestratorError;
use crate::ids::{AdId, JobId, TenantId};
use crate::job::{Job, JobStats, LogEntry};
use crate::model::AdStatus;
use crate::post::{Post, PostStatus};
use crate::posting_engine::round::{run_round_loop, RoundLoopInputs};
use crate::posting_engine::EngineContext;
use crate::repository::Repository;
use crate::session_client::SessionClient;

pub struct Orchestrator<R: Repository, S: SessionClient, C: Clock> {
    ctx: Arc<EngineContext<R, S, C>>,
    jobs: RwLock<HashMap<JobId, Arc<Job>>>,
    running_ad_jobs: RwLock<HashMap<(TenantId, AdId), JobId>>,
}

impl<R: Repository, S: SessionClient, C: Clock> Orchestrator<R, S, C> {
    pub fn new(repo: R, client: S, clock: C, config: EngineConfig) -> Self {
        let ctx = EngineContext::new(Arc::new(repo), Arc::new(client), Arc::new(clock), Arc::new(config));
        Self { ctx: Arc::new(ctx), jobs: RwLock::new(HashMap::new()), running_ad_jobs: RwLock::new(HashMap::new()) }
    }

    /// Starts a broadcast job for a tenant's ad. `opt_in_priority` is a
    /// per-call switch restricting delivery to priority groups — not a
    /// tenant-wide setting.
    pub async fn start_posting(&self, tenant_id: TenantId, ad_id: AdId, opt_in_priority: bool) -> Result<Arc<Job>, OrchestratorError> {
        let ad = self.ctx.repo.get_ad(&ad_id).await?.ok_or(OrchestratorError::AdNotFound)?;
        if ad.tenant_id != tenant_id {
            return Err(OrchestratorError::AdNotOwnedByTenant);
        }
        if ad.content.trim().is_empty() {
            return Err(OrchestratorError::AdContentEmpty);
        }
        if ad.status != AdStatus::Active {
            return Err(OrchestratorError::AdNotActive);
        }
        self.reject_if_already_running(&tenant_id, &ad_id).await?;

        let tenant = self.ctx.repo.get_tenant(&tenant_id).await?.ok_or_else(|| OrchestratorError::Repository("tenant not found".to_string()))?;

        let candidates = self.ctx.repo.list_usable_sessions(&tenant_id).await?;
        let mut connected = Vec::with_capacity(candidates.len());
        for session in candidates {
            match self.ctx.ensure_connected(&session).await {
                Ok(handle) => connected.push((session, handle)),
                Err(err) => warn!(session_id = %session.id, error = ?err, "session failed to connect, excluding from job"),
            }
        }
        if connected.is_empty() {
            return Err(OrchestratorError::NoUsableSession);
        }

        let now = self.ctx.clock.now();
        let mut total_deliverable: u64 = 0;
        for (session, _) in &connected {
            let groups = self.ctx.repo.list_groups_for_session(&session.id).await?;
            total_deliverable += groups
                .into_iter()
                .filter(|g| {
                    g.is_deliverable(now)
                        && (ad.selected_groups.is_empty() || ad.selected_groups.contains(&g.id))
                        && (!opt_in_priority || g.is_priority)
                })
                .count() as u64;
        }
        if total_deliverable == 0 {
            return Err(OrchestratorError::NoDeliverableGroup);
        }

        let job_id = JobId::new();
        let post_id = crate::ids::PostId::new();
        let primary_session_id = connected[0].0.id.clone();

        let post = Post {
            id: post_id.clone(),
            ad_id: ad_id.clone(),
            primary_session_id,
            status: PostStatus::InProgress,
            groups_completed: 0,
            groups_failed: 0,
            groups_skipped: 0,
            groups_total: total_deliverable,
            created_at: now,
        };
        self.ctx.repo.create_post(&post).await?;

        let job = Arc::new(Job::new(job_id.clone(), tenant_id.clone(), ad_id.clone(), post_id.clone(), now).with_log_trim_threshold(self.ctx.config.max_job_log_entries));
        self.jobs.write().await.insert(job_id.clone(), Arc::clone(&job));
        self.running_ad_jobs.write().await.insert((tenant_id, ad_id.clone()), job_id);

        let content = ad.content_with_brand(&tenant);
        let inputs = RoundLoopInputs {
            post_id,
            ad_id,
            content,
            selected_groups: ad.selected_groups.clone(),
            use_priority_groups: opt_in_priority,
            sessions: connected,
        };

        info!(job_id = %job.id, "starting broadcast job");
        tokio::spawn(run_round_loop(Arc::clone(&self.ctx), Arc::clone(&job), inputs));

        Ok(job)
    }

    async fn reject_if_already_running(&self, tenant_id: &TenantId, ad_id: &AdId) -> Result<(), OrchestratorError> {
        let key = (tenant_id.clone(), ad_id.clone());
        let existing_job_id = self.running_ad_jobs.read().await.get(&key).cloned();
        let Some(existing_job_id) = existing_job_id else {
            return Ok(());
        };
        let jobs = self.jobs.read().await;
        if let Some(existing) = jobs.get(&existing_job_id) {
            use crate::job::JobStatus;
            if matches!(existing.status(), JobStatus::Running | JobStatus::Paused) {
                return Err(OrchestratorError::JobAlreadyRunning);
            }
        }
        Ok(())
    }

    /// Requests a job stop. Idempotent; stop is sticky.
    pub async fn stop_job(&self, job_id: &JobId) -> Result<(), OrchestratorError> {
        self.job(job_id).await?.request_stop();
        Ok(())
    }

    /// Requests a job pause. Idempotent; a no-op once stop has been requested.
    pub async fn pause_job(&self, job_id: &JobId) -> Result<(), OrchestratorError> {
        self.job(job_id).await?.request_pause();
        Ok(())
    }

    /// Requests a job resume. Idempotent; a no-op once stop has been requested.
    pub async fn resume_job(&self, job_id: &JobId) -> Result<(), OrchestratorError> {
        self.job(job_id).await?.request_resume();
        Ok(())
    }

    pub async fn get_job(&self, job_id: &JobId) -> Option<Arc<Job>> {
        self.jobs.read().await.get(job_id).cloned()
    }

    pub async fn get_user_jobs(&self, tenant_id: &TenantId) -> Vec<Arc<Job>> {
        self.jobs.read().await.values().filter(|j| &j.tenant_id == tenant_id).cloned().collect()
    }

    pub async fn get_job_stats(&self, job_id: &JobId) -> Result<JobStats, OrchestratorError> {
        Ok(self.job(job_id).await?.stats())
    }

    pub async fn get_job_logs(&self, job_id: &JobId, since: u64) -> Result<Vec<LogEntry>, OrchestratorError> {
        Ok(self.job(job_id).await?.logs_since(since))
    }

    /// Removes a finished job's bookkeeping entry. Only permitted once the
    /// job has reached `Stopped` or `Completed`.
    pub async fn cleanup_job(&self, job_id: &JobId) -> Result<(), OrchestratorError> {
        use crate::job::JobStatus;
        let job = self.job(job_id).await?;
        if !matches!(job.status(), JobStatus::Stopped | JobStatus::Completed) {
            return Err(OrchestratorError::JobNotRemovable);
        }
        self.jobs.write().await.remove(job_id);
        self.running_ad_jobs.write().await.retain(|_, v| v != job_id);
        Ok(())
    }

    async fn job(&self, job_id: &JobId) -> Result<Arc<Job>, OrchestratorError> {
        self.jobs.read().await.get(job_id).cloned().ok_or(OrchestratorError::JobNotFound)
    }

    /// Exposes the engine context for [`crate::scheduled_publisher`] and
    /// [`crate::maintenance`], which both need `start_posting`-adjacent
    /// access (the clock, the repository) without going through the job
    /// registry.
    pub fn context(&self) -> &Arc<EngineContext<R, S, C>> {
        &self.ctx
    }

    pub fn now(&self) -> SystemTime {
        self.ctx.clock.now()
    }
}
