// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Job` — the in-memory runtime state of a running broadcast.
//!
//! Never persisted; destroyed on `CleanupJob` or process restart. Control
//! flags and the log ring buffer are written concurrently by every session
//! driver in a round, so they live behind small, short-held locks rather
//! than being owned by any single task.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::ids::{AdId, GroupId, JobId, PostId, SessionId, TenantId};

/// Default ring buffer threshold, overridable via
/// [`crate::config::EngineConfig::max_job_log_entries`].
const LOG_TRIM_THRESHOLD: usize = 500;
/// ...until it's trimmed back down to this many.
const LOG_TRIM_TARGET: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Paused,
    Stopped,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOutcome {
    Sent,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub timestamp_ms: u64,
    pub session_id: SessionId,
    pub group_id: Option<GroupId>,
    pub outcome: LogOutcome,
    pub message: String,
}

fn now_ms() -> u64 {
    SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default().as_millis() as u64
}

/// Point-in-time counters, safe to hand back to a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStats {
    pub job_id: JobId,
    pub status: JobStatus,
    pub posted_groups: u64,
    pub failed_groups: u64,
    pub skipped_groups: u64,
    pub rounds_completed: u64,
    pub success_rate: f64,
    pub started_at: SystemTime,
    pub ended_at: Option<SystemTime>,
}

/// Runtime state of a running broadcast. Always handled behind `Arc<Job>`.
pub struct Job {
    pub id: JobId,
    pub tenant_id: TenantId,
    pub ad_id: AdId,
    pub post_id: PostId,
    pub started_at: SystemTime,

    status: RwLock<JobStatus>,
    ended_at: Mutex<Option<SystemTime>>,

    posted_groups: AtomicU64,
    failed_groups: AtomicU64,
    skipped_groups: AtomicU64,
    rounds_completed: AtomicU64,

    /// Sticky once set.
    pub stop: CancellationToken,
    pause_requested: AtomicBool,

    log_seq: AtomicU64,
    logs: Mutex<VecDeque<LogEntry>>,
    log_trim_threshold: usize,
}

impl Job {
    pub fn new(id: JobId, tenant_id: TenantId, ad_id: AdId, post_id: PostId, started_at: SystemTime) -> Self {
        Self {
            id,
            tenant_id,
            ad_id,
            post_id,
            started_at,
            status: RwLock::new(JobStatus::Running),
            ended_at: Mutex::new(None),
            posted_groups: AtomicU64::new(0),
            failed_groups: AtomicU64::new(0),
            skipped_groups: AtomicU64::new(0),
            rounds_completed: AtomicU64::new(0),
            stop: CancellationToken::new(),
            pause_requested: AtomicBool::new(false),
            log_seq: AtomicU64::new(0),
            logs: Mutex::new(VecDeque::new()),
            log_trim_threshold: LOG_TRIM_THRESHOLD,
        }
    }

    /// Overrides the ring buffer's trim threshold, per
    /// `EngineConfig::max_job_log_entries`. Never lets it drop below
    /// [`LOG_TRIM_TARGET`], since trimming to a target above the threshold
    /// would trim nothing.
    pub fn with_log_trim_threshold(mut self, threshold: usize) -> Self {
        self.log_trim_threshold = threshold.max(LOG_TRIM_TARGET);
        self
    }

    pub fn status(&self) -> JobStatus {
        #[allow(clippy::unwrap_used)]
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: JobStatus) {
        #[allow(clippy::unwrap_used)]
        let mut guard = self.status.write().unwrap_or_else(|e| e.into_inner());
        *guard = status;
    }

    pub fn request_stop(&self) {
        self.stop.cancel();
        self.set_status(JobStatus::Stopped);
        #[allow(clippy::unwrap_used)]
        let mut ended = self.ended_at.lock().unwrap_or_else(|e| e.into_inner());
        if ended.is_none() {
            *ended = Some(SystemTime::now());
        }
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub fn request_pause(&self) {
        if !self.stop.is_cancelled() {
            self.pause_requested.store(true, Ordering::SeqCst);
            self.set_status(JobStatus::Paused);
        }
    }

    pub fn request_resume(&self) {
        if !self.stop.is_cancelled() {
            self.pause_requested.store(false, Ordering::SeqCst);
            self.set_status(JobStatus::Running);
        }
    }

    pub fn is_pause_requested(&self) -> bool {
        self.pause_requested.load(Ordering::SeqCst)
    }

    pub fn mark_completed(&self) {
        self.set_status(JobStatus::Completed);
        #[allow(clippy::unwrap_used)]
        let mut ended = self.ended_at.lock().unwrap_or_else(|e| e.into_inner());
        *ended = Some(SystemTime::now());
    }

    pub fn record_round(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self) {
        self.posted_groups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed(&self) {
        self.failed_groups.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.skipped_groups.fetch_add(1, Ordering::Relaxed);
    }

    /// Append a log entry, trimming the ring once it grows past
    /// [`LOG_TRIM_THRESHOLD`]. The lock serialises append and trim so
    /// concurrent drivers never observe a length beyond the threshold.
    pub fn log(&self, session_id: SessionId, group_id: Option<GroupId>, outcome: LogOutcome, message: impl Into<String>) {
        let seq = self.log_seq.fetch_add(1, Ordering::Relaxed);
        let entry = LogEntry { seq, timestamp_ms: now_ms(), session_id, group_id, outcome, message: message.into() };

        #[allow(clippy::unwrap_used)]
        let mut logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        logs.push_back(entry);
        if logs.len() > self.log_trim_threshold {
            let excess = logs.len() - LOG_TRIM_TARGET;
            logs.drain(..excess);
        }
    }

    /// Snapshot of log entries with `seq > since`, oldest first.
    pub fn logs_since(&self, since: u64) -> Vec<LogEntry> {
        #[allow(clippy::unwrap_used)]
        let logs = self.logs.lock().unwrap_or_else(|e| e.into_inner());
        logs.iter().filter(|e| e.seq > since).cloned().collect()
    }

    pub fn stats(&self) -> JobStats {
        let posted = self.posted_groups.load(Ordering::Relaxed);
        let failed = self.failed_groups.load(Ordering::Relaxed);
        let skipped = self.skipped_groups.load(Ordering::Relaxed);
        let attempted = posted + failed;
        let success_rate = if attempted == 0 { 0.0 } else { posted as f64 / attempted as f64 };
        #[allow(clippy::unwrap_used)]
        let ended_at = *self.ended_at.lock().unwrap_or_else(|e| e.into_inner());

        JobStats {
            job_id: self.id.clone(),
            status: self.status(),
            posted_groups: posted,
            failed_groups: failed,
            skipped_groups: skipped,
            rounds_completed: self.rounds_completed.load(Ordering::Relaxed),
            success_rate,
            started_at: self.started_at,
            ended_at,
        }
    }
}

/// Busy-wait a cancellable duration in fixed increments, returning early if
/// `stop` fires. Used for the inter-round pause (2s poll) and the
/// pause-wait loop (5s poll).
pub async fn poll_until(total: Duration, increment: Duration, stop: &CancellationToken) {
    let mut remaining = total;
    while remaining > Duration::ZERO {
        let step = remaining.min(increment);
        tokio::select! {
            _ = tokio::time::sleep(step) => {}
            _ = stop.cancelled() => return,
        }
        remaining -= step;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
