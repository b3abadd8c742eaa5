// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Post` and `PostHistory` — the persisted envelope for a broadcast.
//!
//! Distinct from [`crate::job::Job`]: a `Post` is the durable record an
//! orchestrator writes so a tenant can see job history after the in-memory
//! `Job` is gone; `PostHistory` is one row per (post, group) delivery
//! attempt, used for stats and for a future `retryFailed` operation.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::{AdId, GroupId, PostId, SessionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Pending,
    InProgress,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub ad_id: AdId,
    pub primary_session_id: SessionId,
    pub status: PostStatus,
    pub groups_completed: u64,
    pub groups_failed: u64,
    pub groups_skipped: u64,
    pub groups_total: u64,
    pub created_at: SystemTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
    Retrying,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostHistory {
    pub post_id: PostId,
    pub group_id: GroupId,
    pub status: DeliveryStatus,
    pub sent_at: Option<SystemTime>,
    pub failed_at: Option<SystemTime>,
    pub platform_message_id: Option<String>,
    pub error_message: Option<String>,
}

impl PostHistory {
    pub fn sent(post_id: PostId, group_id: GroupId, at: SystemTime, message_id: Option<String>) -> Self {
        Self {
            post_id,
            group_id,
            status: DeliveryStatus::Sent,
            sent_at: Some(at),
            failed_at: None,
            platform_message_id: message_id,
            error_message: None,
        }
    }

    pub fn failed(post_id: PostId, group_id: GroupId, at: SystemTime, reason: impl Into<String>) -> Self {
        Self {
            post_id,
            group_id,
            status: DeliveryStatus::Failed,
            sent_at: None,
            failed_at: Some(at),
            platform_message_id: None,
            error_message: Some(reason.into()),
        }
    }

    pub fn skipped(post_id: PostId, group_id: GroupId, at: SystemTime, reason: impl Into<String>) -> Self {
        Self {
            post_id,
            group_id,
            status: DeliveryStatus::Skipped,
            sent_at: None,
            failed_at: Some(at),
            platform_message_id: None,
            error_message: Some(reason.into()),
        }
    }
}
