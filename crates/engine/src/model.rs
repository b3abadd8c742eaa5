// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted entities.
//!
//! These types are shared, single-writer-per-row data read and written only
//! through [`crate::repository::Repository`]. None of them carry behaviour
//! beyond a handful of small invariant checks.

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::ids::{AdId, GroupId, SessionId, TenantId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Inactive,
    Frozen,
    Banned,
    Deleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub tenant_id: TenantId,
    pub name: String,
    pub phone: String,
    /// Opaque credential handed to [`crate::session_client::SessionClient::connect`].
    pub session_string: String,
    pub status: SessionStatus,
    pub is_frozen: bool,
    pub frozen_at: Option<SystemTime>,
    pub unfreeze_at: Option<SystemTime>,
    pub freeze_count: u32,
    pub last_sync_at: Option<SystemTime>,
    pub total_groups: u32,
    pub active_groups: u32,
}

impl Session {
    /// Usable for sending iff Active, not frozen, has a credential, and
    /// (checked separately by the caller) its client is connected.
    pub fn is_usable(&self) -> bool {
        self.status == SessionStatus::Active && !self.is_frozen && !self.session_string.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Group,
    Supergroup,
    Channel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub session_id: SessionId,
    pub platform_id: String,
    pub title: String,
    pub kind: GroupKind,
    pub member_count: u64,
    pub is_active: bool,
    pub is_skipped: bool,
    pub skip_reason: Option<String>,
    pub has_restrictions: bool,
    pub restriction_until: Option<SystemTime>,
    pub is_priority: bool,
    pub priority_order: Option<u32>,
    pub activity_score: f64,
    pub last_post_at: Option<SystemTime>,
}

impl Group {
    /// Deliverable iff active, not skipped, and not currently restricted.
    /// Does not check the owning session's own usability — the caller
    /// already has that session in hand and checks it separately.
    pub fn is_deliverable(&self, now: SystemTime) -> bool {
        if !self.is_active || self.is_skipped {
            return false;
        }
        match self.restriction_until {
            Some(until) => !self.has_restrictions || until < now,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdStatus {
    Draft,
    Active,
    Paused,
    Closed,
    SoldOut,
    Archived,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ad {
    pub id: AdId,
    pub tenant_id: TenantId,
    pub content: String,
    pub media: Vec<String>,
    pub status: AdStatus,
    pub scheduled_for: Option<SystemTime>,
    pub is_scheduled: bool,
    pub interval_min: Option<u64>,
    pub interval_max: Option<u64>,
    pub group_interval: Option<u64>,
    pub brand_ad_text: Option<String>,
    /// If non-empty, `StartPosting` restricts delivery to this set.
    pub selected_groups: Vec<GroupId>,
    pub last_scheduled_at: Option<SystemTime>,
    pub last_error: Option<String>,
}

impl Ad {
    pub fn content_with_brand(&self, tenant: &Tenant) -> String {
        if tenant.brand_ad_enabled {
            if let Some(ref brand) = self.brand_ad_text {
                return format!("{}\n\n{}", self.content, brand);
            }
        }
        self.content.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub tenant_id: TenantId,
    pub status: SubscriptionStatus,
    pub end_date: SystemTime,
    pub max_sessions: u32,
    pub max_groups: u32,
    pub max_ads: u32,
    pub group_interval_hint: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub tenant_id: TenantId,
    pub status: PaymentStatus,
    pub amount: f64,
    pub created_at: SystemTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub brand_ad_enabled: bool,
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatistics {
    /// Days since the Unix epoch (UTC). Avoids a calendar-aware date type
    /// the rest of the engine has no other use for — see DESIGN.md.
    pub epoch_day: u64,
    pub posts_completed: u64,
    pub groups_sent: u64,
    pub groups_failed: u64,
    pub revenue: f64,
}

/// Convert a wall-clock instant into the day-number key used by
/// [`SystemStatistics`].
pub fn epoch_day(at: SystemTime) -> u64 {
    at.duration_since(std::time::UNIX_EPOCH).map(|d| d.as_secs() / 86_400).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn group(is_active: bool, is_skipped: bool) -> Group {
        Group {
            id: GroupId::new(),
            session_id: SessionId::new(),
            platform_id: "g1".into(),
            title: "Group".into(),
            kind: GroupKind::Group,
            member_count: 10,
            is_active,
            is_skipped,
            skip_reason: None,
            has_restrictions: false,
            restriction_until: None,
            is_priority: false,
            priority_order: None,
            activity_score: 0.0,
            last_post_at: None,
        }
    }

    #[test]
    fn deliverable_requires_active_and_unskipped() {
        let now = SystemTime::now();
        assert!(group(true, false).is_deliverable(now));
        assert!(!group(false, false).is_deliverable(now));
        assert!(!group(true, true).is_deliverable(now));
    }

    #[test]
    fn restriction_expiry_unblocks() {
        let now = SystemTime::now();
        let mut g = group(true, false);
        g.has_restrictions = true;
        g.restriction_until = Some(now - Duration::from_secs(60));
        assert!(g.is_deliverable(now));

        g.restriction_until = Some(now + Duration::from_secs(60));
        assert!(!g.is_deliverable(now));
    }
}
