// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario file format: a tenant with sessions/groups and the ad to
//! broadcast, enough to exercise the orchestrator without a real platform
//! or database.

use std::path::Path;

use broadcast_engine::ids::{AdId, GroupId, SessionId, TenantId};
use broadcast_engine::model::{Ad, AdStatus, Group, GroupKind, Session, SessionStatus, Tenant};
use broadcast_engine::testing::InMemoryRepository;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ScenarioFile {
    pub tenant: TenantSpec,
    pub sessions: Vec<SessionSpec>,
    pub ad: AdSpec,
}

#[derive(Debug, Deserialize)]
pub struct TenantSpec {
    pub name: String,
    #[serde(default)]
    pub brand_ad_enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct SessionSpec {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

#[derive(Debug, Deserialize)]
pub struct GroupSpec {
    pub platform_id: String,
    pub title: String,
    #[serde(default = "default_member_count")]
    pub member_count: u64,
}

fn default_member_count() -> u64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct AdSpec {
    pub content: String,
    #[serde(default)]
    pub brand_ad_text: Option<String>,
}

pub struct Seeded {
    pub tenant_id: TenantId,
    pub ad_id: AdId,
}

pub fn load(path: &Path) -> anyhow::Result<ScenarioFile> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Populate `repo` with the scenario's tenant, sessions, groups, and ad.
/// Returns the ids `StartPosting` needs.
pub async fn seed(repo: &InMemoryRepository, scenario: &ScenarioFile) -> Seeded {
    let tenant_id = TenantId::new();
    repo.put_tenant(Tenant {
        id: tenant_id.clone(),
        name: scenario.tenant.name.clone(),
        brand_ad_enabled: scenario.tenant.brand_ad_enabled,
        subscription: None,
    })
    .await;

    for session_spec in &scenario.sessions {
        let session_id = SessionId::new();
        repo.put_session(Session {
            id: session_id.clone(),
            tenant_id: tenant_id.clone(),
            name: session_spec.name.clone(),
            phone: session_spec.phone.clone(),
            session_string: "demo-credential".into(),
            status: SessionStatus::Active,
            is_frozen: false,
            frozen_at: None,
            unfreeze_at: None,
            freeze_count: 0,
            last_sync_at: None,
            total_groups: session_spec.groups.len() as u32,
            active_groups: session_spec.groups.len() as u32,
        })
        .await;

        for group_spec in &session_spec.groups {
            repo.put_group(Group {
                id: GroupId::new(),
                session_id: session_id.clone(),
                platform_id: group_spec.platform_id.clone(),
                title: group_spec.title.clone(),
                kind: GroupKind::Group,
                member_count: group_spec.member_count,
                is_active: true,
                is_skipped: false,
                skip_reason: None,
                has_restrictions: false,
                restriction_until: None,
                is_priority: false,
                priority_order: None,
                activity_score: 0.0,
                last_post_at: None,
            })
            .await;
        }
    }

    let ad_id = AdId::new();
    repo.put_ad(Ad {
        id: ad_id.clone(),
        tenant_id: tenant_id.clone(),
        content: scenario.ad.content.clone(),
        media: vec![],
        status: AdStatus::Active,
        scheduled_for: None,
        is_scheduled: false,
        interval_min: None,
        interval_max: None,
        group_interval: None,
        brand_ad_text: scenario.ad.brand_ad_text.clone(),
        selected_groups: vec![],
        last_scheduled_at: None,
        last_error: None,
    })
    .await;

    Seeded { tenant_id, ad_id }
}
