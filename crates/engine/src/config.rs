// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anti-throttle and scheduling knobs. One flat [`clap::Parser`] struct:
//! every field is overridable via `--flag` or its `env` var, millisecond/
//! second counts in, [`std::time::Duration`] out via accessor methods.

use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "broadcast-engine", version, about)]
pub struct EngineConfig {
    /// Minimum delay between two group sends on the same session, in ms.
    #[arg(long, env = "BROADCAST_MIN_GROUP_DELAY_MS", default_value = "5000")]
    pub min_group_delay_ms: u64,

    /// Maximum delay between two group sends on the same session, in ms.
    #[arg(long, env = "BROADCAST_MAX_GROUP_DELAY_MS", default_value = "20000")]
    pub max_group_delay_ms: u64,

    /// Pause between rounds of the same job, in ms (jittered ± 3 min by the
    /// round loop itself, see `posting_engine::round`).
    #[arg(long, env = "BROADCAST_ROUND_PAUSE_MS", default_value = "900000")]
    pub round_pause_ms: u64,

    /// Messages a session may send before it must cool down.
    #[arg(long, env = "BROADCAST_SESSION_MESSAGE_LIMIT", default_value = "30")]
    pub session_message_limit: u32,

    /// Cooldown armed once `session_message_limit` is reached, in seconds.
    #[arg(long, env = "BROADCAST_SESSION_COOLDOWN_SECS", default_value = "300")]
    pub session_cooldown_secs: u64,

    /// FLOOD_WAIT signals tolerated before a session is force-frozen.
    #[arg(long, env = "BROADCAST_MAX_FLOOD_PER_SESSION", default_value = "3")]
    pub max_flood_per_session: u32,

    /// Cooldown armed once `max_flood_per_session` is reached, in seconds.
    #[arg(long, env = "BROADCAST_FLOOD_FREEZE_SECS", default_value = "1800")]
    pub flood_freeze_secs: u64,

    /// Consecutive transient errors tolerated before a session cools down.
    #[arg(long, env = "BROADCAST_MAX_CONSECUTIVE_ERRORS", default_value = "5")]
    pub max_consecutive_errors: u32,

    /// Cooldown armed once `max_consecutive_errors` is reached, in seconds.
    #[arg(long, env = "BROADCAST_SESSION_COOLDOWN_ON_ERRORS_SECS", default_value = "300")]
    pub session_cooldown_on_errors_secs: u64,

    /// How long a group stays in cooldown between successive posts, in
    /// seconds.
    #[arg(long, env = "BROADCAST_GROUP_COOLDOWN_SECS", default_value = "600")]
    pub group_cooldown_secs: u64,

    /// Rounds between a session's long pause (beyond the per-round pause).
    #[arg(long, env = "BROADCAST_LONG_PAUSE_INTERVAL", default_value = "10")]
    pub long_pause_interval: u32,

    /// Minimum length of a long pause, in ms.
    #[arg(long, env = "BROADCAST_LONG_PAUSE_MIN_MS", default_value = "30000")]
    pub long_pause_min_ms: u64,

    /// Maximum length of a long pause, in ms.
    #[arg(long, env = "BROADCAST_LONG_PAUSE_MAX_MS", default_value = "90000")]
    pub long_pause_max_ms: u64,

    /// Connection retries before a session is treated as unreachable.
    #[arg(long, env = "BROADCAST_CONNECTION_RETRIES", default_value = "3")]
    pub connection_retries: u32,

    /// Max log entries kept per job before the ring trims (see `job.rs`).
    #[arg(long, env = "BROADCAST_MAX_JOB_LOG_ENTRIES", default_value = "500")]
    pub max_job_log_entries: usize,

    /// How many groups `recompute_priority_groups` marks high-priority.
    #[arg(long, env = "BROADCAST_PRIORITY_TOP_N", default_value = "50")]
    pub priority_top_n: usize,

    /// Log format (json or text).
    #[arg(long, env = "BROADCAST_LOG_FORMAT", default_value = "json")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "BROADCAST_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl EngineConfig {
    pub fn min_group_delay(&self) -> Duration {
        Duration::from_millis(self.min_group_delay_ms)
    }

    pub fn max_group_delay(&self) -> Duration {
        Duration::from_millis(self.max_group_delay_ms)
    }

    pub fn round_pause(&self) -> Duration {
        Duration::from_millis(self.round_pause_ms)
    }

    pub fn session_cooldown(&self) -> Duration {
        Duration::from_secs(self.session_cooldown_secs)
    }

    pub fn flood_freeze(&self) -> Duration {
        Duration::from_secs(self.flood_freeze_secs)
    }

    pub fn session_cooldown_on_errors(&self) -> Duration {
        Duration::from_secs(self.session_cooldown_on_errors_secs)
    }

    pub fn group_cooldown(&self) -> Duration {
        Duration::from_secs(self.group_cooldown_secs)
    }

    pub fn long_pause_min(&self) -> Duration {
        Duration::from_millis(self.long_pause_min_ms)
    }

    pub fn long_pause_max(&self) -> Duration {
        Duration::from_millis(self.long_pause_max_ms)
    }

    /// Validate cross-field invariants clap's per-field parsing can't catch.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_group_delay_ms > self.max_group_delay_ms {
            anyhow::bail!("min_group_delay_ms must be <= max_group_delay_ms");
        }
        if self.long_pause_min_ms > self.long_pause_max_ms {
            anyhow::bail!("long_pause_min_ms must be <= long_pause_max_ms");
        }
        if self.session_message_limit == 0 {
            anyhow::bail!("session_message_limit must be > 0");
        }
        if self.max_job_log_entries < 300 {
            anyhow::bail!("max_job_log_entries must be >= 300");
        }
        Ok(())
    }
}
