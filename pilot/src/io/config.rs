//! Automation configuration stored as TOML (default `pilot.toml`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pilot.toml";

/// Automation configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to the defaults
/// below, so an empty file is a valid config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AutomationConfig {
    /// Pause the active goal when health + absorption drops to the threshold.
    pub pause_on_low_health: bool,

    /// Health + absorption (in HP) at or below which the goal pauses.
    pub low_health_hp_threshold: f32,

    /// Pause the active goal while every main inventory slot is used.
    pub pause_on_inventory_full: bool,

    /// Retry the same task through Recover instead of failing when stuck.
    pub auto_recover_when_stuck: bool,

    /// Ticks a freshly issued task may wait for the planner to start acting.
    pub unreachable_start_timeout_ticks: u32,

    /// Consecutive idle ticks that mark the current task as finished.
    pub task_end_idle_ticks: u32,

    /// Maximum queued goals listed in the status preview.
    pub queue_preview_limit: usize,

    pub swarm: SwarmConfig,
}

/// Inbound swarm message policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SwarmConfig {
    /// Accepted actions per rolling one-second window.
    pub commands_per_second: u32,
    /// Identical payloads inside this window are dropped.
    pub duplicate_window_ms: u64,
    /// Reject messages that are not wrapped as `swarm|TOKEN|payload`.
    pub require_token: bool,
    pub token: String,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            commands_per_second: 10,
            duplicate_window_ms: 2500,
            require_token: false,
            token: String::new(),
        }
    }
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            pause_on_low_health: true,
            low_health_hp_threshold: 6.0,
            pause_on_inventory_full: true,
            auto_recover_when_stuck: true,
            unreachable_start_timeout_ticks: 60,
            task_end_idle_ticks: 5,
            queue_preview_limit: 2,
            swarm: SwarmConfig::default(),
        }
    }
}

impl AutomationConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.low_health_hp_threshold.is_finite() || self.low_health_hp_threshold < 0.0 {
            return Err(anyhow!(
                "low_health_hp_threshold must be a finite value >= 0"
            ));
        }
        if self.unreachable_start_timeout_ticks == 0 {
            return Err(anyhow!("unreachable_start_timeout_ticks must be > 0"));
        }
        if self.task_end_idle_ticks == 0 {
            return Err(anyhow!("task_end_idle_ticks must be > 0"));
        }
        self.swarm.validate()
    }
}

impl SwarmConfig {
    pub fn validate(&self) -> Result<()> {
        if self.commands_per_second == 0 {
            return Err(anyhow!("swarm.commands_per_second must be >= 1"));
        }
        if self.require_token && self.token.trim().is_empty() {
            return Err(anyhow!("swarm.token must be set when require_token is true"));
        }
        if self.token.contains('|') {
            return Err(anyhow!("swarm.token must not contain '|'"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AutomationConfig::default()`.
pub fn load_config(path: &Path) -> Result<AutomationConfig> {
    if !path.exists() {
        let cfg = AutomationConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AutomationConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AutomationConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, "toml.tmp", &buf)
}

/// Write `contents` next to `path` under `tmp_extension`, then rename over it.
pub(crate) fn write_atomic(path: &Path, tmp_extension: &str, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension(tmp_extension);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, AutomationConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("pilot.toml");
        let cfg = AutomationConfig {
            auto_recover_when_stuck: false,
            queue_preview_limit: 0,
            swarm: SwarmConfig {
                require_token: true,
                token: "hive".to_string(),
                ..SwarmConfig::default()
            },
            ..AutomationConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        assert!(!path.with_extension("toml.tmp").exists());
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pilot.toml");
        fs::write(
            &path,
            "task_end_idle_ticks = 3\n\n[swarm]\ncommands_per_second = 2\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.task_end_idle_ticks, 3);
        assert_eq!(cfg.swarm.commands_per_second, 2);
        assert_eq!(cfg.swarm.duplicate_window_ms, 2500);
        assert_eq!(cfg.unreachable_start_timeout_ticks, 60);
        assert!(cfg.pause_on_low_health);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let cfg = AutomationConfig {
            task_end_idle_ticks: 0,
            ..AutomationConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = AutomationConfig {
            swarm: SwarmConfig {
                commands_per_second: 0,
                ..SwarmConfig::default()
            },
            ..AutomationConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_requires_token_when_enforced() {
        let swarm = SwarmConfig {
            require_token: true,
            ..SwarmConfig::default()
        };
        assert!(swarm.validate().is_err());
    }

    #[test]
    fn load_reports_invalid_values() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("pilot.toml");
        fs::write(&path, "unreachable_start_timeout_ticks = 0\n").expect("write");
        let err = load_config(&path).expect_err("invalid");
        assert!(format!("{err:#}").contains("unreachable_start_timeout_ticks"));
    }
}
