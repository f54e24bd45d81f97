// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use log::{Level, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::artifact::{ArtifactStore, DEFAULT_MODE};
use crate::ctl::Supervisorctl;
use crate::wait::{DEFAULT_ATTEMPTS, WaitPolicy};

const DEFAULT_SETTINGS_PATH: &str = "/etc/datadog-agent/supervisor/settings.yaml";

/// Settings shared by every service: where supervisord looks for program
/// files and how to reach it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub supervisor_dir: PathBuf,
    pub supervisorctl: PathBuf,
    pub supervisorctl_config: Option<PathBuf>,
    pub server_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub wait: WaitSettings,
    pub artifact: ArtifactSettings,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supervisor_dir: PathBuf::from("/etc/supervisor.d"),
            supervisorctl: PathBuf::from("supervisorctl"),
            supervisorctl_config: None,
            server_url: None,
            username: None,
            password: None,
            wait: WaitSettings::default(),
            artifact: ArtifactSettings::default(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaitSettings {
    pub attempts: u32,
    pub interval_secs: f64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval_secs: 1.0,
        }
    }
}

impl WaitSettings {
    pub fn policy(&self) -> Result<WaitPolicy> {
        let interval = Duration::try_from_secs_f64(self.interval_secs)
            .with_context(|| format!("invalid wait.interval_secs: {}", self.interval_secs))?;
        Ok(WaitPolicy {
            attempts: self.attempts,
            interval,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactSettings {
    pub owner: Option<String>,
    pub group: Option<String>,
    pub mode: FileMode,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            owner: Some("root".to_string()),
            group: Some("root".to_string()),
            mode: FileMode(DEFAULT_MODE),
        }
    }
}

/// Octal permission bits. Accepts `"0644"`, `"0o644"` or a bare `644`, which
/// YAML would otherwise read as decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FileModeRepr")]
pub struct FileMode(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum FileModeRepr {
    Number(u64),
    Text(String),
}

impl TryFrom<FileModeRepr> for FileMode {
    type Error = String;

    fn try_from(repr: FileModeRepr) -> Result<Self, Self::Error> {
        let digits = match repr {
            FileModeRepr::Number(n) => n.to_string(),
            FileModeRepr::Text(s) => s.trim().trim_start_matches("0o").to_string(),
        };
        match u32::from_str_radix(&digits, 8) {
            Ok(mode) if mode <= 0o7777 => Ok(FileMode(mode)),
            _ => Err(format!("invalid file mode {digits:?}")),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Settings> {
        if !path.exists() {
            warn!("settings file not found at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        let contents =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        // An empty file is a valid "all defaults" document.
        if contents.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn log_level(&self) -> Result<Level> {
        Level::from_str(&self.log_level)
            .with_context(|| format!("invalid log_level: {}", self.log_level))
    }

    pub fn supervisorctl(&self) -> Supervisorctl {
        Supervisorctl::new(&self.supervisorctl)
            .with_config_file(self.supervisorctl_config.clone())
            .with_server_url(self.server_url.clone())
            .with_credentials(self.username.clone(), self.password.clone())
    }

    pub fn artifact_store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.supervisor_dir)
            .with_ownership(self.artifact.owner.clone(), self.artifact.group.clone())
            .with_mode(self.artifact.mode.0)
    }
}

pub fn settings_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("DD_SUPERVISOR_SETTINGS").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH))
}
