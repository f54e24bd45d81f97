// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::Error;
use crate::reconciler::Action;

const DEFAULT_SERVICES_DIR: &str = "/etc/datadog-agent/supervisor/services.d";

fn default_numprocs() -> u32 {
    1
}

fn default_actions() -> Vec<Action> {
    vec![Action::Enable]
}

/// supervisord `autorestart` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "AutoRestartRepr")]
pub enum AutoRestart {
    Always,
    Never,
    Unexpected,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AutoRestartRepr {
    Flag(bool),
    Word(String),
}

impl TryFrom<AutoRestartRepr> for AutoRestart {
    type Error = String;

    fn try_from(repr: AutoRestartRepr) -> Result<Self, Self::Error> {
        match repr {
            AutoRestartRepr::Flag(true) => Ok(AutoRestart::Always),
            AutoRestartRepr::Flag(false) => Ok(AutoRestart::Never),
            AutoRestartRepr::Word(word) => match word.to_ascii_lowercase().as_str() {
                "true" => Ok(AutoRestart::Always),
                "false" => Ok(AutoRestart::Never),
                "unexpected" => Ok(AutoRestart::Unexpected),
                _ => Err(format!(
                    "invalid autorestart value {word:?}, expected true, false or unexpected"
                )),
            },
        }
    }
}

impl fmt::Display for AutoRestart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoRestart::Always => write!(f, "true"),
            AutoRestart::Never => write!(f, "false"),
            AutoRestart::Unexpected => write!(f, "unexpected"),
        }
    }
}

/// A program managed through supervisord.
///
/// `name`, `group` and `numprocs` identify the unit for probing and control;
/// the remaining settings only feed the rendered `[program:<name>]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDescriptor {
    /// Taken from the descriptor file name.
    #[serde(skip)]
    pub name: String,
    pub group: Option<String>,
    pub command: String,
    #[serde(default = "default_numprocs")]
    pub numprocs: u32,
    pub process_name: Option<String>,
    pub numprocs_start: Option<u32>,
    pub priority: Option<i32>,
    pub autostart: Option<bool>,
    pub autorestart: Option<AutoRestart>,
    pub startsecs: Option<u32>,
    pub startretries: Option<u32>,
    #[serde(default)]
    pub exitcodes: Vec<i32>,
    pub stopsignal: Option<String>,
    pub stopwaitsecs: Option<u32>,
    pub stopasgroup: Option<bool>,
    pub killasgroup: Option<bool>,
    pub user: Option<String>,
    pub redirect_stderr: Option<bool>,
    pub stdout_logfile: Option<String>,
    pub stdout_logfile_maxbytes: Option<String>,
    pub stdout_logfile_backups: Option<u32>,
    pub stderr_logfile: Option<String>,
    pub stderr_logfile_maxbytes: Option<String>,
    pub stderr_logfile_backups: Option<u32>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    pub directory: Option<String>,
    pub umask: Option<String>,
    pub serverurl: Option<String>,
    /// Actions run by `apply`, in order.
    #[serde(default = "default_actions")]
    pub actions: Vec<Action>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            numprocs: default_numprocs(),
            actions: default_actions(),
            ..Default::default()
        }
    }

    /// Argument passed to start/stop/restart. Multi-process programs are
    /// addressed as a whole group.
    pub fn control_target(&self) -> String {
        if self.numprocs > 1 {
            format!("{}:*", self.name)
        } else {
            self.name.clone()
        }
    }

    /// Reject descriptors that cannot be rendered into a single, well-formed
    /// `[program:<name>]` section.
    pub fn validate(&self) -> Result<(), Error> {
        let invalid = |reason: String| Error::InvalidDescriptor {
            service: self.name.clone(),
            reason,
        };

        if self.name.is_empty()
            || self
                .name
                .contains(|c: char| c.is_whitespace() || c.is_control() || c == ':' || c == '/')
        {
            return Err(invalid("invalid service name".to_string()));
        }
        if let Some(ref group) = self.group
            && (group.is_empty()
                || group.contains(|c: char| c.is_whitespace() || c.is_control() || c == ':'))
        {
            return Err(invalid(format!("invalid group name {group:?}")));
        }
        if self.command.trim().is_empty() {
            return Err(invalid("command must not be empty".to_string()));
        }
        if self.numprocs == 0 {
            return Err(invalid("numprocs must be at least 1".to_string()));
        }
        // A line break would end the setting and start a new key or section.
        for (key, value) in self.string_settings() {
            if value.contains(char::is_control) {
                return Err(invalid(format!("{key} must not contain control characters")));
            }
        }
        for (key, value) in &self.environment {
            let bad_char = |c: char| c.is_whitespace() || c.is_control() || c == '=' || c == ',';
            if key.is_empty() || key.contains(bad_char) {
                return Err(invalid(format!("invalid environment variable name {key:?}")));
            }
            if value.contains(char::is_control) {
                return Err(invalid(format!(
                    "environment variable {key} must not contain control characters"
                )));
            }
        }
        Ok(())
    }

    /// Free-form string settings copied into the rendered section.
    fn string_settings(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("command", Some(self.command.as_str())),
            ("process_name", self.process_name.as_deref()),
            ("stopsignal", self.stopsignal.as_deref()),
            ("user", self.user.as_deref()),
            ("stdout_logfile", self.stdout_logfile.as_deref()),
            ("stdout_logfile_maxbytes", self.stdout_logfile_maxbytes.as_deref()),
            ("stderr_logfile", self.stderr_logfile.as_deref()),
            ("stderr_logfile_maxbytes", self.stderr_logfile_maxbytes.as_deref()),
            ("directory", self.directory.as_deref()),
            ("umask", self.umask.as_deref()),
            ("serverurl", self.serverurl.as_deref()),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key, value)))
    }
}

pub fn services_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os("DD_SUPERVISOR_SERVICES_DIR").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SERVICES_DIR))
}

/// Scan a directory for `*.yaml` files and parse each into a ServiceDescriptor.
/// The service name is derived from the filename (without extension).
/// Files that fail to parse or validate are logged and skipped.
pub fn load_descriptors(dir: &Path) -> Result<Vec<ServiceDescriptor>> {
    let mut descriptors = Vec::new();

    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read services directory: {}", dir.display()))?;

    let mut yaml_files: Vec<_> = entries
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("skipping unreadable entry in {}: {e}", dir.display());
                None
            }
        })
        .filter(|e| {
            let is_yaml = e
                .path()
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if !is_yaml {
                debug!("skipping non-YAML file: {}", e.path().display());
            }
            is_yaml
        })
        .collect();

    yaml_files.sort_by_key(|e| e.file_name());

    for entry in yaml_files {
        let path = entry.path();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();

        match parse_descriptor(&path, name) {
            Ok(descriptor) => descriptors.push(descriptor),
            Err(e) => warn!("skipping {}: {e:#}", path.display()),
        }
    }

    Ok(descriptors)
}

fn parse_descriptor(path: &Path, name: String) -> Result<ServiceDescriptor> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let mut descriptor: ServiceDescriptor =
        serde_yaml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
    descriptor.name = name;
    descriptor.validate()?;
    Ok(descriptor)
}

/// Look up descriptors by name. An empty `names` selects every descriptor.
pub fn select<'a>(
    descriptors: &'a [ServiceDescriptor],
    names: &[String],
) -> Result<Vec<&'a ServiceDescriptor>> {
    if names.is_empty() {
        return Ok(descriptors.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            descriptors
                .iter()
                .find(|d| &d.name == name)
                .with_context(|| format!("no service descriptor named {name}"))
        })
        .collect()
}
