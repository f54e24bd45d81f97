// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Per-service supervisord configuration files.

use std::fmt::Write as _;
use std::fs::{DirBuilder, OpenOptions, Permissions};
use std::io::{ErrorKind, Write};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt, chown};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::ServiceDescriptor;
use crate::errors::{Error, Result};

pub const DEFAULT_MODE: u32 = 0o644;

/// Used when a multi-process program does not name its processes, so members
/// report as `<name>-<index>`.
const DEFAULT_PROCESS_NAME: &str = "%(program_name)s-%(process_num)s";

/// Render the `[program:<name>]` section for a descriptor. Only settings that
/// are present are emitted, always in the same order.
///
/// Values are written verbatim so supervisord can expand `%(ENV_X)s` and
/// friends. A literal `%` must therefore be written as `%%` in the
/// descriptor. Values are assumed to have passed
/// [`ServiceDescriptor::validate`], which rejects line breaks.
pub fn render(d: &ServiceDescriptor) -> String {
    let mut out = String::new();
    let mut line = |key: &str, value: &dyn std::fmt::Display| {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{key}={value}");
    };

    line("command", &d.command);
    let process_name = d
        .process_name
        .as_deref()
        .or((d.numprocs > 1).then_some(DEFAULT_PROCESS_NAME));
    if let Some(process_name) = process_name {
        line("process_name", &process_name);
    }
    if d.numprocs != 1 {
        line("numprocs", &d.numprocs);
    }
    if let Some(v) = d.numprocs_start {
        line("numprocs_start", &v);
    }
    if let Some(v) = d.priority {
        line("priority", &v);
    }
    if let Some(v) = d.autostart {
        line("autostart", &v);
    }
    if let Some(v) = d.autorestart {
        line("autorestart", &v);
    }
    if let Some(v) = d.startsecs {
        line("startsecs", &v);
    }
    if let Some(v) = d.startretries {
        line("startretries", &v);
    }
    if !d.exitcodes.is_empty() {
        let codes: Vec<String> = d.exitcodes.iter().map(i32::to_string).collect();
        line("exitcodes", &codes.join(","));
    }
    if let Some(ref v) = d.stopsignal {
        line("stopsignal", v);
    }
    if let Some(v) = d.stopwaitsecs {
        line("stopwaitsecs", &v);
    }
    if let Some(v) = d.stopasgroup {
        line("stopasgroup", &v);
    }
    if let Some(v) = d.killasgroup {
        line("killasgroup", &v);
    }
    if let Some(ref v) = d.user {
        line("user", v);
    }
    if let Some(v) = d.redirect_stderr {
        line("redirect_stderr", &v);
    }
    if let Some(ref v) = d.stdout_logfile {
        line("stdout_logfile", v);
    }
    if let Some(ref v) = d.stdout_logfile_maxbytes {
        line("stdout_logfile_maxbytes", v);
    }
    if let Some(v) = d.stdout_logfile_backups {
        line("stdout_logfile_backups", &v);
    }
    if let Some(ref v) = d.stderr_logfile {
        line("stderr_logfile", v);
    }
    if let Some(ref v) = d.stderr_logfile_maxbytes {
        line("stderr_logfile_maxbytes", v);
    }
    if let Some(v) = d.stderr_logfile_backups {
        line("stderr_logfile_backups", &v);
    }
    if !d.environment.is_empty() {
        let pairs: Vec<String> = d
            .environment
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", v.replace('"', "\\\"")))
            .collect();
        line("environment", &pairs.join(","));
    }
    if let Some(ref v) = d.directory {
        line("directory", v);
    }
    if let Some(ref v) = d.umask {
        line("umask", v);
    }
    if let Some(ref v) = d.serverurl {
        line("serverurl", v);
    }

    format!("[program:{}]\n{out}", d.name)
}

/// Directory of `<name>.conf` files included by supervisord.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
    owner: Option<String>,
    group: Option<String>,
    mode: u32,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            owner: None,
            group: None,
            mode: DEFAULT_MODE,
        }
    }

    pub fn with_ownership(mut self, owner: Option<String>, group: Option<String>) -> Self {
        self.owner = owner;
        self.group = group;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn path_for(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{service}.conf"))
    }

    /// Current content of the configuration for `service`, if any.
    pub fn read(&self, service: &str) -> Result<Option<String>> {
        let path = self.path_for(service);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(artifact_error("reading", &path, source)),
        }
    }

    /// Write the rendered configuration for `descriptor`. Returns whether the
    /// file content changed; mode and ownership are enforced either way.
    pub fn write(&self, descriptor: &ServiceDescriptor) -> Result<bool> {
        let path = self.path_for(&descriptor.name);
        let rendered = render(descriptor);

        let changed = self.read(&descriptor.name)?.as_deref() != Some(rendered.as_str());
        if changed {
            self.write_contents(&path, &rendered)?;
            info!("[{}] wrote {}", descriptor.name, path.display());
        } else {
            debug!("[{}] {} is up to date", descriptor.name, path.display());
        }

        self.enforce_attributes(&path)?;
        Ok(changed)
    }

    /// Put back what [`read`](Self::read) returned before a write: the old
    /// content, or no file at all.
    pub fn restore(&self, service: &str, previous: Option<&str>) -> Result<()> {
        let Some(contents) = previous else {
            self.remove(service)?;
            return Ok(());
        };
        let path = self.path_for(service);
        self.write_contents(&path, contents)?;
        self.enforce_attributes(&path)?;
        info!("[{service}] restored {}", path.display());
        Ok(())
    }

    /// Delete the configuration for `service`. Returns whether a file was removed.
    pub fn remove(&self, service: &str) -> Result<bool> {
        let path = self.path_for(service);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                info!("[{service}] removed {}", path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("[{service}] {} already absent", path.display());
                Ok(false)
            }
            Err(source) => Err(artifact_error("removing", &path, source)),
        }
    }

    fn write_contents(&self, path: &Path, contents: &str) -> Result<()> {
        DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(&self.dir)
            .map_err(|source| artifact_error("creating", &self.dir, source))?;
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(self.mode)
            .open(path)
            .map_err(|source| artifact_error("opening", path, source))?;
        file.write_all(contents.as_bytes())
            .map_err(|source| artifact_error("writing", path, source))
    }

    fn enforce_attributes(&self, path: &Path) -> Result<()> {
        std::fs::set_permissions(path, Permissions::from_mode(self.mode))
            .map_err(|source| artifact_error("setting permissions on", path, source))?;
        self.apply_ownership(path);
        Ok(())
    }

    fn apply_ownership(&self, path: &Path) {
        let uid = self.owner.as_deref().and_then(|owner| {
            let user = uzers::get_user_by_name(owner);
            if user.is_none() {
                warn!("user {owner} not found, skipping ownership of {}", path.display());
            }
            user.map(|u| u.uid())
        });
        let gid = self.group.as_deref().and_then(|group| {
            let found = uzers::get_group_by_name(group);
            if found.is_none() {
                warn!("group {group} not found, skipping ownership of {}", path.display());
            }
            found.map(|g| g.gid())
        });
        if uid.is_none() && gid.is_none() {
            return;
        }
        if let Err(e) = chown(path, uid, gid) {
            warn!("could not set ownership of {}: {e}", path.display());
        }
    }
}

fn artifact_error(op: &'static str, path: &Path, source: std::io::Error) -> Error {
    Error::Artifact {
        op,
        path: path.to_path_buf(),
        source,
    }
}
