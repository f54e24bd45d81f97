// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Output};

use log::debug;

use crate::errors::{Error, Result};

/// supervisorctl subcommands that act on a program or group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlCommand {
    Start,
    Stop,
    Restart,
}

impl CtlCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            CtlCommand::Start => "start",
            CtlCommand::Stop => "stop",
            CtlCommand::Restart => "restart",
        }
    }
}

impl fmt::Display for CtlCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The control interface of the supervision daemon.
pub trait ControlTool {
    /// Full, unfiltered `status` output.
    fn status(&self) -> Result<String>;

    /// Run `command` against `target` and return its output with trailing
    /// whitespace removed. A non-zero exit is not an error here; callers judge
    /// success from the output.
    fn control(&self, command: CtlCommand, target: &str) -> Result<String>;

    /// Make the daemon re-read its configuration and apply added/removed programs.
    fn update(&self) -> Result<()>;
}

impl<T: ControlTool + ?Sized> ControlTool for &T {
    fn status(&self) -> Result<String> {
        (**self).status()
    }

    fn control(&self, command: CtlCommand, target: &str) -> Result<String> {
        (**self).control(command, target)
    }

    fn update(&self) -> Result<()> {
        (**self).update()
    }
}

/// Shells out to the `supervisorctl` binary.
#[derive(Debug, Clone)]
pub struct Supervisorctl {
    program: PathBuf,
    config_file: Option<PathBuf>,
    server_url: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl Supervisorctl {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            config_file: None,
            server_url: None,
            username: None,
            password: None,
        }
    }

    pub fn with_config_file(mut self, path: Option<PathBuf>) -> Self {
        self.config_file = path;
        self
    }

    pub fn with_server_url(mut self, url: Option<String>) -> Self {
        self.server_url = url;
        self
    }

    pub fn with_credentials(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    fn connection_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref path) = self.config_file {
            args.push("-c".to_string());
            args.push(path.display().to_string());
        }
        if let Some(ref url) = self.server_url {
            args.push("-s".to_string());
            args.push(url.clone());
        }
        if let Some(ref user) = self.username {
            args.push("-u".to_string());
            args.push(user.clone());
        }
        if let Some(ref password) = self.password {
            args.push("-p".to_string());
            args.push(password.clone());
        }
        args
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        // Connection args are left out of the log line, they may carry a password.
        debug!("running {} {}", self.program.display(), args.join(" "));
        Command::new(&self.program)
            .args(self.connection_args())
            .args(args)
            .output()
            .map_err(|source| Error::Spawn {
                program: self.program.display().to_string(),
                source,
            })
    }
}

impl ControlTool for Supervisorctl {
    fn status(&self) -> Result<String> {
        // supervisorctl exits non-zero whenever a program is not RUNNING, so the
        // exit code carries no information about the query itself.
        let output = self.run(&["status"])?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn control(&self, command: CtlCommand, target: &str) -> Result<String> {
        let output = self.run(&[command.as_str(), target])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn update(&self) -> Result<()> {
        let output = self.run(&["update"])?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&output.stdout)
        } else {
            stderr
        };
        Err(Error::CommandFailed {
            command: format!("{} update", self.program.display()),
            status: output.status,
            output: text.trim_end().to_string(),
        })
    }
}
