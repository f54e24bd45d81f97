// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Converges a supervisord program towards a requested action.
//!
//! Every operation probes the live state first, so running the same action
//! twice is a no-op the second time. State transitions belong to supervisord;
//! the reconciler only issues commands and waits for the result.

use std::fmt;

use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;

use crate::artifact::ArtifactStore;
use crate::config::ServiceDescriptor;
use crate::ctl::{ControlTool, CtlCommand};
use crate::errors::{Error, Result};
use crate::state::ServiceState;
use crate::status::probe;
use crate::wait::{Sleeper, ThreadSleeper, WaitPolicy, wait_for_state};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Enable,
    Disable,
    Start,
    Stop,
    Restart,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Enable => "enable",
            Action::Disable => "disable",
            Action::Start => "start",
            Action::Stop => "stop",
            Action::Restart => "restart",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Action::Enable => "enabled",
            Action::Disable => "disabled",
            Action::Start => "started",
            Action::Stop => "stopped",
            Action::Restart => "restarted",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Already converged, nothing was changed.
    Unchanged,
    Updated,
}

impl Outcome {
    pub fn updated(self) -> bool {
        self == Outcome::Updated
    }
}

pub struct Reconciler<C, S = ThreadSleeper> {
    ctl: C,
    artifacts: ArtifactStore,
    policy: WaitPolicy,
    sleeper: S,
}

impl<C: ControlTool> Reconciler<C> {
    pub fn new(ctl: C, artifacts: ArtifactStore) -> Self {
        Self {
            ctl,
            artifacts,
            policy: WaitPolicy::default(),
            sleeper: ThreadSleeper,
        }
    }
}

impl<C: ControlTool, S: Sleeper> Reconciler<C, S> {
    pub fn with_policy(mut self, policy: WaitPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> Reconciler<C, T> {
        Reconciler {
            ctl: self.ctl,
            artifacts: self.artifacts,
            policy: self.policy,
            sleeper,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn probe(&self, d: &ServiceDescriptor) -> Result<ServiceState> {
        probe(&self.ctl, &d.name, d.group.as_deref())
    }

    pub fn apply(&self, action: Action, d: &ServiceDescriptor) -> Result<Outcome> {
        match action {
            Action::Enable => self.enable(d),
            Action::Disable => self.disable(d),
            Action::Start => self.start(d),
            Action::Stop => self.stop(d),
            Action::Restart => self.restart(d),
        }
    }

    /// Install the program configuration if supervisord does not know the
    /// program yet. The daemon is only reloaded when the file changed. A
    /// failed reload puts the previous file back so a retry reloads again.
    pub fn enable(&self, d: &ServiceDescriptor) -> Result<Outcome> {
        d.validate()?;
        if self.probe(d)? != ServiceState::Unavailable {
            debug!("[{}] is already enabled", d.name);
            return Ok(Outcome::Unchanged);
        }
        let previous = self.artifacts.read(&d.name)?;
        if !self.artifacts.write(d)? {
            debug!("[{}] configuration unchanged, not reloading", d.name);
            return Ok(Outcome::Unchanged);
        }
        if let Err(e) = self.ctl.update() {
            if let Err(restore) = self.artifacts.restore(&d.name, previous.as_deref()) {
                warn!("[{}] could not roll back configuration: {restore}", d.name);
            }
            return Err(e);
        }
        info!("[{}] enabled", d.name);
        Ok(Outcome::Updated)
    }

    pub fn disable(&self, d: &ServiceDescriptor) -> Result<Outcome> {
        if self.probe(d)? == ServiceState::Unavailable {
            debug!("[{}] is already disabled", d.name);
            return Ok(Outcome::Unchanged);
        }
        self.artifacts.remove(&d.name)?;
        self.ctl.update()?;
        info!("[{}] disabled", d.name);
        Ok(Outcome::Updated)
    }

    pub fn start(&self, d: &ServiceDescriptor) -> Result<Outcome> {
        match self.probe(d)? {
            ServiceState::Unavailable => Err(precondition(d, Action::Start)),
            ServiceState::Running => {
                debug!("[{}] is already started", d.name);
                Ok(Outcome::Unchanged)
            }
            ServiceState::Starting => {
                debug!("[{}] is already starting", d.name);
                self.wait_for(d, ServiceState::Running)?;
                Ok(Outcome::Unchanged)
            }
            _ => {
                let success = success_pattern(&d.name, "started", false)?;
                self.control(d, Action::Start, CtlCommand::Start, &success)?;
                info!("[{}] started", d.name);
                Ok(Outcome::Updated)
            }
        }
    }

    pub fn stop(&self, d: &ServiceDescriptor) -> Result<Outcome> {
        match self.probe(d)? {
            ServiceState::Unavailable => Err(precondition(d, Action::Stop)),
            ServiceState::Stopped => {
                debug!("[{}] is already stopped", d.name);
                Ok(Outcome::Unchanged)
            }
            ServiceState::Stopping => {
                debug!("[{}] is already stopping", d.name);
                self.wait_for(d, ServiceState::Stopped)?;
                Ok(Outcome::Unchanged)
            }
            _ => {
                let success = success_pattern(&d.name, "stopped", false)?;
                self.control(d, Action::Stop, CtlCommand::Stop, &success)?;
                info!("[{}] stopped", d.name);
                Ok(Outcome::Updated)
            }
        }
    }

    pub fn restart(&self, d: &ServiceDescriptor) -> Result<Outcome> {
        if self.probe(d)? == ServiceState::Unavailable {
            return Err(precondition(d, Action::Restart));
        }
        let success = success_pattern(&d.name, "started", true)?;
        self.control(d, Action::Restart, CtlCommand::Restart, &success)?;
        info!("[{}] restarted", d.name);
        Ok(Outcome::Updated)
    }

    fn wait_for(&self, d: &ServiceDescriptor, target: ServiceState) -> Result<()> {
        wait_for_state(
            &self.ctl,
            &self.sleeper,
            self.policy,
            &d.name,
            d.group.as_deref(),
            target,
        )
    }

    fn control(
        &self,
        d: &ServiceDescriptor,
        action: Action,
        command: CtlCommand,
        success: &Regex,
    ) -> Result<()> {
        let output = self.ctl.control(command, &d.control_target())?;
        if !success.is_match(&output) {
            return Err(Error::ActionFailed {
                service: d.name.clone(),
                action,
                output,
            });
        }
        Ok(())
    }
}

fn precondition(d: &ServiceDescriptor, action: Action) -> Error {
    Error::Precondition {
        service: d.name.clone(),
        action,
    }
}

/// `<name>(-<index>)?: <verb>` at the end of a line, optionally anchored at its start.
fn success_pattern(name: &str, verb: &str, anchored: bool) -> Result<Regex> {
    let anchor = if anchored { "^" } else { "" };
    Ok(Regex::new(&format!(
        r"(?m){anchor}{}(-\d+)?: {verb}$",
        regex::escape(name)
    ))?)
}
