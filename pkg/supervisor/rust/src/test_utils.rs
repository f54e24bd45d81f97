// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(clippy::unwrap_used)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Duration;

use crate::ctl::{ControlTool, CtlCommand};
use crate::errors::{Error, Result};
use crate::wait::Sleeper;

/// In-memory control tool. Status outputs are served in order; the last one
/// repeats once the script is exhausted.
pub struct ScriptedCtl {
    statuses: RefCell<VecDeque<String>>,
    responses: HashMap<&'static str, String>,
    failing_updates: Cell<u32>,
    calls: RefCell<Vec<String>>,
}

impl ScriptedCtl {
    pub fn new<I, S>(statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            statuses: RefCell::new(statuses.into_iter().map(Into::into).collect()),
            responses: HashMap::new(),
            failing_updates: Cell::new(0),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(mut self, command: CtlCommand, output: &str) -> Self {
        self.responses.insert(command.as_str(), output.to_string());
        self
    }

    /// Make the next `count` reloads fail the way supervisorctl does when
    /// supervisord is unreachable.
    pub fn fail_updates(self, count: u32) -> Self {
        self.failing_updates.set(count);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls other than `status`.
    pub fn commands(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c != "status")
            .collect()
    }
}

impl ControlTool for ScriptedCtl {
    fn status(&self) -> Result<String> {
        self.calls.borrow_mut().push("status".to_string());
        let mut statuses = self.statuses.borrow_mut();
        let out = if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses.front().cloned().unwrap_or_default()
        };
        Ok(out)
    }

    fn control(&self, command: CtlCommand, target: &str) -> Result<String> {
        self.calls.borrow_mut().push(format!("{command} {target}"));
        Ok(self
            .responses
            .get(command.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn update(&self) -> Result<()> {
        self.calls.borrow_mut().push("update".to_string());
        let failing = self.failing_updates.get();
        if failing > 0 {
            self.failing_updates.set(failing - 1);
            return Err(Error::CommandFailed {
                command: "supervisorctl update".to_string(),
                status: ExitStatus::from_raw(2 << 8),
                output: "unix:///var/run/supervisor.sock no such file".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSleeper {
    sleeps: RefCell<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}
