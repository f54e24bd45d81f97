// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::fmt;

/// Normalized state of a supervisord program, as observed by a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceState {
    /// No status line mentions the program.
    Unavailable,
    Stopped,
    Stopping,
    Starting,
    Backoff,
    Exited,
    Fatal,
    Running,
    /// Members of a process group reported different states.
    Mixed,
}

impl ServiceState {
    /// Parse a state token as printed by `supervisorctl status`.
    ///
    /// Only the states supervisord reports for a single process are accepted;
    /// `UNAVAILABLE` and `MIXED` are synthesized by the prober and never parsed.
    pub fn from_token(token: &str) -> Option<Self> {
        use ServiceState::*;
        match token {
            "STOPPED" => Some(Stopped),
            "STOPPING" => Some(Stopping),
            "STARTING" => Some(Starting),
            "BACKOFF" => Some(Backoff),
            "EXITED" => Some(Exited),
            "FATAL" => Some(Fatal),
            "RUNNING" => Some(Running),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::Unavailable => "UNAVAILABLE",
            ServiceState::Stopped => "STOPPED",
            ServiceState::Stopping => "STOPPING",
            ServiceState::Starting => "STARTING",
            ServiceState::Backoff => "BACKOFF",
            ServiceState::Exited => "EXITED",
            ServiceState::Fatal => "FATAL",
            ServiceState::Running => "RUNNING",
            ServiceState::Mixed => "MIXED",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
