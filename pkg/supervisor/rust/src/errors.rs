// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::reconciler::Action;
use crate::state::ServiceState;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The action makes no sense for a program supervisord does not know about.
    #[error("supervisor service {service} cannot be {} because it does not exist", .action.past_tense())]
    Precondition { service: String, action: Action },

    /// supervisorctl ran but its output did not confirm the action.
    #[error("supervisor service {service} was unable to be {}: {output}", .action.past_tense())]
    ActionFailed {
        service: String,
        action: Action,
        output: String,
    },

    #[error(
        "supervisor service {service} is not running as expected, `supervisorctl status` output:\n----\n{output}\n----"
    )]
    InconsistentOutput { service: String, output: String },

    #[error("service {service} not in state {state} after {attempts} tries")]
    ConvergenceTimeout {
        service: String,
        state: ServiceState,
        attempts: u32,
    },

    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {output}")]
    CommandFailed {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("invalid service descriptor {service:?}: {reason}")]
    InvalidDescriptor { service: String, reason: String },

    #[error("failed {op} {}: {source}", .path.display())]
    Artifact {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid success pattern: {0}")]
    Pattern(#[from] regex::Error),
}
