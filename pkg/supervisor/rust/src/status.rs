// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Turns `supervisorctl status` output into a [`ServiceState`].
//!
//! Status lines look like `[<group>:]<name>[:<index>] <STATE> <description>`.
//! Everything that depends on that layout lives in this module.

use std::collections::BTreeSet;

use log::debug;

use crate::ctl::ControlTool;
use crate::errors::{Error, Result};
use crate::state::ServiceState;

/// Query the control tool and classify the state of `service`.
pub fn probe<C: ControlTool + ?Sized>(
    ctl: &C,
    service: &str,
    group: Option<&str>,
) -> Result<ServiceState> {
    let output = ctl.status()?;
    let state = parse_state(&output, service, group)?;
    debug!("[{service}] probed state {state}");
    Ok(state)
}

/// Classify `service` from raw status output.
///
/// Returns `Unavailable` when no line belongs to the service, the single
/// state shared by all its lines, or `Mixed` when they disagree. Lines that
/// belong to the service but carry no known state token are ignored; if that
/// leaves nothing, the output is inconsistent.
pub fn parse_state(output: &str, service: &str, group: Option<&str>) -> Result<ServiceState> {
    let identity = match group {
        Some(group) => format!("{group}:{service}"),
        None => service.to_string(),
    };

    let lines: Vec<&str> = output
        .lines()
        .filter(|line| line_identity(line).is_some_and(|field| matches_identity(field, &identity)))
        .collect();
    if lines.is_empty() {
        return Ok(ServiceState::Unavailable);
    }

    let states: BTreeSet<ServiceState> = lines.iter().filter_map(|line| line_state(line)).collect();
    let mut iter = states.iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(Error::InconsistentOutput {
            service: service.to_string(),
            output: lines.join("\n"),
        }),
        (Some(state), None) => Ok(*state),
        (Some(_), Some(_)) => Ok(ServiceState::Mixed),
    }
}

/// First whitespace-delimited field of a line. Lines starting with whitespace
/// have no identity.
fn line_identity(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    line.split_whitespace().next()
}

/// `identity` alone, or followed by a `:<index>` process suffix.
fn matches_identity(field: &str, identity: &str) -> bool {
    match field.strip_prefix(identity) {
        Some(rest) => rest.is_empty() || rest.starts_with(':'),
        None => false,
    }
}

/// The first all-uppercase token after the identity, if it names a known state.
fn line_state(line: &str) -> Option<ServiceState> {
    line.split_whitespace()
        .skip(1)
        .find(|token| token.chars().all(|c| c.is_ascii_uppercase()))
        .and_then(ServiceState::from_token)
}
