// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::time::Duration;

use log::debug;

use crate::ctl::ControlTool;
use crate::errors::{Error, Result};
use crate::state::ServiceState;
use crate::status::probe;

pub const DEFAULT_ATTEMPTS: u32 = 20;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// How long to poll for a state before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub attempts: u32,
    /// Pause between two consecutive probes.
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

impl<T: Sleeper + ?Sized> Sleeper for &T {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

/// Blocks the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Probe `service` until it reports `target`, at most `policy.attempts` times.
pub fn wait_for_state<C, S>(
    ctl: &C,
    sleeper: &S,
    policy: WaitPolicy,
    service: &str,
    group: Option<&str>,
    target: ServiceState,
) -> Result<()>
where
    C: ControlTool + ?Sized,
    S: Sleeper + ?Sized,
{
    for attempt in 1..=policy.attempts {
        if probe(ctl, service, group)? == target {
            return Ok(());
        }
        if attempt < policy.attempts {
            debug!(
                "[{service}] waiting for state {target} ({attempt}/{})",
                policy.attempts
            );
            sleeper.sleep(policy.interval);
        }
    }

    Err(Error::ConvergenceTimeout {
        service: service.to_string(),
        state: target,
        attempts: policy.attempts,
    })
}
