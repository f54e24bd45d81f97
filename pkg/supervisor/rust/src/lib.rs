// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

pub mod artifact;
pub mod cli;
pub mod config;
pub mod ctl;
mod errors;
pub mod reconciler;
pub mod settings;
pub mod state;
pub mod status;
pub mod wait;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export the public API
pub use artifact::{ArtifactStore, render};
pub use config::{ServiceDescriptor, load_descriptors};
pub use ctl::{ControlTool, CtlCommand, Supervisorctl};
pub use errors::{Error, Result};
pub use reconciler::{Action, Outcome, Reconciler};
pub use settings::Settings;
pub use state::ServiceState;
pub use wait::{Sleeper, ThreadSleeper, WaitPolicy};
