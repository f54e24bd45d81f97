// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::reconciler::Action;

#[derive(Parser, Debug)]
#[command(name = "dd-supervisor-service")]
#[command(version, about = "Manage supervisord programs from service descriptors", long_about = None)]
pub struct Args {
    /// Settings file (default: $DD_SUPERVISOR_SETTINGS or /etc/datadog-agent/supervisor/settings.yaml)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Directory of service descriptors (default: $DD_SUPERVISOR_SERVICES_DIR or /etc/datadog-agent/supervisor/services.d)
    #[arg(long, global = true)]
    pub services_dir: Option<PathBuf>,

    /// Log at debug level regardless of settings
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Install the program configuration and reload supervisord
    Enable {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Remove the program configuration and reload supervisord
    Disable {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Start programs and confirm they started
    Start {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Stop programs and confirm they stopped
    Stop {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Restart programs and confirm they started
    Restart {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Print the observed state of services (all descriptors when none given)
    Status { names: Vec<String> },
    /// Run the actions listed in each descriptor (all descriptors when none given)
    Apply { names: Vec<String> },
    /// Print the program configuration rendered for a descriptor
    Render { name: String },
}

impl Command {
    /// The single action and its targets, for the per-action subcommands.
    pub fn action(&self) -> Option<(Action, &[String])> {
        match self {
            Command::Enable { names } => Some((Action::Enable, names.as_slice())),
            Command::Disable { names } => Some((Action::Disable, names.as_slice())),
            Command::Start { names } => Some((Action::Start, names.as_slice())),
            Command::Stop { names } => Some((Action::Stop, names.as_slice())),
            Command::Restart { names } => Some((Action::Restart, names.as_slice())),
            Command::Status { .. } | Command::Apply { .. } | Command::Render { .. } => None,
        }
    }
}
