// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stderr)]

use anyhow::{Result, bail};
use clap::Parser;
use dd_supervisor::cli::{Args, Command};
use dd_supervisor::config::{select, services_dir};
use dd_supervisor::settings::settings_path;
use dd_supervisor::{
    Action, ControlTool, Reconciler, ServiceDescriptor, Settings, Sleeper, load_descriptors,
    render,
};
use log::{LevelFilter, debug, error, info, warn};

fn main() -> Result<()> {
    let args = Args::parse();
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Trace)
        .init()?;
    log::set_max_level(LevelFilter::Info);

    let settings = Settings::load(&settings_path(args.settings.clone()))?;
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        settings.log_level()?.to_level_filter()
    };
    log::set_max_level(level);
    debug!(
        "dd-supervisor-service {} (log level {level})",
        env!("CARGO_PKG_VERSION")
    );

    let dir = services_dir(args.services_dir.clone());
    let descriptors = if dir.is_dir() {
        load_descriptors(&dir)?
    } else {
        warn!("services directory {} does not exist", dir.display());
        Vec::new()
    };
    info!("loaded {} service descriptor(s)", descriptors.len());

    let reconciler = Reconciler::new(settings.supervisorctl(), settings.artifact_store())
        .with_policy(settings.wait.policy()?);

    let failed = match &args.command {
        Command::Status { names } => print_status(&reconciler, &descriptors, names)?,
        Command::Apply { names } => apply(&reconciler, &select(&descriptors, names)?),
        Command::Render { name } => {
            let selected = select(&descriptors, std::slice::from_ref(name))?;
            print_render(&selected);
            0
        }
        command => match command.action() {
            Some((action, names)) => run_action(&reconciler, action, &select(&descriptors, names)?),
            None => 0,
        },
    };

    if failed > 0 {
        bail!("{failed} service(s) failed");
    }
    Ok(())
}

/// Run one action on every selected service, continuing past failures.
fn run_action<C: ControlTool, S: Sleeper>(
    reconciler: &Reconciler<C, S>,
    action: Action,
    selected: &[&ServiceDescriptor],
) -> usize {
    let mut failed = 0;
    for d in selected {
        match reconciler.apply(action, d) {
            Ok(outcome) => debug!("[{}] {action}: {outcome:?}", d.name),
            Err(e) => {
                error!("[{}] {action} failed: {e}", d.name);
                failed += 1;
            }
        }
    }
    failed
}

/// Run each descriptor's own action list. The first failing action skips the
/// rest of that service's list.
fn apply<C: ControlTool, S: Sleeper>(
    reconciler: &Reconciler<C, S>,
    selected: &[&ServiceDescriptor],
) -> usize {
    let mut failed = 0;
    for d in selected {
        let mut updated = false;
        for &action in &d.actions {
            match reconciler.apply(action, d) {
                Ok(outcome) => updated |= outcome.updated(),
                Err(e) => {
                    error!("[{}] {action} failed: {e}", d.name);
                    failed += 1;
                    break;
                }
            }
        }
        if updated {
            info!("[{}] updated", d.name);
        }
    }
    failed
}

#[allow(clippy::print_stdout)]
fn print_status<C: ControlTool, S: Sleeper>(
    reconciler: &Reconciler<C, S>,
    descriptors: &[ServiceDescriptor],
    names: &[String],
) -> Result<usize> {
    // Names without a descriptor are still probed as plain, ungrouped programs.
    let targets: Vec<ServiceDescriptor> = if names.is_empty() {
        descriptors.to_vec()
    } else {
        names
            .iter()
            .map(|name| {
                descriptors
                    .iter()
                    .find(|d| &d.name == name)
                    .cloned()
                    .unwrap_or_else(|| ServiceDescriptor::new(name.as_str(), ""))
            })
            .collect()
    };

    let mut failed = 0;
    for d in &targets {
        match reconciler.probe(d) {
            Ok(state) => println!("{} {state}", d.name),
            Err(e) => {
                error!("[{}] {e}", d.name);
                failed += 1;
            }
        }
    }
    Ok(failed)
}

#[allow(clippy::print_stdout)]
fn print_render(selected: &[&ServiceDescriptor]) {
    for d in selected {
        print!("{}", render(d));
    }
}
