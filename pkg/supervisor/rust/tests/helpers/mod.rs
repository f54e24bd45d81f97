// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

#![allow(dead_code)]

use dd_supervisor::Supervisorctl;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Mutex, MutexGuard};
use tempfile::TempDir;

/// Stands in for supervisorctl. Connection flags are logged to `conn.log`,
/// the remaining arguments to `calls.log`. `status` prints the `status` file
/// and exits 3 like the real tool does when a program is not running.
/// `<cmd>.out` is printed for start/stop/restart, and `<cmd>.status` (when
/// present) replaces `status` afterwards. `update` fails while `update.fail`
/// exists.
const FAKE_SUPERVISORCTL: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
while [ $# -gt 0 ]; do
    case "$1" in
        -c|-s|-u|-p) echo "$1 $2" >> "$dir/conn.log"; shift 2 ;;
        *) break ;;
    esac
done
echo "$*" >> "$dir/calls.log"
cmd="$1"
case "$cmd" in
    status)
        cat "$dir/status" 2>/dev/null
        exit 3
        ;;
    start|stop|restart)
        cat "$dir/$cmd.out" 2>/dev/null
        ;;
    update)
        if [ -f "$dir/update.fail" ]; then
            cat "$dir/update.fail" >&2
            exit 2
        fi
        ;;
esac
if [ -f "$dir/$cmd.status" ]; then
    cp "$dir/$cmd.status" "$dir/status"
fi
exit 0
"#;

static SERIAL: Mutex<()> = Mutex::new(());

/// Serializes tests that write and then exec a script. A concurrent fork can
/// otherwise keep the script's write descriptor open and the exec fails with
/// ETXTBSY.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock().unwrap_or_else(|e| e.into_inner())
}

/// A fake supervisorctl plus the directories a service run needs.
pub struct FakeSupervisor {
    root: TempDir,
}

impl FakeSupervisor {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("failed to create tempdir");
        for dir in ["bin", "conf.d", "services.d"] {
            std::fs::create_dir(root.path().join(dir)).expect("failed to create dir");
        }
        let fake = Self { root };
        let script = fake.script();
        std::fs::write(&script, FAKE_SUPERVISORCTL).expect("failed to write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod script");
        fake
    }

    pub fn script(&self) -> PathBuf {
        self.root.path().join("bin/supervisorctl")
    }

    fn bin(&self, file: &str) -> PathBuf {
        self.root.path().join("bin").join(file)
    }

    /// Directory supervisord includes program files from.
    pub fn conf_dir(&self) -> PathBuf {
        self.root.path().join("conf.d")
    }

    pub fn services_dir(&self) -> PathBuf {
        self.root.path().join("services.d")
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.path().join("settings.yaml")
    }

    pub fn ctl(&self) -> Supervisorctl {
        Supervisorctl::new(self.script())
    }

    pub fn set_status(&self, status: &str) {
        write(&self.bin("status"), status);
    }

    /// Output printed by `cmd` (start, stop or restart).
    pub fn set_output(&self, cmd: &str, output: &str) {
        write(&self.bin(&format!("{cmd}.out")), output);
    }

    /// Status reported once `cmd` has run.
    pub fn set_status_after(&self, cmd: &str, status: &str) {
        write(&self.bin(&format!("{cmd}.status")), status);
    }

    pub fn fail_update(&self, message: &str) {
        write(&self.bin("update.fail"), message);
    }

    /// Commands received, without connection flags.
    pub fn calls(&self) -> Vec<String> {
        read_lines(&self.bin("calls.log"))
    }

    /// Commands received other than `status`.
    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().filter(|c| c != "status").collect()
    }

    pub fn connection_flags(&self) -> Vec<String> {
        read_lines(&self.bin("conn.log"))
    }

    /// Settings pointing the service at this fake, with short waits and no
    /// ownership changes. Only errors are logged so stdout carries just the
    /// command output. `extra` is appended verbatim.
    pub fn write_settings(&self, extra: &str) {
        let yaml = format!(
            "supervisor_dir: {}\nsupervisorctl: {}\nwait:\n  attempts: 3\n  interval_secs: 0.01\nartifact:\n  owner: null\n  group: null\nlog_level: error\n{extra}",
            self.conf_dir().display(),
            self.script().display(),
        );
        write(&self.settings_path(), &yaml);
    }

    /// Write `services.d/<name>.yaml`.
    pub fn write_descriptor(&self, name: &str, yaml: &str) {
        write(&self.services_dir().join(format!("{name}.yaml")), yaml);
    }

    /// Run dd-supervisor-service against this fake.
    pub fn run(&self, args: &[&str]) -> Output {
        let bin = env!("CARGO_BIN_EXE_dd-supervisor-service");
        Command::new(bin)
            .arg("--settings")
            .arg(self.settings_path())
            .arg("--services-dir")
            .arg(self.services_dir())
            .args(args)
            .output()
            .expect("failed to run dd-supervisor-service")
    }
}

pub fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

fn write(path: &Path, contents: &str) {
    std::fs::write(path, contents)
        .unwrap_or_else(|e| panic!("failed to write {}: {e}", path.display()));
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
