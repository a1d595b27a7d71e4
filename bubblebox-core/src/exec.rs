/*
 * bubblebox-core
 *
 * Copyright (C) 2025-2026 Bubblebox Contributors
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This library is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, version 3.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{
    env::var,
    fs,
    io::Read,
    os::unix::{
        io::{AsRawFd, RawFd},
        process::ExitStatusExt,
    },
    path::PathBuf,
    process::Command,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use command_fds::{CommandFdExt, FdMapping};
use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use signal_hook::{consts::SIGTERM, iterator::Signals};
use toml::Table;

use crate::{
    config::{service::Service, ServiceConfig, ServiceOptions},
    constants::{BWRAP_EXECUTABLE, HELPER_EXECUTABLE, HELPER_MOUNT_DIR},
    err,
    exec::{
        args::{BwrapOptions, DbusRule, Directive},
        dbus::DbusProxy,
        fdarena::FdArena,
        seccomp::SeccompProgram,
    },
    homeplugin::{HomePlugin, HomePluginStack},
    instance::RuntimePaths,
    utils::{env_var, print_warning},
    Error,
    ErrorGeneric,
    ErrorKind,
    Result,
};

pub mod args;
pub mod dbus;
pub mod fdarena;
pub mod seccomp;

/// Forward-only lifecycle of one sandbox launch. Any failure jumps to
/// `Draining`; cleanup itself cannot be cancelled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunnerState {
    Built,
    Staged,
    DbusUp,
    SandboxUp,
    Running,
    Draining,
    Terminated,
}

/// Caller-side switches for one run.
#[derive(Debug, Default)]
pub struct RunnerSettings {
    pub args_to_run: Vec<String>,
    pub debug_shell: bool,
    pub dry_run: bool,
    pub debug_helper_script: Option<PathBuf>,
    pub log_dbus: bool,
    pub extra_bwrap_args: Vec<String>,
}

/// Consumes the directive stream of every enabled service, materialises the
/// bwrap invocation, and supervises the resulting container until drained.
pub struct SandboxRunner<'a> {
    home: PathBuf,
    paths: RuntimePaths,
    config: &'a ServiceConfig,
    catalog: &'a [&'static dyn Service],
    plugins: &'a [&'a dyn HomePlugin],
    settings: RunnerSettings,
    state: RunnerState,
    arena: FdArena,
    options: BwrapOptions,
    seccomp: SeccompProgram,
    session_rules: Vec<DbusRule>,
    system_rules: Vec<DbusRule>,
    launch_args: Vec<(i32, usize, Vec<String>)>,
    proxy: Option<DbusProxy>,
    args_fd: Option<RawFd>,
    command_argv: Vec<String>,
    runtime_acquired: bool,
    plugin_stack: Option<HomePluginStack<'a>>,
    sandboxed_pid: Option<i32>,
    sandbox_spawned: bool,
}

impl<'a> SandboxRunner<'a> {
    pub fn new(
        home: PathBuf,
        paths: RuntimePaths,
        config: &'a ServiceConfig,
        catalog: &'a [&'static dyn Service],
        plugins: &'a [&'a dyn HomePlugin],
        settings: RunnerSettings,
    ) -> Self {
        let options = BwrapOptions::new(!settings.debug_shell);

        Self {
            home,
            paths,
            config,
            catalog,
            plugins,
            settings,
            state: RunnerState::Built,
            arena: FdArena::new(),
            options,
            seccomp: SeccompProgram::new(),
            session_rules: Vec::new(),
            system_rules: Vec::new(),
            launch_args: Vec::new(),
            proxy: None,
            args_fd: None,
            command_argv: Vec::new(),
            runtime_acquired: false,
            plugin_stack: None,
            sandboxed_pid: None,
            sandbox_spawned: false,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Stage, launch and supervise to completion, then drain. The primary
    /// failure wins over anything that goes wrong during cleanup.
    pub fn run(&mut self) -> Result<()> {
        let outcome = self.execute();

        if self.settings.dry_run && outcome.is_ok() {
            self.state = RunnerState::Terminated;
            return Ok(());
        }

        self.drain();

        match outcome {
            Ok(0) => Ok(()),
            Ok(code) => err!(ErrorKind::SandboxFailed(code)),
            Err(error) => Err(error),
        }
    }

    fn execute(&mut self) -> Result<i32> {
        self.build()?;

        if self.settings.dry_run {
            self.print_dry_run();
            return Ok(0);
        }

        self.launch()
    }

    /// Built → Staged: fold every enabled service's directives into the
    /// option list, the arena, the seccomp program and the proxy rules,
    /// then stage the NUL-joined options file.
    fn build(&mut self) -> Result<()> {
        let entries = self.config.iter_services(self.catalog, false);

        for entry in entries {
            let options = ServiceOptions::new(entry.service.name(), &entry.options);
            let directives = entry.service.directives(&options)?;

            for directive in directives {
                self.apply(directive)?;
            }
        }

        if !self.seccomp.is_empty() {
            let program = self.seccomp.export()?;
            let fd = self.arena.add_temp(&program)?;

            self.options.seccomp(fd);
        }

        let session_socket = self.paths.dbus_session_socket().to_string_lossy().into_owned();
        let system_socket = self.paths.dbus_system_socket().to_string_lossy().into_owned();
        let helper_dir = self.paths.helper_dir().to_string_lossy().into_owned();

        // Distributions disagree on which system bus path is the symlink,
        // so the proxy socket is visible at both.
        self.options.bind(&system_socket, "/var/run/dbus/system_bus_socket", false, false);
        self.options.bind(&system_socket, "/run/dbus/system_bus_socket", false, false);
        self.options.bind(&helper_dir, HELPER_MOUNT_DIR, false, false);

        let session_address = env_var("DBUS_SESSION_BUS_ADDRESS")?;

        self.proxy = Some(DbusProxy::prepare(
            &mut self.arena,
            &session_address,
            self.paths.dbus_session_socket(),
            self.paths.dbus_system_socket(),
            &self.session_rules,
            &self.system_rules,
            self.settings.log_dbus,
        )?);

        self.args_fd = Some(self.arena.add_temp(&self.options.serialize())?);
        self.command_argv = self.compose_command_argv()?;
        self.state = RunnerState::Staged;
        Ok(())
    }

    fn apply(&mut self, directive: Directive) -> Result<()> {
        match directive {
            Directive::Bind {
                src,
                dest,
                read_only,
                try_only,
            } => self.options.bind(&src, &dest, read_only, try_only),
            Directive::DirCreate { path, mode } => self.options.dir(&path, mode),
            Directive::Symlink { src, dest } => self.options.symlink(&src, &dest),
            Directive::FileTransfer { content, dest } => {
                let fd = self.arena.add_temp(&content)?;

                self.options.file(fd, &dest);
            }
            Directive::EnvSet { name, value } => self.options.setenv(&name, &value),
            Directive::EnvPassthrough { name } => {
                if let Ok(value) = var(&name) {
                    self.options.setenv(&name, &value);
                }
            }
            Directive::ChangeDir { path } => self.options.chdir(&path),
            Directive::ShareNet => self.options.share_net(),
            Directive::NewSession => self.options.push(&["--new-session"]),
            Directive::DbusSessionRule(rule) => self.session_rules.push(rule),
            Directive::DbusSystemRule(rule) => self.system_rules.push(rule),
            Directive::SeccompRule(rule) => self.seccomp.add(rule)?,
            Directive::LaunchArg { tokens, priority } => {
                let sequence = self.launch_args.len();

                self.launch_args.push((priority, sequence, tokens));
            }
            Directive::WantsHomeBind { dest } => {
                let home = self.home.to_string_lossy().into_owned();

                self.options.bind(&home, &dest, false, false);
            }
            Directive::WantsDbusSessionPath { dest } => {
                let socket = self.paths.dbus_session_socket().to_string_lossy().into_owned();

                self.options.bind(&socket, &dest, false, false);
            }
        }

        Ok(())
    }

    /// The argv tail behind the bwrap options: helper invocation plus the
    /// inner command line.
    fn compose_command_argv(&self) -> Result<Vec<String>> {
        let mut argv = Vec::new();

        match &self.settings.debug_helper_script {
            Some(script_path) => {
                let script = fs::read_to_string(script_path).prepend_io(|| script_path.to_string_lossy().into())?;

                argv.extend(["/bin/sh".to_owned(), "-c".to_owned(), script]);
            }
            None => argv.push(HELPER_EXECUTABLE.to_string()),
        }

        if self.settings.debug_shell {
            argv.push("--shell".into());
        }

        match self.settings.args_to_run.is_empty() {
            true => argv.extend(self.default_launch_argv()),
            false => argv.extend(self.settings.args_to_run.iter().cloned()),
        }

        Ok(argv)
    }

    /// Launch-arg fragments sorted by priority, stable on ties.
    fn default_launch_argv(&self) -> Vec<String> {
        let mut fragments = self.launch_args.clone();

        fragments.sort_by_key(|(priority, sequence, _)| (*priority, *sequence));
        fragments.into_iter().flat_map(|(_, _, tokens)| tokens).collect()
    }

    fn bwrap_argv(&self, info_fd: Option<RawFd>) -> Vec<String> {
        let mut argv = vec!["--args".to_owned(), self.args_fd.unwrap_or(-1).to_string()];

        if let Some(fd) = info_fd {
            argv.extend(["--info-fd".to_owned(), fd.to_string()]);
        }

        argv.extend(self.settings.extra_bwrap_args.iter().cloned());
        argv.extend(self.command_argv.iter().cloned());
        argv
    }

    fn print_dry_run(&self) {
        let proxy_argv = self.proxy.as_ref().map(|p| p.argv().join(" ")).unwrap_or_default();

        println!("Bwrap options: {}", self.options.as_slice().join(" "));
        println!("Bwrap args: {} {}", BWRAP_EXECUTABLE, self.bwrap_argv(None).join(" "));
        println!("Dbus session args: {proxy_argv}");
    }

    /// Staged → Running: take the runtime lock, enter home plugins, gate on
    /// the proxy, then hand the composed invocation to bwrap.
    fn launch(&mut self) -> Result<i32> {
        self.paths.acquire()?;
        self.runtime_acquired = true;
        self.plugin_stack = Some(HomePluginStack::enter_all(&self.home, self.plugins)?);

        match self.proxy.as_mut() {
            Some(proxy) => proxy.start()?,
            None => err!(ErrorKind::Message("D-Bus proxy was never prepared"))?,
        }

        self.state = RunnerState::DbusUp;

        let (mut info_reader, info_writer) = match os_pipe::pipe() {
            Ok(pipe) => pipe,
            Err(error) => err!(ErrorKind::IOError("pipe".into(), error.kind()))?,
        };
        let info_fd = info_writer.as_raw_fd();
        let mappings: Vec<FdMapping> = self
            .arena
            .inheritable_fds()
            .into_iter()
            .chain([info_fd])
            .map(|fd| FdMapping {
                parent_fd: fd,
                child_fd: fd,
            })
            .collect();
        let mut command = Command::new(BWRAP_EXECUTABLE);

        command.env_clear().args(self.bwrap_argv(Some(info_fd)));

        if command.fd_mappings(mappings).is_err() {
            err!(ErrorKind::Message("bwrap fd mapping collision"))?
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => err!(ErrorKind::ProcessInitFailure(BWRAP_EXECUTABLE, error.kind()))?,
        };

        self.sandbox_spawned = true;
        self.state = RunnerState::SandboxUp;
        drop(info_writer);

        let bwrap_pid = child.id() as i32;
        let sandboxed_pid = read_sandboxed_pid(&mut info_reader).or_else(|| proc_walk_pid(bwrap_pid));

        self.sandboxed_pid = sandboxed_pid;

        /*
         * Host-side SIGTERM is forwarded to the in-sandbox pid-1, which
         * owns the cooperative shutdown of everything inside.
         */
        let signals = Signals::new([SIGTERM]);
        let trap = match signals {
            Ok(mut signals) => {
                let handle = signals.handle();

                let _ = thread::Builder::new().name("bubblebox-signal".into()).spawn(move || {
                    for _ in signals.forever() {
                        let target = sandboxed_pid.or_else(|| proc_walk_pid(bwrap_pid));

                        if let Some(target) = target {
                            let _ = kill(Pid::from_raw(target), Signal::SIGTERM);
                        }
                    }
                });

                Some(handle)
            }
            Err(error) => {
                print_warning(&format!("failed to install the SIGTERM trap: {error}"));
                None
            }
        };

        let cancel = Arc::new(AtomicBool::new(false));
        let hooks = self.sandboxed_pid.map(|pid| {
            let cancel = Arc::clone(&cancel);
            let entries: Vec<(&'static dyn Service, Table)> = self
                .config
                .iter_services(self.catalog, false)
                .into_iter()
                .map(|e| (e.service, e.options))
                .collect();

            thread::spawn(move || {
                for (service, options) in entries {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }

                    if let Err(error) = service.post_init_hook(pid, &ServiceOptions::new(service.name(), &options)) {
                        print_warning(&format!("post-init hook of '{}' failed: {error}", service.name()));
                    }
                }
            })
        });

        self.state = RunnerState::Running;

        let status = match child.wait() {
            Ok(status) => status,
            Err(error) => {
                cancel.store(true, Ordering::Relaxed);
                err!(ErrorKind::ProcessWaitFailure(BWRAP_EXECUTABLE, error.kind()))?
            }
        };

        cancel.store(true, Ordering::Relaxed);

        if let Some(handle) = trap {
            handle.close();
        }

        if let Some(hooks) = hooks {
            let _ = hooks.join();
        }

        Ok(status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0)))
    }

    /// Reverse-order cleanup. Nothing in here raises; individual failures
    /// are reported and skipped so later steps still run.
    fn drain(&mut self) {
        self.state = RunnerState::Draining;

        if self.sandbox_spawned {
            for entry in self.config.iter_services(self.catalog, false) {
                let options = ServiceOptions::new(entry.service.name(), &entry.options);

                if let Err(error) = entry.service.post_shutdown_hook(&options) {
                    print_warning(&format!("post-shutdown hook of '{}' failed: {error}", entry.service.name()));
                }
            }
        }

        if let Some(proxy) = self.proxy.as_mut() {
            proxy.stop();
        }

        if self.runtime_acquired {
            self.paths.release();
            self.runtime_acquired = false;
        }

        self.arena = FdArena::new();

        if let Some(stack) = self.plugin_stack.take() {
            stack.exit_all();
        }

        self.state = RunnerState::Terminated;
    }

    #[cfg(test)]
    fn options(&self) -> &BwrapOptions {
        &self.options
    }
}

/// bwrap reports the pid of the sandboxed init through `--info-fd` as a
/// small JSON document.
fn read_sandboxed_pid(info: &mut os_pipe::PipeReader) -> Option<i32> {
    let mut raw = String::new();

    info.read_to_string(&mut raw).ok()?;

    let value: serde_json::Value = serde_json::from_str(&raw).ok()?;

    value.get("child-pid")?.as_i64().map(|pid| pid as i32)
}

/// Fallback discovery of the in-sandbox pid-1: the first child of bwrap's
/// first task.
fn proc_walk_pid(bwrap_pid: i32) -> Option<i32> {
    let children = fs::read_to_string(format!("/proc/{bwrap_pid}/task/{bwrap_pid}/children")).ok()?;

    children.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use std::{env::temp_dir, process::id};

    use super::*;
    use crate::config::{OptionInfo, ServiceConfig};

    struct Emitter;

    static NO_OPTIONS: [OptionInfo; 0] = [];

    impl Service for Emitter {
        fn name(&self) -> &'static str {
            "common"
        }

        fn pretty_name(&self) -> &'static str {
            "Emitter"
        }

        fn description(&self) -> &'static str {
            "Test directive source."
        }

        fn options(&self) -> &'static [OptionInfo] {
            &NO_OPTIONS
        }

        fn directives(&self, _options: &ServiceOptions) -> Result<Vec<Directive>> {
            Ok(vec![
                Directive::WantsHomeBind {
                    dest: "/home/user".into(),
                },
                Directive::FileTransfer {
                    content: b"injected".to_vec(),
                    dest: "/home/user/.injected".into(),
                },
                Directive::LaunchArg {
                    tokens: vec!["--verbose".into()],
                    priority: 10,
                },
                Directive::LaunchArg {
                    tokens: vec!["/usr/bin/app".into()],
                    priority: 0,
                },
                Directive::EnvSet {
                    name: "HOME".into(),
                    value: "/home/user".into(),
                },
            ])
        }
    }

    static TEST_CATALOG: [&dyn Service; 1] = [&Emitter];

    fn runner_fixture(tag: &str, settings: RunnerSettings) -> (SandboxRunner<'static>, std::path::PathBuf) {
        std::env::set_var("DBUS_SESSION_BUS_ADDRESS", "unix:path=/tmp/bubblebox-test-bus");

        let base = temp_dir().join(format!("bubblebox-runner-{tag}-{}", id()));
        let _ = std::fs::remove_dir_all(&base);
        std::fs::create_dir_all(&base).unwrap();

        let config = Box::leak(Box::new(ServiceConfig::new()));
        let paths = RuntimePaths::new(&base.join("runtime"), "alice");
        let runner = SandboxRunner::new(base.join("home"), paths, config, &TEST_CATALOG, &[], settings);

        (runner, base)
    }

    fn positions(options: &[String], needle: &str) -> Vec<usize> {
        options
            .iter()
            .enumerate()
            .filter(|(_, a)| a.as_str() == needle)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn build_keeps_the_fixed_prologue_at_the_head() {
        let (mut runner, base) = runner_fixture("prologue", RunnerSettings::default());

        runner.build().unwrap();
        assert_eq!(runner.state(), RunnerState::Staged);

        let options = runner.options().as_slice();
        let order = ["--unshare-all", "--die-with-parent", "--as-pid-1", "--proc", "--dev", "--clearenv"];
        let indexes: Vec<usize> = order.iter().map(|flag| positions(options, flag)[0]).collect();
        let mut sorted = indexes.clone();

        sorted.sort_unstable();
        assert_eq!(indexes, sorted);
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn file_transfer_yields_exactly_one_file_option() {
        let (mut runner, base) = runner_fixture("file", RunnerSettings::default());

        runner.build().unwrap();

        let options = runner.options().as_slice();
        let file_positions = positions(options, "--file");

        assert_eq!(file_positions.len(), 1);
        assert_eq!(options[file_positions[0] + 2], "/home/user/.injected");

        // The staged fd is one of the descriptors inherited by the helper.
        let fd: RawFd = options[file_positions[0] + 1].parse().unwrap();
        assert!(runner.arena.inheritable_fds().contains(&fd));
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn home_bind_is_resolved_inline() {
        let (mut runner, base) = runner_fixture("home", RunnerSettings::default());

        runner.build().unwrap();

        let options = runner.options().as_slice();
        let home = base.join("home").to_string_lossy().into_owned();
        let bind_position = positions(options, "--bind")
            .into_iter()
            .find(|i| options[i + 1] == home)
            .expect("home bind missing");

        assert_eq!(options[bind_position + 2], "/home/user");
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn system_bus_socket_is_bound_at_both_paths() {
        let (mut runner, base) = runner_fixture("sysbus", RunnerSettings::default());

        runner.build().unwrap();

        let options = runner.options().as_slice();

        assert!(options.iter().any(|a| a == "/var/run/dbus/system_bus_socket"));
        assert!(options.iter().any(|a| a == "/run/dbus/system_bus_socket"));
        assert!(options.iter().any(|a| a == HELPER_MOUNT_DIR));
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn launch_args_sort_by_priority_stably() {
        let (mut runner, base) = runner_fixture("launch", RunnerSettings::default());

        runner.build().unwrap();
        assert_eq!(runner.default_launch_argv(), vec!["/usr/bin/app", "--verbose"]);

        // An explicit command overrides the service-provided one.
        runner.settings.args_to_run = vec!["/bin/true".into()];
        assert_eq!(
            runner.compose_command_argv().unwrap(),
            vec![HELPER_EXECUTABLE.to_string(), "/bin/true".into()]
        );
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn debug_shell_drops_new_session_and_adds_the_flag() {
        let settings = RunnerSettings {
            debug_shell: true,
            ..RunnerSettings::default()
        };
        let (mut runner, base) = runner_fixture("shell", settings);

        runner.build().unwrap();
        assert!(!runner.options().as_slice().iter().any(|a| a == "--new-session"));
        assert!(runner.compose_command_argv().unwrap().contains(&"--shell".to_owned()));
        std::fs::remove_dir_all(&base).unwrap();
    }

    #[test]
    fn dry_run_terminates_without_side_effects() {
        let settings = RunnerSettings {
            dry_run: true,
            args_to_run: vec!["/bin/echo".into(), "hi".into()],
            ..RunnerSettings::default()
        };
        let (mut runner, base) = runner_fixture("dry", settings);

        runner.run().unwrap();
        assert_eq!(runner.state(), RunnerState::Terminated);
        assert!(!runner.paths.root().exists());
        std::fs::remove_dir_all(&base).unwrap();
    }
}
