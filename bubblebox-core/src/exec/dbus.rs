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
    os::unix::io::RawFd,
    path::Path,
    process::{Child, Command},
    time::{Duration, Instant},
};

use command_fds::{CommandFdExt, FdMapping};
use nix::{
    errno::Errno,
    poll::{poll, PollFd, PollFlags},
    sys::signal::{kill, Signal},
    unistd::{read, Pid},
};

use crate::{
    constants::DBUS_PROXY_EXECUTABLE,
    err,
    exec::{args::DbusRule, fdarena::FdArena},
    utils::print_warning,
    Error,
    ErrorKind,
    Result,
};

/// How long the proxy gets to signal readiness on its `--fd` pipe.
const READY_TIMEOUT: Duration = Duration::from_secs(1);

/// The system bus upstream is not negotiable the way the session bus is.
const SYSTEM_BUS_ADDRESS: &str = "unix:path=/run/dbus/system_bus_socket";

/// Supervisor for the external `xdg-dbus-proxy` process. One invocation
/// covers both buses: the session section first, then the system section,
/// each closed by `--filter`.
pub struct DbusProxy {
    argv: Vec<String>,
    ready_fd: RawFd,
    write_fd: RawFd,
    child: Option<Child>,
}

impl DbusProxy {
    /// Compose the proxy argv and allocate the ready pipe without spawning
    /// anything; dry runs stop here.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare(
        arena: &mut FdArena,
        session_address: &str,
        session_socket: &Path,
        system_socket: &Path,
        session_rules: &[DbusRule],
        system_rules: &[DbusRule],
        log_traffic: bool,
    ) -> Result<Self> {
        let (ready_fd, write_fd) = arena.add_pipe()?;
        let mut argv = vec![
            session_address.to_owned(),
            session_socket.to_string_lossy().into_owned(),
            format!("--fd={write_fd}"),
        ];

        argv.extend(session_rules.iter().map(DbusRule::to_flag));
        argv.push("--filter".into());

        if log_traffic {
            argv.push("--log".into());
        }

        argv.push(SYSTEM_BUS_ADDRESS.into());
        argv.push(system_socket.to_string_lossy().into_owned());
        argv.extend(system_rules.iter().map(DbusRule::to_flag));
        argv.push("--filter".into());

        if log_traffic {
            argv.push("--log".into());
        }

        Ok(Self {
            argv,
            ready_fd,
            write_fd,
            child: None,
        })
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Child pid, for diagnostics only.
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Spawn the proxy and block until it signals readiness, it exits, or
    /// the deadline passes.
    pub fn start(&mut self) -> Result<()> {
        let mut command = Command::new(DBUS_PROXY_EXECUTABLE);

        command.args(&self.argv);

        if command
            .fd_mappings(vec![FdMapping {
                parent_fd: self.write_fd,
                child_fd: self.write_fd,
            }])
            .is_err()
        {
            err!(ErrorKind::Message("D-Bus proxy fd mapping collision"))?
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(error) => err!(ErrorKind::ProcessInitFailure(DBUS_PROXY_EXECUTABLE, error.kind()))?,
        };
        let deadline = Instant::now() + READY_TIMEOUT;

        loop {
            if let Ok(Some(status)) = child.try_wait() {
                err!(ErrorKind::DbusProxyExited(status.code().unwrap_or(1)))?
            }

            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) => remaining,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    err!(ErrorKind::DbusProxyTimeout)?
                }
            };
            let mut fds = [PollFd::new(self.ready_fd, PollFlags::POLLIN)];

            match poll(&mut fds, remaining.as_millis() as i32) {
                Ok(0) => continue,
                Ok(_) => (),
                Err(_) => continue,
            }

            /*
             * The proxy writes a byte and closes its end of the pipe once
             * both sockets are accepting connections. Either event means
             * the sandbox may be spawned.
             */
            let mut buf = [0u8; 1];

            match read(self.ready_fd, &mut buf) {
                Ok(_) => break,
                Err(Errno::EAGAIN) => continue,
                Err(_) => break,
            }
        }

        self.child = Some(child);
        Ok(())
    }

    /// SIGTERM the proxy and reap it; an already-gone process is fine.
    pub fn stop(&mut self) {
        let mut child = match self.child.take() {
            Some(child) => child,
            None => return,
        };

        match kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => (),
            Err(error) => print_warning(&format!("failed to terminate the D-Bus proxy: {error}")),
        }

        if let Err(error) = child.wait() {
            print_warning(&format!("failed to reap the D-Bus proxy: {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::args::DbusRuleKind;

    #[test]
    fn argv_layout_covers_both_buses() {
        let mut arena = FdArena::new();
        let session_rules = vec![DbusRule::new(DbusRuleKind::Talk, "org.freedesktop.Notifications")];
        let system_rules = vec![DbusRule::new(DbusRuleKind::See, "org.freedesktop.login1")];
        let proxy = DbusProxy::prepare(
            &mut arena,
            "unix:path=/tmp/upstream",
            Path::new("/tmp/session_proxy"),
            Path::new("/tmp/system_proxy"),
            &session_rules,
            &system_rules,
            false,
        )
        .unwrap();
        let argv = proxy.argv();

        assert_eq!(argv[0], "unix:path=/tmp/upstream");
        assert_eq!(argv[1], "/tmp/session_proxy");
        assert!(argv[2].starts_with("--fd="));
        assert_eq!(argv[3], "--talk=org.freedesktop.Notifications");
        assert_eq!(argv[4], "--filter");
        assert_eq!(argv[5], SYSTEM_BUS_ADDRESS);
        assert_eq!(argv[6], "/tmp/system_proxy");
        assert_eq!(argv[7], "--see=org.freedesktop.login1");
        assert_eq!(argv[8], "--filter");
    }

    #[test]
    fn log_flag_closes_each_section() {
        let mut arena = FdArena::new();
        let proxy = DbusProxy::prepare(
            &mut arena,
            "unix:path=/tmp/upstream",
            Path::new("/tmp/session_proxy"),
            Path::new("/tmp/system_proxy"),
            &[],
            &[],
            true,
        )
        .unwrap();

        assert_eq!(proxy.argv().iter().filter(|a| *a == "--log").count(), 2);
    }
}
