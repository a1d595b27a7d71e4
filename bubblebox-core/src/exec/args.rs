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
    fmt::{Debug, Display, Formatter},
    os::unix::io::RawFd,
};

/// One atomic sandbox effect emitted by a service and consumed by the runner.
///
/// `WantsHomeBind` and `WantsDbusSessionPath` are placeholder requests: the
/// emitting service does not know the host layout, so the runner substitutes
/// the instance home and the session proxy socket before processing the next
/// directive.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Bind {
        src: String,
        dest: String,
        read_only: bool,
        try_only: bool,
    },
    DirCreate {
        path: String,
        mode: u32,
    },
    Symlink {
        src: String,
        dest: String,
    },
    FileTransfer {
        content: Vec<u8>,
        dest: String,
    },
    EnvSet {
        name: String,
        value: String,
    },
    EnvPassthrough {
        name: String,
    },
    ChangeDir {
        path: String,
    },
    ShareNet,
    NewSession,
    DbusSessionRule(DbusRule),
    DbusSystemRule(DbusRule),
    SeccompRule(SeccompRule),
    LaunchArg {
        tokens: Vec<String>,
        priority: i32,
    },
    WantsHomeBind {
        dest: String,
    },
    WantsDbusSessionPath {
        dest: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DbusRuleKind {
    See,
    Talk,
    Own,
    Call,
    Broadcast,
}

impl Display for DbusRuleKind {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self {
            Self::See => write!(fmter, "see"),
            Self::Talk => write!(fmter, "talk"),
            Self::Own => write!(fmter, "own"),
            Self::Call => write!(fmter, "call"),
            Self::Broadcast => write!(fmter, "broadcast"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbusRule {
    pub kind: DbusRuleKind,
    pub arg: String,
}

impl DbusRule {
    pub fn new(kind: DbusRuleKind, arg: &str) -> Self {
        Self { kind, arg: arg.into() }
    }

    /// Proxy flag form, e.g. `--talk=org.freedesktop.Notifications`.
    pub fn to_flag(&self) -> String {
        format!("--{}={}", self.kind, self.arg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeccompAction {
    Errno(i32),
    Kill,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArgComparator {
    Equal,
    NotEqual,
    MaskedEqual(u64),
}

/// Optional syscall argument predicate: argument `index` compared to `value`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArgFilter {
    pub index: u32,
    pub op: ArgComparator,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeccompRule {
    pub syscall: String,
    pub action: SeccompAction,
    pub arg_filter: Option<ArgFilter>,
}

impl SeccompRule {
    pub fn new(syscall: &str, action: SeccompAction) -> Self {
        Self {
            syscall: syscall.into(),
            action,
            arg_filter: None,
        }
    }

    pub fn filtered(syscall: &str, action: SeccompAction, filter: ArgFilter) -> Self {
        Self {
            syscall: syscall.into(),
            action,
            arg_filter: Some(filter),
        }
    }
}

/// Accumulator for the textual bwrap option list.
///
/// The list is handed to bwrap through `--args <fd>` as a NUL-joined byte
/// string rather than argv, sidestepping length limits and quoting hazards.
pub struct BwrapOptions {
    options: Vec<String>,
}

impl BwrapOptions {
    /// The fixed option prologue every sandbox starts from. `--new-session`
    /// is omitted for debug shells, which need the controlling terminal.
    pub fn new(new_session: bool) -> Self {
        let mut options = vec![
            "--unshare-all".to_owned(),
            "--die-with-parent".to_owned(),
            "--as-pid-1".to_owned(),
        ];

        if new_session {
            options.push("--new-session".to_owned());
        }

        options.extend(["--proc", "/proc", "--dev", "/dev", "--clearenv"].map(String::from));
        Self { options }
    }

    pub fn push(&mut self, args: &[&str]) {
        self.options.extend(args.iter().map(|a| (*a).to_owned()));
    }

    pub fn bind(&mut self, src: &str, dest: &str, read_only: bool, try_only: bool) {
        let flag = match (read_only, try_only) {
            (false, false) => "--bind",
            (false, true) => "--bind-try",
            (true, false) => "--ro-bind",
            (true, true) => "--ro-bind-try",
        };

        self.push(&[flag, src, dest]);
    }

    pub fn dir(&mut self, path: &str, mode: u32) {
        let mode = format!("{mode:o}");

        self.push(&["--perms", &mode, "--dir", path]);
    }

    pub fn symlink(&mut self, src: &str, dest: &str) {
        self.push(&["--symlink", src, dest]);
    }

    pub fn setenv(&mut self, name: &str, value: &str) {
        self.push(&["--setenv", name, value]);
    }

    pub fn chdir(&mut self, path: &str) {
        self.push(&["--chdir", path]);
    }

    pub fn share_net(&mut self) {
        self.push(&["--share-net"]);
    }

    pub fn file(&mut self, fd: RawFd, dest: &str) {
        let fd = fd.to_string();

        self.push(&["--file", &fd, dest]);
    }

    pub fn seccomp(&mut self, fd: RawFd) {
        let fd = fd.to_string();

        self.push(&["--seccomp", &fd]);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.options
    }

    /// NUL-joined serialisation consumed by `bwrap --args`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut data = Vec::new();

        for option in &self.options {
            data.extend_from_slice(option.as_bytes());
            data.push(0);
        }

        data
    }
}

impl Debug for BwrapOptions {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        writeln!(fmter, "options: {:?}", self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prologue_head_order() {
        let opts = BwrapOptions::new(true);
        let head: Vec<&str> = opts.as_slice().iter().map(|s| s.as_str()).collect();

        assert_eq!(
            head,
            vec![
                "--unshare-all",
                "--die-with-parent",
                "--as-pid-1",
                "--new-session",
                "--proc",
                "/proc",
                "--dev",
                "/dev",
                "--clearenv"
            ]
        );
    }

    #[test]
    fn prologue_without_new_session() {
        let opts = BwrapOptions::new(false);

        assert!(!opts.as_slice().iter().any(|a| a == "--new-session"));
    }

    #[test]
    fn bind_flag_selection() {
        let mut opts = BwrapOptions::new(true);

        opts.bind("/a", "/b", false, false);
        opts.bind("/c", "/d", true, false);
        opts.bind("/e", "/f", false, true);
        opts.bind("/g", "/h", true, true);

        let tail: Vec<&str> = opts.as_slice().iter().rev().take(12).rev().map(|s| s.as_str()).collect();

        assert_eq!(
            tail,
            vec!["--bind", "/a", "/b", "--ro-bind", "/c", "/d", "--bind-try", "/e", "/f", "--ro-bind-try", "/g", "/h"]
        );
    }

    #[test]
    fn serialize_is_nul_joined() {
        let mut opts = BwrapOptions::new(false);

        opts.chdir("/home/user");

        let data = opts.serialize();
        let expected: Vec<&[u8]> = data.split(|b| *b == 0).collect();

        // Trailing NUL: the final split segment is empty.
        assert!(expected.last().unwrap().is_empty());
        assert!(expected.contains(&&b"--chdir"[..]));
        assert!(expected.contains(&&b"/home/user"[..]));
    }

    #[test]
    fn dbus_rule_flag_form() {
        let rule = DbusRule::new(DbusRuleKind::Talk, "org.freedesktop.Notifications");

        assert_eq!(rule.to_flag(), "--talk=org.freedesktop.Notifications");
    }
}
