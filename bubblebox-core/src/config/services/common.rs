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

use crate::{
    config::service::{OptionInfo, OptionKind, Service, ServiceOptions},
    constants::{SANDBOX_DBUS_SESSION_PATH, SANDBOX_HOME, SANDBOX_RUNTIME_DIR},
    exec::args::Directive,
    Result,
};

/// Baseline every instance shares: the home mount, a writable runtime
/// directory, a sane environment, and the session bus socket.
pub struct Common;

static OPTIONS: [OptionInfo; 1] = [OptionInfo::new(
    "executable_name",
    "Default command",
    "Command line started when the instance is launched without arguments.",
    OptionKind::SpaceSeparated,
)];

impl Service for Common {
    fn name(&self) -> &'static str {
        "common"
    }

    fn pretty_name(&self) -> &'static str {
        "Common settings"
    }

    fn description(&self) -> &'static str {
        "Base filesystem view and environment shared by every instance."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, options: &ServiceOptions) -> Result<Vec<Directive>> {
        let mut directives = vec![
            // Read-only host root view; the symlinks reproduce the merged-usr
            // layout so /bin and /lib resolve inside the sandbox.
            Directive::Bind {
                src: "/usr".into(),
                dest: "/usr".into(),
                read_only: true,
                try_only: false,
            },
            Directive::Symlink {
                src: "usr/bin".into(),
                dest: "/bin".into(),
            },
            Directive::Symlink {
                src: "usr/lib".into(),
                dest: "/lib".into(),
            },
            Directive::Symlink {
                src: "usr/lib".into(),
                dest: "/lib64".into(),
            },
            Directive::Symlink {
                src: "usr/sbin".into(),
                dest: "/sbin".into(),
            },
            Directive::Bind {
                src: "/etc".into(),
                dest: "/etc".into(),
                read_only: true,
                try_only: false,
            },
            Directive::WantsHomeBind {
                dest: SANDBOX_HOME.into(),
            },
            Directive::DirCreate {
                path: SANDBOX_RUNTIME_DIR.clone(),
                mode: 0o700,
            },
            Directive::EnvSet {
                name: "HOME".into(),
                value: SANDBOX_HOME.into(),
            },
            Directive::EnvSet {
                name: "USER".into(),
                value: "user".into(),
            },
            Directive::EnvSet {
                name: "PATH".into(),
                value: "/usr/local/bin:/usr/bin:/bin".into(),
            },
            Directive::EnvSet {
                name: "XDG_RUNTIME_DIR".into(),
                value: SANDBOX_RUNTIME_DIR.clone(),
            },
            Directive::EnvPassthrough { name: "LANG".into() },
            Directive::WantsDbusSessionPath {
                dest: SANDBOX_DBUS_SESSION_PATH.clone(),
            },
            Directive::EnvSet {
                name: "DBUS_SESSION_BUS_ADDRESS".into(),
                value: format!("unix:path={}", *SANDBOX_DBUS_SESSION_PATH),
            },
            Directive::ChangeDir {
                path: SANDBOX_HOME.into(),
            },
        ];
        let executable = options.space_separated("executable_name")?;

        if !executable.is_empty() {
            directives.push(Directive::LaunchArg {
                tokens: executable,
                priority: 0,
            });
        }

        Ok(directives)
    }
}

#[cfg(test)]
mod tests {
    use toml::Table;

    use super::*;

    #[test]
    fn placeholders_cover_home_and_session_bus() {
        let table = Table::new();
        let directives = Common.directives(&ServiceOptions::new("common", &table)).unwrap();

        assert!(directives.iter().any(|d| matches!(d, Directive::WantsHomeBind { .. })));
        assert!(directives.iter().any(|d| matches!(d, Directive::WantsDbusSessionPath { .. })));
    }

    #[test]
    fn host_root_view_is_read_only() {
        let table = Table::new();
        let directives = Common.directives(&ServiceOptions::new("common", &table)).unwrap();

        assert!(directives.contains(&Directive::Bind {
            src: "/usr".into(),
            dest: "/usr".into(),
            read_only: true,
            try_only: false,
        }));
        assert!(directives.contains(&Directive::Bind {
            src: "/etc".into(),
            dest: "/etc".into(),
            read_only: true,
            try_only: false,
        }));

        for dest in ["/bin", "/lib", "/lib64", "/sbin"] {
            assert!(directives.iter().any(|d| matches!(d, Directive::Symlink { dest: e, .. } if e == dest)));
        }
    }

    #[test]
    fn executable_name_becomes_the_launch_fragment() {
        let table: Table = toml::from_str("executable_name = \"firefox --new-window\"\n").unwrap();
        let directives = Common.directives(&ServiceOptions::new("common", &table)).unwrap();
        let fragment = directives.iter().find_map(|d| match d {
            Directive::LaunchArg { tokens, .. } => Some(tokens.clone()),
            _ => None,
        });

        assert_eq!(fragment.unwrap(), vec!["firefox", "--new-window"]);
    }
}
