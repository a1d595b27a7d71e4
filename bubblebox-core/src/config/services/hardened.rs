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

use nix::libc;

use crate::{
    config::service::{OptionInfo, OptionKind, Service, ServiceOptions},
    exec::args::{ArgComparator, ArgFilter, Directive, SeccompAction, SeccompRule},
    Result,
};

/*
 * Syscall blocklists derived from the filters bubblewrap front-ends have
 * converged on; see flatpak-run.c in the flatpak project.
 */
static NAMESPACE_SYSCALLS: [&str; 6] = ["unshare", "setns", "mount", "umount2", "pivot_root", "chroot"];
static TRACING_SYSCALLS: [&str; 2] = ["ptrace", "perf_event_open"];

pub struct Hardened;

static OPTIONS: [OptionInfo; 3] = [
    OptionInfo::new(
        "block_namespaces",
        "Block namespace creation",
        "Deny nested namespace setup inside the sandbox.",
        OptionKind::Bool,
    ),
    OptionInfo::new(
        "block_tty_control",
        "Block TTY takeover",
        "Deny TIOCSTI/TIOCLINUX ioctls on the controlling terminal.",
        OptionKind::Bool,
    ),
    OptionInfo::new(
        "block_tracing",
        "Block process tracing",
        "Make ptrace and perf_event_open report an unimplemented syscall.",
        OptionKind::Bool,
    ),
];

impl Service for Hardened {
    fn name(&self) -> &'static str {
        "hardened"
    }

    fn pretty_name(&self) -> &'static str {
        "Hardened syscalls"
    }

    fn description(&self) -> &'static str {
        "Seccomp filter rules for syscalls sandboxed applications rarely need."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, options: &ServiceOptions) -> Result<Vec<Directive>> {
        let mut directives = Vec::new();

        if options.bool("block_namespaces", true)? {
            for syscall in NAMESPACE_SYSCALLS {
                directives.push(Directive::SeccompRule(SeccompRule::new(syscall, SeccompAction::Errno(libc::EPERM))));
            }

            directives.push(Directive::SeccompRule(SeccompRule::filtered(
                "clone",
                SeccompAction::Errno(libc::EPERM),
                ArgFilter {
                    index: 0,
                    op: ArgComparator::MaskedEqual(libc::CLONE_NEWUSER as u64),
                    value: libc::CLONE_NEWUSER as u64,
                },
            )));
        }

        if options.bool("block_tty_control", true)? {
            for ioctl in [libc::TIOCSTI as u64, libc::TIOCLINUX as u64] {
                directives.push(Directive::SeccompRule(SeccompRule::filtered(
                    "ioctl",
                    SeccompAction::Errno(libc::EPERM),
                    ArgFilter {
                        index: 1,
                        op: ArgComparator::MaskedEqual(ioctl),
                        value: ioctl,
                    },
                )));
            }
        }

        if options.bool("block_tracing", true)? {
            for syscall in TRACING_SYSCALLS {
                directives.push(Directive::SeccompRule(SeccompRule::new(syscall, SeccompAction::Errno(libc::ENOSYS))));
            }
        }

        Ok(directives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toml::Table;

    #[test]
    fn defaults_emit_only_seccomp_rules() {
        let table = Table::new();
        let directives = Hardened.directives(&ServiceOptions::new("hardened", &table)).unwrap();

        assert!(!directives.is_empty());
        assert!(directives.iter().all(|d| matches!(d, Directive::SeccompRule(_))));
    }

    #[test]
    fn toggles_prune_their_rule_groups() {
        let table: Table =
            toml::from_str("block_namespaces = false\nblock_tty_control = false\nblock_tracing = false\n").unwrap();
        let directives = Hardened.directives(&ServiceOptions::new("hardened", &table)).unwrap();

        assert!(directives.is_empty());
    }
}
