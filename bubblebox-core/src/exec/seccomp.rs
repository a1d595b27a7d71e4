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

use std::io::Read;

use libseccomp::{
    ScmpAction as Action,
    ScmpArch,
    ScmpArgCompare as Compare,
    ScmpCompareOp as Op,
    ScmpFilterContext,
    ScmpSyscall as Syscall,
};

use crate::{
    err,
    exec::args::{ArgComparator, SeccompAction, SeccompRule},
    Error,
    ErrorKind,
    Result,
};

/// Accumulator of seccomp rules with a default-allow action.
///
/// Rules are validated when added so that a bad syscall name in a service
/// option surfaces before anything has been spawned. A later rule for a
/// syscall replaces the earlier one; declaration order wins.
pub struct SeccompProgram {
    rules: Vec<SeccompRule>,
}

impl SeccompProgram {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add(&mut self, rule: SeccompRule) -> Result<()> {
        if Syscall::from_name(&rule.syscall).is_err() {
            err!(ErrorKind::Config(format!("unknown syscall '{}'", rule.syscall)))?
        }

        // Declaration order wins: a later rule replaces an earlier one for
        // the same syscall and argument predicate.
        self.rules.retain(|r| r.syscall != rule.syscall || r.arg_filter != rule.arg_filter);
        self.rules.push(rule);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// The kernel BPF serialisation of the accumulated rules. The output is
    /// a pure function of the rule set, so exporting twice yields identical
    /// bytes.
    pub fn export(&self) -> Result<Vec<u8>> {
        let filter = self.compile()?;
        let (mut reader, mut writer) = match os_pipe::pipe() {
            Ok(pipe) => pipe,
            Err(error) => err!(ErrorKind::IOError("pipe".into(), error.kind()))?,
        };

        if let Err(error) = filter.export_bpf(&mut writer) {
            err!(ErrorKind::Config(format!("seccomp export failed: {error}")))?
        }

        drop(writer);

        let mut program = Vec::new();

        match reader.read_to_end(&mut program) {
            Ok(_) => Ok(program),
            Err(error) => err!(ErrorKind::IOError("pipe".into(), error.kind())),
        }
    }

    fn compile(&self) -> Result<ScmpFilterContext> {
        let mut filter = match ScmpFilterContext::new_filter(Action::Allow) {
            Ok(filter) => filter,
            Err(error) => err!(ErrorKind::Config(format!("seccomp context init failed: {error}")))?,
        };

        if cfg!(target_arch = "x86_64") {
            add_arch(&mut filter, ScmpArch::X86)?;
            add_arch(&mut filter, ScmpArch::X8664)?;
        } else {
            add_arch(&mut filter, ScmpArch::Native)?;
        }

        for rule in &self.rules {
            let syscall = match Syscall::from_name(&rule.syscall) {
                Ok(syscall) => syscall,
                Err(_) => err!(ErrorKind::Config(format!("unknown syscall '{}'", rule.syscall)))?,
            };
            let action = match rule.action {
                SeccompAction::Errno(errno) => Action::Errno(errno),
                SeccompAction::Kill => Action::KillProcess,
            };
            let result = match rule.arg_filter {
                Some(arg) => {
                    let op = match arg.op {
                        ArgComparator::Equal => Op::Equal,
                        ArgComparator::NotEqual => Op::NotEqual,
                        ArgComparator::MaskedEqual(mask) => Op::MaskedEqual(mask),
                    };

                    filter.add_rule_conditional(action, syscall, &[Compare::new(arg.index, op, arg.value)])
                }
                None => filter.add_rule(action, syscall),
            };

            if let Err(error) = result {
                err!(ErrorKind::Config(format!("seccomp rule '{}' rejected: {error}", rule.syscall)))?
            }
        }

        Ok(filter)
    }
}

impl Default for SeccompProgram {
    fn default() -> Self {
        Self::new()
    }
}

fn add_arch(filter: &mut ScmpFilterContext, arch: ScmpArch) -> Result<()> {
    match filter.add_arch(arch) {
        Ok(_) => Ok(()),
        Err(error) => err!(ErrorKind::Config(format!("seccomp arch registration failed: {error}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::args::ArgFilter;

    #[test]
    fn unknown_syscall_fails_at_add_time() {
        let mut program = SeccompProgram::new();
        let error = program.add(SeccompRule::new("not_a_syscall", SeccompAction::Kill)).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::Config(_))));
    }

    #[test]
    fn later_rule_overrides_earlier() {
        let mut program = SeccompProgram::new();

        program.add(SeccompRule::new("ptrace", SeccompAction::Errno(1))).unwrap();
        program.add(SeccompRule::new("ptrace", SeccompAction::Kill)).unwrap();

        assert_eq!(program.len(), 1);
    }

    #[test]
    fn export_is_deterministic() {
        let mut program = SeccompProgram::new();

        program.add(SeccompRule::new("ptrace", SeccompAction::Errno(1))).unwrap();
        program
            .add(SeccompRule::filtered(
                "personality",
                SeccompAction::Errno(1),
                ArgFilter {
                    index: 0,
                    op: ArgComparator::NotEqual,
                    value: 0,
                },
            ))
            .unwrap();

        let first = program.export().unwrap();
        let second = program.export().unwrap();

        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
