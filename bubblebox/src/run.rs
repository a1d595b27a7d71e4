/*
 * bubblebox
 *
 * Copyright (C) 2025-2026 Bubblebox Contributors
 * SPDX-License-Identifier: GPL-3.0-only
 *
 * This program is free software: you can redistribute it and/or modify
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

use std::path::Path;

use bubblebox_core::{
    config::default_catalog,
    constants::{DATA_DIR, RUNTIME_BASE},
    err,
    exec::RunnerSettings,
    instance::Instance,
    utils::{arguments::Operand as Op, Arguments},
    Error,
    ErrorKind,
    Result,
};

pub fn run(args: &mut Arguments) -> Result<()> {
    let mut settings = RunnerSettings::default();
    let mut wait = false;
    let mut instance_name = None;
    let mut args_to_run: Vec<String> = Vec::new();

    while let Some(op) = args.next() {
        match op {
            Op::Long("debug-shell") => settings.debug_shell = true,
            Op::Long("dry-run") => settings.dry_run = true,
            Op::Long("debug-log-dbus") => settings.log_dbus = true,
            Op::Long("wait") => wait = true,
            Op::Long("debug-helper-script") | Op::Long("debug-bwrap-args") => (),
            Op::LongPos("debug-helper-script", path) => settings.debug_helper_script = Some(path.into()),
            // The first token of every occurrence is promoted to a bwrap flag.
            Op::LongPos("debug-bwrap-args", value) => settings.extra_bwrap_args.push(format!("--{value}")),
            // A value trailing a boolean flag is positional, like any bare value.
            Op::LongPos(_, value) | Op::Value(value) => match instance_name {
                None => instance_name = Some(value),
                Some(_) => args_to_run.push(value.into()),
            },
            _ => args.invalid_operand()?,
        }
    }

    args_to_run.extend(args.remainder().iter().map(|a| (*a).to_owned()));
    settings.args_to_run = args_to_run;

    let name = match instance_name {
        Some(name) => name,
        None => err!(ErrorKind::Message("Instance to run was not specified."))?,
    };
    let instance = Instance::new(Path::new(*DATA_DIR), name)?;
    let runtime_base = Path::new(*RUNTIME_BASE);

    // A live instance takes the command over its helper socket instead of
    // racing the runtime-directory lock.
    if !settings.dry_run && instance.is_running(runtime_base) {
        let response = instance.send_run_rpc(runtime_base, settings.args_to_run, wait)?;

        if let Some(response) = response {
            print!("{}", response.stdout);
            eprint!("{}", response.stderr);

            if response.exit_code != 0 {
                err!(ErrorKind::SandboxFailed(response.exit_code))?
            }
        }

        return Ok(());
    }

    instance.run(runtime_base, default_catalog(), &[], settings)
}
