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

use bubblebox_core::{
    constants::{BOLD, RESET},
    Result,
};

pub fn help() -> Result<()> {
    println!(
        "{}usage:{} bubblebox <operation> [...]

operations:
    run <instance> [--debug-shell] [--dry-run] [--debug-helper-script <path>]
        [--debug-log-dbus] [--wait] [--debug-bwrap-args <arg>] [--] [command ...]
        Launch an instance, or run a command inside it when it is already up.
    create [--profile <profile>] [--no-desktop-entry] <name>
        Create a new instance.
    list [instances|profiles|services]
        List known entities.
    edit <instance>
        Open the instance service configuration in $EDITOR.
    generate-desktop-entry [--profile <profile>] [--desktop-entry <name>] <instance>
        Install a desktop entry launching the instance.
    help | version",
        *BOLD, *RESET
    );
    Ok(())
}

pub fn version() -> Result<()> {
    println!("bubblebox {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
