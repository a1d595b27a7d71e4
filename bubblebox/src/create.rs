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
    constants::{BOLD, DATA_DIR, RESET},
    err,
    instance::Instance,
    profile::find_profile,
    utils::{arguments::Operand as Op, Arguments},
    Error,
    ErrorKind,
    Result,
};

use crate::desktop;

pub fn create(args: &mut Arguments) -> Result<()> {
    let mut profile_name = None;
    let mut desktop_entry = true;
    let mut name = None;

    while let Some(op) = args.next() {
        match op {
            Op::Long("profile") => (),
            Op::Long("no-desktop-entry") => desktop_entry = false,
            Op::LongPos("profile", value) => profile_name = Some(value),
            Op::LongPos(_, value) | Op::Value(value) => name = Some(value),
            _ => args.invalid_operand()?,
        }
    }

    let name = match name {
        Some(name) => name,
        None => err!(ErrorKind::Message("New instance name was not specified."))?,
    };
    let profile = match profile_name {
        Some(profile_name) => match find_profile(profile_name) {
            Some(profile) => Some(profile),
            None => err!(ErrorKind::Config(format!("unknown profile '{profile_name}'")))?,
        },
        None => None,
    };
    let instance = Instance::create(Path::new(*DATA_DIR), name, profile)?;

    if desktop_entry {
        if let Some(entry) = profile.and_then(|p| p.desktop_entry_name) {
            desktop::install(&instance, entry)?;
        }
    }

    println!("Created instance '{}{}{}'.", *BOLD, instance.name(), *RESET);
    Ok(())
}
