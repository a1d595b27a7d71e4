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

use std::{fs, path::Path};

use bubblebox_core::{
    constants::{DATA_DIR, HOME},
    err,
    instance::{Instance, METADATA_KEY_DESKTOP_ENTRY, METADATA_KEY_PROFILE},
    profile::find_profile,
    utils::{arguments::Operand as Op, Arguments},
    Error,
    ErrorGeneric,
    ErrorKind,
    Result,
};

/// `generate-desktop-entry [--profile P] [--desktop-entry N] <instance>`
pub fn generate(args: &mut Arguments) -> Result<()> {
    let mut profile_name = None;
    let mut entry_name = None;
    let mut instance_name = None;

    while let Some(op) = args.next() {
        match op {
            Op::Long("profile") | Op::Long("desktop-entry") => (),
            Op::LongPos("profile", value) => profile_name = Some(value.to_owned()),
            Op::LongPos("desktop-entry", value) => entry_name = Some(value.to_owned()),
            Op::LongPos(_, value) | Op::Value(value) => instance_name = Some(value),
            _ => args.invalid_operand()?,
        }
    }

    let name = match instance_name {
        Some(name) => name,
        None => err!(ErrorKind::Message("Instance to generate a desktop entry for was not specified."))?,
    };
    let instance = Instance::new(Path::new(*DATA_DIR), name)?;

    // Fall back to the profile recorded at creation time.
    let profile_name = match profile_name {
        Some(profile_name) => Some(profile_name),
        None => instance.metadata_value(METADATA_KEY_PROFILE)?,
    };
    let entry = match entry_name {
        Some(entry) => entry,
        None => match profile_name.as_deref().and_then(find_profile).and_then(|p| p.desktop_entry_name) {
            Some(entry) => entry.to_owned(),
            None => instance.name().to_owned(),
        },
    };

    install(&instance, &entry)
}

/// Write a desktop entry wrapping `bubblebox run <instance>` into the
/// user's application directory and record it in the instance metadata.
pub fn install(instance: &Instance, entry_name: &str) -> Result<()> {
    let applications = format!("{}/.local/share/applications", *HOME);
    let file_name = format!("bubblebox-{}.desktop", instance.name());
    let path = format!("{applications}/{file_name}");
    let contents = format!(
        "[Desktop Entry]\n\
         Type=Application\n\
         Name={entry_name} (bubblebox)\n\
         Exec=bubblebox run {}\n\
         Terminal=false\n",
        instance.name()
    );

    fs::create_dir_all(&applications).prepend_io(|| applications.clone())?;
    fs::write(&path, contents).prepend_io(|| path.clone())?;
    instance.set_metadata_value(METADATA_KEY_DESKTOP_ENTRY, &file_name)?;
    Ok(())
}
