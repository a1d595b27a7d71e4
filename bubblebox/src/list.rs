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
    constants::DATA_DIR,
    instance::list_instances,
    profile::default_profiles,
    utils::{arguments::Operand as Op, Arguments},
    Result,
};

pub fn list(args: &mut Arguments) -> Result<()> {
    match args.next().unwrap_or_default() {
        Op::Nothing | Op::Value("instances") => {
            for name in list_instances(Path::new(*DATA_DIR))? {
                println!("{name}");
            }

            Ok(())
        }
        Op::Value("profiles") => {
            for profile in default_profiles() {
                println!("{}", profile.name);
            }

            Ok(())
        }
        Op::Value("services") => {
            for service in default_catalog() {
                println!("{}", service.name());
            }

            Ok(())
        }
        _ => args.invalid_operand(),
    }
}
