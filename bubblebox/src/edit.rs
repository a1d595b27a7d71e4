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
    instance::Instance,
    utils::Arguments,
    Result,
};

pub fn edit(args: &mut Arguments) -> Result<()> {
    let name = args.target()?;

    Instance::new(Path::new(*DATA_DIR), name)?.edit_config(default_catalog())
}
