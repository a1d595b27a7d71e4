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

use std::env::var;

use crate::{
    config::service::{OptionInfo, Service, ServiceOptions},
    constants::{HOST_RUNTIME_DIR, SANDBOX_RUNTIME_DIR},
    err,
    exec::args::Directive,
    Error,
    ErrorKind,
    Result,
};

pub struct Wayland;

static OPTIONS: [OptionInfo; 0] = [];

impl Service for Wayland {
    fn name(&self) -> &'static str {
        "wayland"
    }

    fn pretty_name(&self) -> &'static str {
        "Wayland display"
    }

    fn description(&self) -> &'static str {
        "Wayland compositor socket."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, _options: &ServiceOptions) -> Result<Vec<Directive>> {
        let display = match var("WAYLAND_DISPLAY") {
            Ok(display) => display,
            Err(_) => err!(ErrorKind::Config("wayland service enabled but $WAYLAND_DISPLAY is unset".into()))?,
        };

        Ok(vec![
            Directive::Bind {
                src: format!("{}/{display}", *HOST_RUNTIME_DIR),
                dest: format!("{}/wayland-0", *SANDBOX_RUNTIME_DIR),
                read_only: true,
                try_only: false,
            },
            Directive::EnvSet {
                name: "WAYLAND_DISPLAY".into(),
                value: "wayland-0".into(),
            },
        ])
    }
}
