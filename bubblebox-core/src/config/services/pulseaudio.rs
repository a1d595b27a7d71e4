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
    constants::{HOST_RUNTIME_DIR, SANDBOX_RUNTIME_DIR},
    exec::args::Directive,
    Result,
};

pub struct Pulseaudio;

static OPTIONS: [OptionInfo; 1] = [OptionInfo::new(
    "socket",
    "Socket path",
    "Host PulseAudio socket, if not at the usual location.",
    OptionKind::Str,
)];

impl Service for Pulseaudio {
    fn name(&self) -> &'static str {
        "pulseaudio"
    }

    fn pretty_name(&self) -> &'static str {
        "PulseAudio"
    }

    fn description(&self) -> &'static str {
        "Audio playback and capture through the host PulseAudio daemon."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, options: &ServiceOptions) -> Result<Vec<Directive>> {
        let socket = options
            .string("socket")?
            .unwrap_or_else(|| format!("{}/pulse/native", *HOST_RUNTIME_DIR));
        let dest = format!("{}/pulse/native", *SANDBOX_RUNTIME_DIR);

        Ok(vec![
            Directive::Bind {
                src: socket,
                dest: dest.clone(),
                read_only: true,
                try_only: false,
            },
            Directive::EnvSet {
                name: "PULSE_SERVER".into(),
                value: format!("unix:{dest}"),
            },
        ])
    }
}
