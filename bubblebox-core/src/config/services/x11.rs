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

use std::{env::var, fs::read};

use crate::{
    config::service::{OptionInfo, Service, ServiceOptions},
    constants::SANDBOX_HOME,
    err,
    exec::args::Directive,
    Error,
    ErrorKind,
    Result,
};

pub struct X11;

static OPTIONS: [OptionInfo; 0] = [];

impl Service for X11 {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn pretty_name(&self) -> &'static str {
        "X11 display"
    }

    fn description(&self) -> &'static str {
        "X.Org display socket and a private Xauthority copy."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, _options: &ServiceOptions) -> Result<Vec<Directive>> {
        let display = match var("DISPLAY") {
            Ok(display) => display,
            Err(_) => err!(ErrorKind::Config("x11 service enabled but $DISPLAY is unset".into()))?,
        };
        let mut directives = vec![Directive::EnvPassthrough { name: "DISPLAY".into() }];

        // Local displays are ":<n>" or "unix:<n>"; anything else is TCP and
        // needs no socket bind.
        if let Some(number) = display.strip_prefix(':').or_else(|| display.strip_prefix("unix:")) {
            let socket = format!("/tmp/.X11-unix/X{}", number.split('.').next().unwrap_or(number));

            directives.push(Directive::Bind {
                src: socket.clone(),
                dest: socket,
                read_only: true,
                try_only: false,
            });
        }

        if let Ok(xauthority) = var("XAUTHORITY") {
            if let Ok(content) = read(&xauthority) {
                let dest = format!("{SANDBOX_HOME}/.Xauthority");

                directives.push(Directive::FileTransfer {
                    content,
                    dest: dest.clone(),
                });
                directives.push(Directive::EnvSet {
                    name: "XAUTHORITY".into(),
                    value: dest,
                });
            }
        }

        Ok(directives)
    }
}
