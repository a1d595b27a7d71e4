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

use lazy_static::lazy_static;
use nix::unistd::geteuid;

use crate::{error, Error, ErrorKind};

pub const BWRAP_EXECUTABLE: &str = "bwrap";
pub const DBUS_PROXY_EXECUTABLE: &str = "xdg-dbus-proxy";

pub const FILE_NAME_SERVICES: &str = "services.toml";
pub const FILE_NAME_METADATA: &str = "metadata.toml";

/// Mount point of the helper runtime directory inside every sandbox.
pub const HELPER_MOUNT_DIR: &str = "/run/bubblehelp";
pub const HELPER_SOCKET_NAME: &str = "helper.socket";

/// Every instance home is mounted at the same place inside the sandbox.
pub const SANDBOX_HOME: &str = "/home/user";

const BUBBLEBOX_DATA_DIR: &str = "/.local/share/bubblebox";

#[macro_export]
macro_rules! format_str {
    ( $( $x:expr ),+ ) => {
        format!($( $x, )+).leak()
    };
}

lazy_static! {
    pub static ref UID: u32 = geteuid().as_raw();
    pub static ref HOME: &'static str = env("HOME");
    pub static ref TERM: &'static str = env_opt("TERM");
    pub static ref HELPER_EXECUTABLE: &'static str =
        env_default("BUBBLEBOX_HELPER", "/usr/libexec/bubblebox-helper");
    pub static ref DATA_DIR: &'static str = env_default_dir("BUBBLEBOX_DATA_DIR", BUBBLEBOX_DATA_DIR);
    pub static ref HOST_RUNTIME_DIR: &'static str = host_runtime_dir();
    pub static ref RUNTIME_BASE: &'static str = format_str!("{}/bubblebox", *HOST_RUNTIME_DIR);
    pub static ref LOG_LOCATION: &'static str = format_str!("{}/bubblebox.log", *DATA_DIR);
    pub static ref SANDBOX_RUNTIME_DIR: String = format!("/run/user/{}", *UID);
    pub static ref SANDBOX_DBUS_SESSION_PATH: String = format!("{}/bus", *SANDBOX_RUNTIME_DIR);
    pub static ref IS_COLOR_TERMINAL: bool = is_color_terminal();
    pub static ref BOLD: &'static str = color("\x1b[1m");
    pub static ref RESET: &'static str = color("\x1b[0m");
    pub static ref BOLD_RED: &'static str = color("\x1b[1;31m");
    pub static ref BOLD_GREEN: &'static str = color("\x1b[1;32m");
    pub static ref BOLD_YELLOW: &'static str = color("\x1b[1;33m");
}

fn env(env: &'static str) -> &'static str {
    var(env).map_or_else(|_| error!(ErrorKind::EnvVarUnset(env)).handle(), |var| var.leak())
}

fn env_opt(env: &str) -> &'static str {
    var(env).map_or("", |var| var.leak())
}

fn env_default(env: &str, default: &'static str) -> &'static str {
    var(env).map_or_else(|_| default, |var| var.leak())
}

fn env_default_dir(env: &str, default: &str) -> &'static str {
    var(env).map_or_else(
        |_| match var("XDG_DATA_HOME") {
            Ok(xdg) => format_str!("{}/bubblebox", xdg),
            Err(_) => format_str!("{}{}", *HOME, default),
        },
        |var| var.leak(),
    )
}

fn host_runtime_dir() -> &'static str {
    match var("XDG_RUNTIME_DIR") {
        Ok(dir) => dir.leak(),
        Err(_) => format_str!("/run/user/{}", *UID),
    }
}

fn is_color_terminal() -> bool {
    !TERM.is_empty() && *TERM != "dumb" && var("NO_COLOR").is_err()
}

fn color(code: &'static str) -> &'static str {
    match *IS_COLOR_TERMINAL {
        true => code,
        false => "",
    }
}
