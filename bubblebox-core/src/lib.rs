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

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::constants::{BOLD, RESET};

pub mod config;
pub mod constants;
pub mod error;
pub mod exec;
pub mod homeplugin;
pub mod instance;
pub mod log;
pub mod profile;
pub mod rpc;
pub mod utils;

pub use error::*;

#[derive(Debug)]
pub enum ErrorKind {
    Config(String),
    AlreadyRunning(String),
    NotRunning(String),
    DbusProxyTimeout,
    DbusProxyExited(i32),
    SandboxFailed(i32),
    RpcTimeout,
    RpcProtocol(String),
    InstanceMissing(String),
    InstanceExists(String),
    EnvVarUnset(&'static str),
    ProcessInitFailure(&'static str, std::io::ErrorKind),
    ProcessWaitFailure(&'static str, std::io::ErrorKind),
    IOError(String, std::io::ErrorKind),
    Message(&'static str),
}

impl Display for ErrorKind {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Config(err) => write!(fmter, "Invalid configuration: {err}"),
            Self::AlreadyRunning(ins) => write!(fmter, "Instance '{}{ins}{}' is already running.", *BOLD, *RESET),
            Self::NotRunning(ins) => write!(fmter, "Instance '{}{ins}{}' is not running.", *BOLD, *RESET),
            Self::DbusProxyTimeout => write!(fmter, "D-Bus proxy did not signal readiness in time."),
            Self::DbusProxyExited(code) => write!(fmter, "D-Bus proxy exited prematurely with code {code}."),
            Self::SandboxFailed(code) => write!(
                fmter,
                "bubblewrap exited with code {code}. Try running the instance in a terminal to see the exact error."
            ),
            Self::RpcTimeout => write!(fmter, "Timed out waiting for a reply from the sandbox helper."),
            Self::RpcProtocol(err) => write!(fmter, "Malformed reply from the sandbox helper: {err}"),
            Self::InstanceMissing(ins) => write!(fmter, "Instance '{}{ins}{}' not found.", *BOLD, *RESET),
            Self::InstanceExists(ins) => write!(fmter, "Instance '{}{ins}{}' already exists.", *BOLD, *RESET),
            Self::EnvVarUnset(var) => write!(fmter, "${}{var}{} is unset.", *BOLD, *RESET),
            Self::ProcessInitFailure(exec, err) => write!(fmter, "Unable to initialize '{exec}': {err}"),
            Self::ProcessWaitFailure(exec, err) => write!(fmter, "Unable to wait on '{exec}': {err}"),
            Self::IOError(path, error) => write!(fmter, "'{path}': {error}"),
            Self::Message(err) => write!(fmter, "{err}"),
        }
    }
}

impl ErrorTrait for ErrorKind {
    fn code(&self) -> i32 {
        match self {
            Self::SandboxFailed(code) => *code,
            Self::IOError(..) => 2,
            _ => 1,
        }
    }
}
