/*
 * bubblebox-helper
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

use std::fmt::{Display, Formatter, Result as FmtResult};

use bubblebox_core::{impl_error, ErrorTrait};

#[derive(Debug)]
pub enum HelperError {
    DirectExecution,
    NoCommand,
}

impl_error!(HelperError);

impl Display for HelperError {
    fn fmt(&self, fmter: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::DirectExecution => write!(fmter, "bubblebox-helper must be started by bubblebox inside a sandbox."),
            Self::NoCommand => write!(fmter, "No command to supervise was provided."),
        }
    }
}
