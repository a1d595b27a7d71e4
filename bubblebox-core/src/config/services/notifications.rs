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
    config::service::{OptionInfo, Service, ServiceOptions},
    exec::args::{DbusRule, DbusRuleKind, Directive},
    Result,
};

pub struct Notifications;

static OPTIONS: [OptionInfo; 0] = [];

impl Service for Notifications {
    fn name(&self) -> &'static str {
        "notifications"
    }

    fn pretty_name(&self) -> &'static str {
        "Desktop notifications"
    }

    fn description(&self) -> &'static str {
        "Talk access to the host notification daemon."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, _options: &ServiceOptions) -> Result<Vec<Directive>> {
        Ok(vec![Directive::DbusSessionRule(DbusRule::new(
            DbusRuleKind::Talk,
            "org.freedesktop.Notifications",
        ))])
    }
}
