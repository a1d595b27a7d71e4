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
    exec::args::Directive,
    Result,
};

pub struct Network;

static OPTIONS: [OptionInfo; 1] = [OptionInfo::new(
    "share_network",
    "Share host network",
    "Keep the host network namespace reachable instead of an isolated one.",
    OptionKind::Bool,
)];

impl Service for Network {
    fn name(&self) -> &'static str {
        "network"
    }

    fn pretty_name(&self) -> &'static str {
        "Network"
    }

    fn description(&self) -> &'static str {
        "Host network access, plus DNS resolver state."
    }

    fn options(&self) -> &'static [OptionInfo] {
        &OPTIONS
    }

    fn directives(&self, options: &ServiceOptions) -> Result<Vec<Directive>> {
        if !options.bool("share_network", true)? {
            return Ok(Vec::new());
        }

        Ok(vec![
            Directive::ShareNet,
            Directive::Bind {
                src: "/etc/resolv.conf".into(),
                dest: "/etc/resolv.conf".into(),
                read_only: true,
                try_only: true,
            },
        ])
    }
}

#[cfg(test)]
mod tests {
    use toml::Table;

    use super::*;

    #[test]
    fn enabled_by_default_when_the_service_is_present() {
        let table = Table::new();
        let directives = Network.directives(&ServiceOptions::new("network", &table)).unwrap();

        assert!(directives.contains(&Directive::ShareNet));
    }

    #[test]
    fn share_network_false_suppresses_everything() {
        let table: Table = toml::from_str("share_network = false\n").unwrap();
        let directives = Network.directives(&ServiceOptions::new("network", &table)).unwrap();

        assert!(directives.is_empty());
    }
}
