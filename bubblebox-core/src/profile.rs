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

use toml::Value;

use crate::config::ServiceConfig;

/// A named seed for new instances: the default service set plus an optional
/// desktop entry to install.
pub struct Profile {
    pub name: &'static str,
    pub description: &'static str,
    pub desktop_entry_name: Option<&'static str>,
    services: fn() -> ServiceConfig,
}

impl Profile {
    pub fn service_config(&self) -> ServiceConfig {
        (self.services)()
    }
}

static PROFILES: [Profile; 3] = [
    Profile {
        name: "generic",
        description: "Empty sandbox with only the common baseline.",
        desktop_entry_name: None,
        services: generic,
    },
    Profile {
        name: "firefox",
        description: "Mozilla Firefox with display, audio and network access.",
        desktop_entry_name: Some("firefox"),
        services: firefox,
    },
    Profile {
        name: "chromium",
        description: "Chromium with display, audio and network access.",
        desktop_entry_name: Some("chromium"),
        services: chromium,
    },
];

pub fn default_profiles() -> &'static [Profile] {
    &PROFILES
}

pub fn find_profile(name: &str) -> Option<&'static Profile> {
    PROFILES.iter().find(|p| p.name == name)
}

fn generic() -> ServiceConfig {
    let mut config = ServiceConfig::new();

    let _ = config.enable("common");
    config
}

fn browser(executable: &str) -> ServiceConfig {
    let mut config = ServiceConfig::new();

    config.set_option("common", "executable_name", Value::String(executable.into()));
    config.set_option("network", "share_network", Value::Boolean(true));
    let _ = config.enable("x11");
    let _ = config.enable("pulseaudio");
    let _ = config.enable("notifications");
    let _ = config.enable("hardened");
    config
}

fn firefox() -> ServiceConfig {
    browser("firefox")
}

fn chromium() -> ServiceConfig {
    browser("chromium")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_catalog;

    #[test]
    fn profile_configs_validate_against_the_catalog() {
        for profile in default_profiles() {
            let dumped = profile.service_config().to_toml_string().unwrap();

            ServiceConfig::from_toml_str(&dumped, default_catalog())
                .unwrap_or_else(|_| panic!("profile '{}' does not validate", profile.name));
        }
    }

    #[test]
    fn firefox_profile_sets_the_executable() {
        let dumped = find_profile("firefox").unwrap().service_config().to_toml_string().unwrap();

        assert!(dumped.contains("executable_name = \"firefox\""));
    }
}
