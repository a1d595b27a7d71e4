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

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::Table;

use crate::{config::service::Service, err, Error, ErrorKind, Result};

pub use self::{
    service::{GuiValue, OptionInfo, OptionKind, ServiceOptions},
    services::default_catalog,
};

pub mod service;
pub mod services;

/// The service whose directives every instance receives, present in the
/// configuration file or not.
pub const DEFAULT_SERVICE: &str = "common";

/// The set of enabled services and their options, as persisted in an
/// instance's `services.toml`: one top-level table per enabled service.
///
/// Option keys the catalog does not know are kept as-is so that a load
/// followed by a dump is lossless.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
#[serde(transparent)]
pub struct ServiceConfig {
    services: IndexMap<String, Table>,
}

/// One enabled service paired with its (possibly empty) option table.
pub struct ServiceEntry {
    pub service: &'static dyn Service,
    pub options: Table,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate against `catalog`. Service names must be known;
    /// options the catalog declares must carry the declared type. Unknown
    /// option keys pass through untouched.
    pub fn from_toml_str(contents: &str, catalog: &[&'static dyn Service]) -> Result<Self> {
        let config: Self = match toml::from_str(contents) {
            Ok(config) => config,
            Err(error) => err!(ErrorKind::Config(error.to_string()))?,
        };

        for (name, options) in &config.services {
            let service = match catalog.iter().find(|s| s.name() == *name) {
                Some(service) => *service,
                None => err!(ErrorKind::Config(format!("unknown service '{name}'")))?,
            };
            let options = ServiceOptions::new(service.name(), options);

            for info in service.options() {
                options.validate(info)?;
            }
        }

        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        match toml::to_string(self) {
            Ok(contents) => Ok(contents),
            Err(error) => err!(ErrorKind::Config(error.to_string())),
        }
    }

    /// Enable `service`, keeping any options already set for it.
    pub fn enable(&mut self, service: &str) -> &mut Table {
        self.services.entry(service.into()).or_default()
    }

    pub fn set_option(&mut self, service: &str, option: &str, value: toml::Value) {
        let _ = self.enable(service).insert(option.into(), value);
    }

    pub fn is_enabled(&self, service: &str) -> bool {
        service == DEFAULT_SERVICE || self.services.contains_key(service)
    }

    /// Enabled services in declaration order, the default service first.
    /// With `include_disabled`, the rest of the catalog follows with empty
    /// option tables (used by the listing and editing front-ends).
    pub fn iter_services(&self, catalog: &[&'static dyn Service], include_disabled: bool) -> Vec<ServiceEntry> {
        let mut entries = Vec::new();

        for service in catalog {
            let enabled = self.is_enabled(service.name());

            if !enabled && !include_disabled {
                continue;
            }

            entries.push(ServiceEntry {
                service: *service,
                options: self.services.get(service.name()).cloned().unwrap_or_default(),
            });
        }

        // Config-declared order for everything behind the default service.
        entries.sort_by_key(|e| match e.service.name() == DEFAULT_SERVICE {
            true => 0,
            false => self.services.get_index_of(e.service.name()).map_or(usize::MAX, |i| i + 1),
        });
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[common]
executable_name = "firefox"

[network]
share_network = true

[x11]
"#;

    #[test]
    fn round_trip_is_idempotent() {
        let catalog = default_catalog();
        let first = ServiceConfig::from_toml_str(SAMPLE, catalog).unwrap();
        let dumped = first.to_toml_string().unwrap();
        let second = ServiceConfig::from_toml_str(&dumped, catalog).unwrap();

        assert_eq!(first, second);
        assert_eq!(dumped, second.to_toml_string().unwrap());
    }

    #[test]
    fn unknown_option_keys_survive_round_trip() {
        let catalog = default_catalog();
        let config = ServiceConfig::from_toml_str("[network]\nfuture_option = \"kept\"\n", catalog).unwrap();
        let dumped = config.to_toml_string().unwrap();

        assert!(dumped.contains("future_option"));
    }

    #[test]
    fn unknown_service_is_rejected() {
        let error = ServiceConfig::from_toml_str("[teleporter]\n", default_catalog()).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::Config(_))));
    }

    #[test]
    fn mistyped_option_is_rejected() {
        let error = ServiceConfig::from_toml_str("[network]\nshare_network = \"yes\"\n", default_catalog()).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::Config(_))));
    }

    #[test]
    fn default_service_always_enabled_and_first() {
        let config = ServiceConfig::from_toml_str("[network]\n", default_catalog()).unwrap();
        let entries = config.iter_services(default_catalog(), false);

        assert_eq!(entries[0].service.name(), DEFAULT_SERVICE);
        assert!(entries.iter().any(|e| e.service.name() == "network"));
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let error = ServiceConfig::from_toml_str("not toml [", default_catalog()).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::Config(_))));
    }
}
