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

use toml::{Table, Value};

use crate::{err, exec::args::Directive, Error, ErrorKind, Result};

/// A reusable bundle of sandbox directives.
///
/// Services are pure: for a given option table they deterministically yield
/// the same directive sequence. Side effects around a running sandbox go
/// through the post-init and post-shutdown hooks instead.
pub trait Service: Sync {
    fn name(&self) -> &'static str;
    fn pretty_name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn options(&self) -> &'static [OptionInfo];
    fn directives(&self, options: &ServiceOptions) -> Result<Vec<Directive>>;

    /// Called with the sandboxed pid-1 once it is observable.
    fn post_init_hook(&self, _pid: i32, _options: &ServiceOptions) -> Result<()> {
        Ok(())
    }

    /// Called after the sandbox has exited, before host resources are freed.
    fn post_shutdown_hook(&self, _options: &ServiceOptions) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OptionKind {
    Bool,
    Str,
    /// Stored as a single string, exposed as whitespace-separated tokens.
    SpaceSeparated,
    StrList,
}

/// Declared metadata of one service option.
pub struct OptionInfo {
    pub name: &'static str,
    pub pretty_name: &'static str,
    pub description: &'static str,
    pub kind: OptionKind,
}

/// Projection of an option value for the graphical editor.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiValue {
    Toggle(bool),
    Text(String),
    List(Vec<String>),
}

impl OptionInfo {
    pub const fn new(name: &'static str, pretty_name: &'static str, description: &'static str, kind: OptionKind) -> Self {
        Self {
            name,
            pretty_name,
            description,
            kind,
        }
    }

    pub fn gui_value(&self, options: &ServiceOptions) -> Result<GuiValue> {
        Ok(match self.kind {
            OptionKind::Bool => GuiValue::Toggle(options.bool(self.name, false)?),
            OptionKind::Str => GuiValue::Text(options.string(self.name)?.unwrap_or_default()),
            OptionKind::SpaceSeparated => GuiValue::List(options.space_separated(self.name)?),
            OptionKind::StrList => GuiValue::List(options.string_list(self.name)?),
        })
    }

    /// Store a GUI value back under this option's canonical key.
    pub fn write(&self, table: &mut Table, value: GuiValue) {
        let value = match (self.kind, value) {
            (OptionKind::Bool, GuiValue::Toggle(b)) => Value::Boolean(b),
            (OptionKind::SpaceSeparated, GuiValue::List(list)) => Value::String(list.join(" ")),
            (OptionKind::StrList, GuiValue::List(list)) => Value::Array(list.into_iter().map(Value::String).collect()),
            (_, GuiValue::Text(s)) => Value::String(s),
            (_, GuiValue::Toggle(b)) => Value::Boolean(b),
            (_, GuiValue::List(list)) => Value::String(list.join(" ")),
        };

        let _ = table.insert(self.name.into(), value);
    }
}

/// Typed, validating view over a service's raw option table.
pub struct ServiceOptions<'a> {
    service: &'a str,
    table: &'a Table,
}

impl<'a> ServiceOptions<'a> {
    pub fn new(service: &'a str, table: &'a Table) -> Self {
        Self { service, table }
    }

    pub fn bool(&self, name: &str, default: bool) -> Result<bool> {
        match self.table.get(name) {
            Some(Value::Boolean(b)) => Ok(*b),
            Some(_) => self.mistyped(name, "a boolean"),
            None => Ok(default),
        }
    }

    pub fn string(&self, name: &str) -> Result<Option<String>> {
        match self.table.get(name) {
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => self.mistyped(name, "a string"),
            None => Ok(None),
        }
    }

    pub fn space_separated(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .string(name)?
            .unwrap_or_default()
            .split_whitespace()
            .map(String::from)
            .collect())
    }

    pub fn string_list(&self, name: &str) -> Result<Vec<String>> {
        match self.table.get(name) {
            Some(Value::Array(values)) => values
                .iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s.clone()),
                    _ => self.mistyped(name, "a list of strings"),
                })
                .collect(),
            Some(_) => self.mistyped(name, "a list of strings"),
            None => Ok(Vec::new()),
        }
    }

    /// Type-check one declared option without consuming its value.
    pub fn validate(&self, info: &OptionInfo) -> Result<()> {
        match info.kind {
            OptionKind::Bool => self.bool(info.name, false).map(|_| ()),
            OptionKind::Str | OptionKind::SpaceSeparated => self.string(info.name).map(|_| ()),
            OptionKind::StrList => self.string_list(info.name).map(|_| ()),
        }
    }

    fn mistyped<T>(&self, name: &str, expected: &str) -> Result<T> {
        err!(ErrorKind::Config(format!(
            "service '{}': option '{name}' must be {expected}",
            self.service
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(contents: &str) -> Table {
        toml::from_str(contents).unwrap()
    }

    #[test]
    fn typed_accessors() {
        let table = table("flag = true\nname = \"weasel\"\ncmd = \"firefox --safe-mode\"\nlist = [\"a\", \"b\"]\n");
        let options = ServiceOptions::new("test", &table);

        assert!(options.bool("flag", false).unwrap());
        assert!(options.bool("missing", true).unwrap());
        assert_eq!(options.string("name").unwrap().unwrap(), "weasel");
        assert_eq!(options.space_separated("cmd").unwrap(), vec!["firefox", "--safe-mode"]);
        assert_eq!(options.string_list("list").unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn mistyped_value_reports_config_error() {
        let table = table("flag = \"yes\"\n");
        let options = ServiceOptions::new("test", &table);
        let error = options.bool("flag", false).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::Config(_))));
    }

    #[test]
    fn gui_projection_round_trip() {
        let info = OptionInfo::new("cmd", "Command", "Command to run", OptionKind::SpaceSeparated);
        let mut table = table("cmd = \"firefox --safe-mode\"\n");

        let value = info.gui_value(&ServiceOptions::new("test", &table)).unwrap();
        assert_eq!(value, GuiValue::List(vec!["firefox".into(), "--safe-mode".into()]));

        info.write(&mut table, value);
        assert_eq!(table.get("cmd").unwrap().as_str().unwrap(), "firefox --safe-mode");
    }
}
