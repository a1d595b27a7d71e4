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

use std::path::{Path, PathBuf};

use crate::{utils::print_warning, Result};

/// A scoped modifier of an instance's home directory, active only for the
/// duration of a run. `exit` runs for every plugin whose `enter` succeeded,
/// in reverse order, regardless of how the run ended.
pub trait HomePlugin: Sync {
    fn name(&self) -> &'static str;
    fn enter(&self, home: &Path) -> Result<()>;
    fn exit(&self, home: &Path) -> Result<()>;
}

/// Guard over the plugins entered for one run.
pub struct HomePluginStack<'a> {
    home: PathBuf,
    entered: Vec<&'a dyn HomePlugin>,
}

impl<'a> HomePluginStack<'a> {
    /// Enter every plugin in order. If one fails, the ones already entered
    /// are unwound before the error is returned.
    pub fn enter_all(home: &Path, plugins: &[&'a dyn HomePlugin]) -> Result<Self> {
        let mut stack = Self {
            home: home.into(),
            entered: Vec::new(),
        };

        for plugin in plugins {
            if let Err(error) = plugin.enter(home) {
                stack.unwind();
                return Err(error);
            }

            stack.entered.push(*plugin);
        }

        Ok(stack)
    }

    /// Reverse-order exit; failures are reported, never raised.
    pub fn exit_all(mut self) {
        self.unwind();
    }

    fn unwind(&mut self) {
        while let Some(plugin) = self.entered.pop() {
            if let Err(error) = plugin.exit(&self.home) {
                print_warning(&format!("home plugin '{}' failed to exit: {}", plugin.name(), error));
            }
        }
    }
}

impl Drop for HomePluginStack<'_> {
    fn drop(&mut self) {
        self.unwind();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{err, Error, ErrorKind};

    struct Recording {
        tag: &'static str,
        log: &'static Mutex<Vec<String>>,
        fail_enter: bool,
    }

    impl HomePlugin for Recording {
        fn name(&self) -> &'static str {
            self.tag
        }

        fn enter(&self, _home: &Path) -> Result<()> {
            if self.fail_enter {
                err!(ErrorKind::Message("enter failed"))?
            }

            self.log.lock().unwrap().push(format!("enter {}", self.tag));
            Ok(())
        }

        fn exit(&self, _home: &Path) -> Result<()> {
            self.log.lock().unwrap().push(format!("exit {}", self.tag));
            Ok(())
        }
    }

    #[test]
    fn exits_run_in_reverse_order() {
        static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let first = Recording {
            tag: "first",
            log: &LOG,
            fail_enter: false,
        };
        let second = Recording {
            tag: "second",
            log: &LOG,
            fail_enter: false,
        };

        let stack = HomePluginStack::enter_all(Path::new("/tmp"), &[&first, &second]).unwrap();
        stack.exit_all();

        assert_eq!(*LOG.lock().unwrap(), vec!["enter first", "enter second", "exit second", "exit first"]);
    }

    #[test]
    fn failed_enter_unwinds_the_entered_prefix() {
        static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

        let good = Recording {
            tag: "good",
            log: &LOG,
            fail_enter: false,
        };
        let bad = Recording {
            tag: "bad",
            log: &LOG,
            fail_enter: true,
        };

        assert!(HomePluginStack::enter_all(Path::new("/tmp"), &[&good, &bad]).is_err());
        assert_eq!(*LOG.lock().unwrap(), vec!["enter good", "exit good"]);
    }
}
