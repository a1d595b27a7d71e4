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

use crate::config::service::Service;

use self::{
    common::Common,
    hardened::Hardened,
    network::Network,
    notifications::Notifications,
    pulseaudio::Pulseaudio,
    wayland::Wayland,
    x11::X11,
};

mod common;
mod hardened;
mod network;
mod notifications;
mod pulseaudio;
mod wayland;
mod x11;

static CATALOG: [&dyn Service; 7] = [&Common, &Network, &X11, &Wayland, &Pulseaudio, &Notifications, &Hardened];

/// The built-in service catalog. Callers hold it as a plain slice so tests
/// and alternative front-ends can substitute their own.
pub fn default_catalog() -> &'static [&'static dyn Service] {
    &CATALOG
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SERVICE;

    #[test]
    fn catalog_contains_the_default_service() {
        assert!(default_catalog().iter().any(|s| s.name() == DEFAULT_SERVICE));
    }

    #[test]
    fn catalog_names_are_unique() {
        let mut names: Vec<&str> = default_catalog().iter().map(|s| s.name()).collect();

        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), default_catalog().len());
    }
}
