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

use std::{
    io::Write,
    os::unix::io::{AsRawFd, RawFd},
};

use nix::fcntl::{fcntl, FcntlArg, OFlag};
use os_pipe::{PipeReader, PipeWriter};

use crate::{err, Error, ErrorKind, Result};

/// Owner of every file descriptor that must survive until the sandbox
/// helper has inherited it: staged file content, the options list, the
/// seccomp program, and the D-Bus ready pipe.
///
/// bwrap reads `--args`, `--file` and `--seccomp` descriptors to EOF, so
/// content is staged into a pipe whose write end is closed once the payload
/// is in the kernel buffer. Payloads here are far below the pipe capacity.
pub struct FdArena {
    readers: Vec<PipeReader>,
    writers: Vec<PipeWriter>,
}

impl FdArena {
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Stage `content` behind a descriptor; reading the returned fd yields
    /// the content followed by EOF.
    pub fn add_temp(&mut self, content: &[u8]) -> Result<RawFd> {
        let (reader, mut writer) = match os_pipe::pipe() {
            Ok(pipe) => pipe,
            Err(error) => err!(ErrorKind::IOError("pipe".into(), error.kind()))?,
        };

        if let Err(error) = writer.write_all(content) {
            err!(ErrorKind::IOError("pipe".into(), error.kind()))?
        }

        let fd = reader.as_raw_fd();

        self.readers.push(reader);
        Ok(fd)
    }

    /// A notification pipe. The read side is switched to non-blocking so a
    /// poll loop can distinguish "no data yet" from EOF; both ends stay open
    /// until the arena is dropped.
    pub fn add_pipe(&mut self) -> Result<(RawFd, RawFd)> {
        let (reader, writer) = match os_pipe::pipe() {
            Ok(pipe) => pipe,
            Err(error) => err!(ErrorKind::IOError("pipe".into(), error.kind()))?,
        };
        let read_fd = reader.as_raw_fd();
        let write_fd = writer.as_raw_fd();

        let flags = match fcntl(read_fd, FcntlArg::F_GETFL) {
            Ok(flags) => OFlag::from_bits_truncate(flags),
            Err(_) => err!(ErrorKind::Message("failed to read notification pipe flags"))?,
        };

        if fcntl(read_fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK)).is_err() {
            err!(ErrorKind::Message("failed to make the notification pipe non-blocking"))?
        }

        self.readers.push(reader);
        self.writers.push(writer);
        Ok((read_fd, write_fd))
    }

    /// Snapshot of every owned descriptor, to be marked inheritable on the
    /// child spawn.
    pub fn inheritable_fds(&self) -> Vec<RawFd> {
        self.readers
            .iter()
            .map(|r| r.as_raw_fd())
            .chain(self.writers.iter().map(|w| w.as_raw_fd()))
            .collect()
    }
}

impl Default for FdArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    fn temp_content_readable_to_eof() {
        let mut arena = FdArena::new();
        let fd = arena.add_temp(b"hello arena").unwrap();

        // Claim the reader back out of the arena to observe the content.
        let mut reader = arena.readers.pop().unwrap();
        assert_eq!(reader.as_raw_fd(), fd);

        let mut content = Vec::new();
        reader.read_to_end(&mut content).unwrap();
        assert_eq!(content, b"hello arena");
    }

    #[test]
    fn pipe_read_side_is_nonblocking() {
        let mut arena = FdArena::new();
        let (read_fd, _write_fd) = arena.add_pipe().unwrap();

        let flags = OFlag::from_bits_truncate(fcntl(read_fd, FcntlArg::F_GETFL).unwrap());
        assert!(flags.contains(OFlag::O_NONBLOCK));
    }

    #[test]
    fn snapshot_lists_every_descriptor() {
        let mut arena = FdArena::new();
        let temp_fd = arena.add_temp(b"x").unwrap();
        let (read_fd, write_fd) = arena.add_pipe().unwrap();

        let fds = arena.inheritable_fds();
        assert!(fds.contains(&temp_fd));
        assert!(fds.contains(&read_fd));
        assert!(fds.contains(&write_fd));
    }
}
