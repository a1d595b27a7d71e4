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

use std::{
    env,
    io::{BufRead, BufReader, Write},
    os::unix::{
        net::{UnixListener, UnixStream},
        process::ExitStatusExt,
    },
    path::Path,
    process::{exit, Command, Stdio},
    thread,
};

use nix::{
    sys::signal::{kill, Signal},
    unistd::Pid,
};
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};

use bubblebox_core::{
    constants::{HELPER_MOUNT_DIR, HELPER_SOCKET_NAME},
    err,
    rpc::{RpcRequest, RpcResponse},
    utils::print_warning,
    Error,
    ErrorKind,
    Result,
};

use crate::error::HelperError;

/// Pid-1 inside the sandbox: supervise the user program, serve run
/// requests on the helper socket, and fan SIGTERM out to everything else
/// in the pid namespace.
pub fn serve() -> Result<()> {
    if !Path::new(HELPER_MOUNT_DIR).is_dir() {
        err!(HelperError::DirectExecution)?
    }

    let mut args: Vec<String> = env::args().skip(1).collect();

    // Debug shells replace the configured program outright.
    if args.first().map(|a| a == "--shell").unwrap_or(false) {
        args = vec!["/bin/sh".into()];
    }

    if args.is_empty() {
        err!(HelperError::NoCommand)?
    }

    install_signal_fanout();

    let socket_path = Path::new(HELPER_MOUNT_DIR).join(HELPER_SOCKET_NAME);

    match UnixListener::bind(&socket_path) {
        Ok(listener) => {
            let _ = thread::Builder::new()
                .name("bubblehelp-accept".into())
                .spawn(move || accept_loop(listener));
        }
        Err(error) => err!(ErrorKind::IOError(socket_path.to_string_lossy().into(), error.kind()))?,
    }

    let mut child = match Command::new(&args[0]).args(&args[1 ..]).spawn() {
        Ok(child) => child,
        Err(error) => err!(ErrorKind::ProcessInitFailure("sandboxed command", error.kind()))?,
    };
    let status = match child.wait() {
        Ok(status) => status,
        Err(error) => err!(ErrorKind::ProcessWaitFailure("sandboxed command", error.kind()))?,
    };

    // The sandbox lives exactly as long as pid-1; hand the program's exit
    // code to bwrap.
    exit(status.code().unwrap_or_else(|| 128 + status.signal().unwrap_or(0)))
}

/*
 * kill(-1) from pid-1 signals every other process in the namespace but not
 * pid-1 itself, so the fanout thread survives long enough for the main
 * thread to observe the children exiting.
 */
fn install_signal_fanout() {
    match Signals::new([SIGTERM, SIGINT]) {
        Ok(mut signals) => {
            let _ = thread::Builder::new().name("bubblehelp-signal".into()).spawn(move || {
                for _ in signals.forever() {
                    let _ = kill(Pid::from_raw(-1), Signal::SIGTERM);
                }
            });
        }
        Err(error) => print_warning(&format!("failed to install signal handling: {error}")),
    }
}

fn accept_loop(listener: UnixListener) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let _ = thread::Builder::new()
                    .name("bubblehelp-rpc".into())
                    .spawn(move || handle_client(stream));
            }
            Err(error) => print_warning(&format!("helper socket accept failed: {error}")),
        }
    }
}

fn handle_client(mut stream: UnixStream) {
    let reader = match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    };
    let mut line = String::new();

    if BufReader::new(reader).read_line(&mut line).is_err() {
        return;
    }

    let request = match RpcRequest::from_json_line(line.trim_end()) {
        Ok(request) => request,
        Err(error) => {
            print_warning(&format!("malformed run request: {error}"));
            return;
        }
    };

    if request.args_to_run.is_empty() {
        return;
    }

    let mut command = Command::new(&request.args_to_run[0]);

    command.args(&request.args_to_run[1 ..]);

    if request.wait_response {
        let response = match command.output() {
            Ok(output) => RpcResponse {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Err(error) => RpcResponse {
                stdout: String::new(),
                stderr: error.to_string(),
                exit_code: -1,
            },
        };

        if let Ok(line) = response.to_json_byte_line() {
            let _ = stream.write_all(&line);
        }

        return;
    }

    match command.stdin(Stdio::null()).spawn() {
        Ok(mut child) => {
            // Detached requests still get reaped.
            let _ = thread::Builder::new().name("bubblehelp-reap".into()).spawn(move || {
                let _ = child.wait();
            });
        }
        Err(error) => print_warning(&format!("failed to start requested command: {error}")),
    }
}
