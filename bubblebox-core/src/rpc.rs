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
    io::{BufRead, BufReader, ErrorKind as IoErrorKind, Write},
    os::unix::net::UnixStream,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{err, Error, ErrorKind, Result};

/// Deadline for the helper's reply when a response was requested.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

/// One run request on the helper socket: a single JSON document terminated
/// by a newline.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct RpcRequest {
    pub args_to_run: Vec<String>,
    pub wait_response: bool,
}

/// Reply to a `wait_response` request, same framing.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone)]
pub struct RpcResponse {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl RpcRequest {
    pub fn new(args_to_run: Vec<String>, wait_response: bool) -> Self {
        Self {
            args_to_run,
            wait_response,
        }
    }

    pub fn to_json_byte_line(&self) -> Result<Vec<u8>> {
        match serde_json::to_vec(self) {
            Ok(mut line) => {
                line.push(b'\n');
                Ok(line)
            }
            Err(error) => err!(ErrorKind::RpcProtocol(error.to_string())),
        }
    }

    pub fn from_json_line(line: &str) -> Result<Self> {
        match serde_json::from_str(line) {
            Ok(request) => Ok(request),
            Err(error) => err!(ErrorKind::RpcProtocol(error.to_string())),
        }
    }
}

impl RpcResponse {
    pub fn to_json_byte_line(&self) -> Result<Vec<u8>> {
        match serde_json::to_vec(self) {
            Ok(mut line) => {
                line.push(b'\n');
                Ok(line)
            }
            Err(error) => err!(ErrorKind::RpcProtocol(error.to_string())),
        }
    }

    pub fn from_json_line(line: &str) -> Result<Self> {
        match serde_json::from_str(line) {
            Ok(response) => Ok(response),
            Err(error) => err!(ErrorKind::RpcProtocol(error.to_string())),
        }
    }
}

/// Client side of the in-sandbox helper socket.
pub struct HelperRpcClient {
    instance: String,
    socket_path: PathBuf,
}

impl HelperRpcClient {
    pub fn new(instance: &str, socket_path: &Path) -> Self {
        Self {
            instance: instance.into(),
            socket_path: socket_path.into(),
        }
    }

    /// Issue a run request. Returns the decoded reply when `wait_response`
    /// was set, `None` otherwise.
    pub fn send_run(&self, args_to_run: Vec<String>, wait_response: bool) -> Result<Option<RpcResponse>> {
        let mut stream = match UnixStream::connect(&self.socket_path) {
            Ok(stream) => stream,
            Err(_) => err!(ErrorKind::NotRunning(self.instance.clone()))?,
        };
        let request = RpcRequest::new(args_to_run, wait_response);

        if let Err(error) = stream.write_all(&request.to_json_byte_line()?) {
            err!(ErrorKind::IOError(self.socket_path.to_string_lossy().into(), error.kind()))?
        }

        if !wait_response {
            return Ok(None);
        }

        if let Err(error) = stream.set_read_timeout(Some(RESPONSE_TIMEOUT)) {
            err!(ErrorKind::IOError(self.socket_path.to_string_lossy().into(), error.kind()))?
        }

        let mut line = String::new();

        match BufReader::new(stream).read_line(&mut line) {
            Ok(0) => err!(ErrorKind::RpcProtocol("helper closed the connection".into())),
            Ok(_) => Ok(Some(RpcResponse::from_json_line(line.trim_end())?)),
            Err(error) => match error.kind() {
                IoErrorKind::WouldBlock | IoErrorKind::TimedOut => err!(ErrorKind::RpcTimeout),
                _ => err!(ErrorKind::IOError(self.socket_path.to_string_lossy().into(), error.kind())),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{env::temp_dir, fs::remove_file, os::unix::net::UnixListener, process::id, thread};

    use super::*;

    #[test]
    fn request_framing_round_trip() {
        let request = RpcRequest::new(vec!["/bin/echo".into(), "hello".into()], true);
        let line = request.to_json_byte_line().unwrap();

        assert_eq!(line.last(), Some(&b'\n'));

        let decoded = RpcRequest::from_json_line(std::str::from_utf8(&line).unwrap().trim_end()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn response_framing_round_trip() {
        let response = RpcResponse {
            stdout: "hello\n".into(),
            stderr: String::new(),
            exit_code: 0,
        };
        let line = response.to_json_byte_line().unwrap();
        let decoded = RpcResponse::from_json_line(std::str::from_utf8(&line).unwrap().trim_end()).unwrap();

        assert_eq!(decoded, response);
    }

    #[test]
    fn absent_socket_reports_not_running() {
        let client = HelperRpcClient::new("ghost", Path::new("/nonexistent/helper.socket"));
        let error = client.send_run(vec!["/bin/true".into()], false).unwrap_err();

        assert!(matches!(error.downcast::<ErrorKind>(), Ok(ErrorKind::NotRunning(_))));
    }

    #[test]
    fn run_request_reaches_listener() {
        let socket = temp_dir().join(format!("bubblebox-rpc-test-{}", id()));
        let _ = remove_file(&socket);
        let listener = UnixListener::bind(&socket).unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut line = String::new();

            BufReader::new(&stream).read_line(&mut line).unwrap();

            let request = RpcRequest::from_json_line(line.trim_end()).unwrap();
            let response = RpcResponse {
                stdout: "hello\n".into(),
                stderr: String::new(),
                exit_code: 0,
            };

            assert!(request.wait_response);
            (&stream).write_all(&response.to_json_byte_line().unwrap()).unwrap();
        });

        let client = HelperRpcClient::new("alice", &socket);
        let response = client.send_run(vec!["/bin/echo".into(), "hello".into()], true).unwrap().unwrap();

        assert_eq!(response.exit_code, 0);
        assert_eq!(response.stdout, "hello\n");
        server.join().unwrap();
        remove_file(&socket).unwrap();
    }
}
