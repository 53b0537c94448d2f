// Copyright 2026 The crap-clone Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Concrete [`Transport`] implementations for the root string forms named
//! in SPEC_FULL.md §6: `:pserver:`, `:ext:`, `:fake:`, and the bare
//! path/local-fork forms. The wire protocol itself is an external
//! collaborator (spec.md's own scoping) — this module only builds enough of
//! it to carry `Directory`/`Argument`/`update` requests and read line
//! responses back, so the Fetch Optimizer has something real to drive.

use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::net::TcpStream;
use std::process::Child;
use std::process::ChildStdin;
use std::process::ChildStdout;
use std::process::Command;
use std::process::Stdio;

use crap_clone_core::error::CoreError;
use crap_clone_core::error::CoreResult;
use crap_clone_core::fetch::Transport;

/// A parsed CVSROOT string (SPEC_FULL.md §6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Root {
    Pserver { user: Option<String>, host: String, port: Option<u16>, path: String },
    Ext { host: String, path: String },
    Fake { program: String, args: Vec<String>, path: String },
    LocalFork { path: String },
}

impl Root {
    pub fn parse(root: &str) -> CoreResult<Self> {
        if let Some(rest) = root.strip_prefix(":pserver:") {
            let (authority, path) = rest
                .split_once('/')
                .map(|(a, p)| (a, format!("/{p}")))
                .ok_or_else(|| CoreError::Protocol(format!("malformed pserver root {root:?}")))?;
            let (user, hostport) = match authority.split_once('@') {
                Some((u, h)) => (Some(u.to_owned()), h),
                None => (None, authority),
            };
            let (host, port) = match hostport.split_once(':') {
                Some((h, p)) => (
                    h.to_owned(),
                    Some(p.parse().map_err(|_| CoreError::Protocol(format!("bad port in {root:?}")))?),
                ),
                None => (hostport.to_owned(), None),
            };
            return Ok(Root::Pserver { user, host, port, path });
        }
        if let Some(rest) = root.strip_prefix(":ext:") {
            let (host, path) = rest
                .split_once('/')
                .map(|(h, p)| (h.to_owned(), format!("/{p}")))
                .ok_or_else(|| CoreError::Protocol(format!("malformed ext root {root:?}")))?;
            return Ok(Root::Ext { host, path });
        }
        if let Some(rest) = root.strip_prefix(":fake:") {
            let mut parts = rest.splitn(3, ':');
            let program = parts
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| CoreError::Protocol(format!("malformed fake root {root:?}")))?;
            let args = parts.next().unwrap_or_default();
            let path = parts.next().unwrap_or_default();
            return Ok(Root::Fake {
                program: program.to_owned(),
                args: args.split_whitespace().map(str::to_owned).collect(),
                path: path.to_owned(),
            });
        }
        if root.starts_with('/') {
            return Ok(Root::LocalFork { path: root.to_owned() });
        }
        // Bare `host/path` is treated as `:ext:` (spec §6).
        let (host, path) = root
            .split_once('/')
            .map(|(h, p)| (h.to_owned(), format!("/{p}")))
            .ok_or_else(|| CoreError::Protocol(format!("unrecognised root {root:?}")))?;
        Ok(Root::Ext { host, path })
    }
}

/// Drives a CVS server subprocess (local fork, `:ext:` over `CVS_RSH`, or
/// `:fake:`'s caller-supplied program) over its stdin/stdout pipes.
pub struct ProcessTransport {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessTransport {
    pub fn spawn(program: &str, args: &[String]) -> CoreResult<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = BufReader::new(child.stdout.take().expect("piped stdout"));
        Ok(Self { child, stdin, stdout })
    }

    /// Like [`Self::spawn`], but appends a `-z<level>` argument ahead of
    /// `args` when `compression > 0`, matching `cvs`'s own client flag.
    pub fn spawn_with_compression(program: &str, args: &[String], compression: u8) -> CoreResult<Self> {
        if compression == 0 {
            return Self::spawn(program, args);
        }
        let mut full_args = vec![format!("-z{compression}")];
        full_args.extend(args.iter().cloned());
        Self::spawn(program, &full_args)
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

impl Transport for ProcessTransport {
    fn send_directory(&mut self, dir: &str) -> CoreResult<()> {
        writeln!(self.stdin, "Directory {dir}")?;
        Ok(())
    }

    fn send_argument(&mut self, arg: &str) -> CoreResult<()> {
        writeln!(self.stdin, "Argument {arg}")?;
        Ok(())
    }

    fn send_update(&mut self) -> CoreResult<()> {
        writeln!(self.stdin, "update")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn read_response_line(&mut self) -> CoreResult<Option<String>> {
        let mut line = String::new();
        let n = self.stdout.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        if line == "ok" || line == "error" {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn read_exact(&mut self, n: usize) -> CoreResult<Vec<u8>> {
        let mut buf = vec![0u8; n];
        std::io::Read::read_exact(&mut self.stdout, &mut buf)?;
        Ok(buf)
    }
}

/// Drives a `:pserver:` session over a raw TCP socket.
pub struct PserverTransport {
    stream_writer: TcpStream,
    stream_reader: BufReader<TcpStream>,
}

impl PserverTransport {
    /// `compression` is the `-z` level validated by the CLI; `0` sends no
    /// `Gzip-stream` request, matching plain-text `cvs`.
    pub fn connect(host: &str, port: u16, compression: u8) -> CoreResult<Self> {
        let stream = TcpStream::connect((host, port))?;
        let reader = BufReader::new(stream.try_clone()?);
        let mut transport = Self { stream_writer: stream, stream_reader: reader };
        if compression > 0 {
            writeln!(transport.stream_writer, "Gzip-stream {compression}")?;
        }
        Ok(transport)
    }
}

impl Transport for PserverTransport {
    fn send_directory(&mut self, dir: &str) -> CoreResult<()> {
        writeln!(self.stream_writer, "Directory {dir}")?;
        Ok(())
    }

    fn send_argument(&mut self, arg: &str) -> CoreResult<()> {
        writeln!(self.stream_writer, "Argument {arg}")?;
        Ok(())
    }

    fn send_update(&mut self) -> CoreResult<()> {
        writeln!(self.stream_writer, "update")?;
        self.stream_writer.flush()?;
        Ok(())
    }

    fn read_response_line(&mut self) -> CoreResult<Option<String>> {
        let mut line = String::new();
        let n = self.stream_reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        if line == "ok" || line == "error" {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn read_exact(&mut self, n: usize) -> CoreResult<Vec<u8>> {
        let mut buf = vec![0u8; n];
        std::io::Read::read_exact(&mut self.stream_reader, &mut buf)?;
        Ok(buf)
    }
}

/// Opens the transport matching `root`'s form, per SPEC_FULL.md §6.
/// `cvs_rsh` is the remote-shell program for `:ext:` roots (`CVS_RSH`,
/// default `ssh`). `compression` is the validated `-z` level; `0` leaves the
/// connection uncompressed.
pub fn connect(root: &Root, cvs_rsh: &str, compression: u8) -> CoreResult<Box<dyn Transport>> {
    match root {
        Root::Pserver { host, port, .. } => {
            Ok(Box::new(PserverTransport::connect(host, port.unwrap_or(2401), compression)?))
        }
        Root::Ext { host, .. } => Ok(Box::new(ProcessTransport::spawn_with_compression(
            cvs_rsh,
            &[host.clone(), "cvs".to_owned(), "server".to_owned()],
            compression,
        )?)),
        Root::Fake { program, args, .. } => {
            Ok(Box::new(ProcessTransport::spawn_with_compression(program, args, compression)?))
        }
        Root::LocalFork { .. } => {
            Ok(Box::new(ProcessTransport::spawn_with_compression("cvs", &["server".to_owned()], compression)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pserver_root_with_user_and_port() {
        let root = Root::parse(":pserver:alice@example.com:2401/cvsroot").unwrap();
        assert_eq!(
            root,
            Root::Pserver {
                user: Some("alice".to_owned()),
                host: "example.com".to_owned(),
                port: Some(2401),
                path: "/cvsroot".to_owned(),
            }
        );
    }

    #[test]
    fn parses_ext_root() {
        let root = Root::parse(":ext:example.com/cvsroot").unwrap();
        assert_eq!(root, Root::Ext { host: "example.com".to_owned(), path: "/cvsroot".to_owned() });
    }

    #[test]
    fn bare_host_path_is_treated_as_ext() {
        let root = Root::parse("example.com/cvsroot").unwrap();
        assert_eq!(root, Root::Ext { host: "example.com".to_owned(), path: "/cvsroot".to_owned() });
    }

    #[test]
    fn bare_absolute_path_is_a_local_fork() {
        let root = Root::parse("/var/cvsroot").unwrap();
        assert_eq!(root, Root::LocalFork { path: "/var/cvsroot".to_owned() });
    }

    #[test]
    fn parses_fake_root() {
        let root = Root::parse(":fake:my-cvs:--arg1 --arg2:/cvsroot").unwrap();
        assert_eq!(
            root,
            Root::Fake {
                program: "my-cvs".to_owned(),
                args: vec!["--arg1".to_owned(), "--arg2".to_owned()],
                path: "/cvsroot".to_owned(),
            }
        );
    }
}
